use crate::ClientError;
use alloy_primitives::ChainId;
use thiserror::Error;

/// Errors that may occur while handling a message.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MessageError {
    /// The envelope payload does not decode under the protocol's wire
    /// format. The envelope is dropped, not retried.
    #[error("malformed payload: {0}")]
    Decode(String),

    /// The handler has no client for the destination the message routes to.
    #[error("no destination client for chain {0}")]
    UnknownDestination(ChainId),

    /// A destination-chain call failed.
    #[error(transparent)]
    Client(#[from] ClientError),
}

impl MessageError {
    /// Returns `true` if retrying the operation cannot succeed and the
    /// envelope should be skipped instead of failing the task.
    pub const fn is_unrecoverable(&self) -> bool {
        matches!(self, Self::Decode(_) | Self::UnknownDestination(_))
    }

    /// Returns `true` if retrying the same operation can succeed.
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Client(err) => err.is_retryable(),
            _ => false,
        }
    }
}
