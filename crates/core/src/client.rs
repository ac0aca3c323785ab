use alloy_primitives::{Address, B256, Bytes, ChainId};
use async_trait::async_trait;
use courier_types::SignedEnvelope;
use std::fmt::Debug;
use thiserror::Error;

/// Errors that may occur while interacting with a destination chain.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    /// The destination chain could not be reached or the call timed out.
    #[error("destination network error: {0}")]
    Network(String),

    /// The destination rejected the submission outright.
    #[error("destination rejected transaction: {0}")]
    Rejected(String),
}

impl ClientError {
    /// Returns `true` if retrying the same call can succeed.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

/// The result of a successfully submitted delivery transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxResult {
    /// The hash of the submitted transaction.
    pub tx_hash: B256,
}

/// A client bound to one destination chain, able to submit delivery
/// transactions and to answer whether a message has already been delivered.
///
/// The pipeline treats submission as an at-least-once, possibly-failing
/// network call. Exactly-once *effect* comes from the delivered-query being
/// consulted before every (re)submission, never from this client alone.
#[async_trait]
pub trait DestinationClient: Send + Sync + Debug {
    /// The chain ID this client submits to.
    fn destination_chain_id(&self) -> ChainId;

    /// The address transactions are signed with.
    fn sender_address(&self) -> Address;

    /// Queries destination-chain state for whether the message identified by
    /// `message_id` has already been delivered and executed.
    ///
    /// Must reflect true destination state rather than local memory: the
    /// local process may have restarted after a delivery whose checkpoint
    /// commit never persisted.
    async fn message_delivered(&self, message_id: B256) -> Result<bool, ClientError>;

    /// Submits a signed delivery transaction carrying the attested envelope.
    async fn send_tx(
        &self,
        signed: &SignedEnvelope,
        to: Address,
        gas_limit: u64,
        call_data: Bytes,
    ) -> Result<TxResult, ClientError>;
}
