use alloy_primitives::Bytes;
use async_trait::async_trait;
use courier_types::Envelope;
use std::fmt::Debug;
use thiserror::Error;

/// Errors that may occur while obtaining an attestation for an envelope.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AttestationError {
    /// The aggregation service could not be reached or timed out.
    #[error("attestation service unavailable: {0}")]
    Unavailable(String),

    /// The aggregation service refused to attest the envelope.
    #[error("attestation refused: {0}")]
    Refused(String),
}

impl AttestationError {
    /// Returns `true` if retrying the same request can succeed.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Obtains the aggregated attestation required before an envelope may be
/// submitted to its destination.
#[async_trait]
pub trait AttestationProvider: Send + Sync + Debug {
    /// Requests an attestation over the envelope.
    async fn attest(&self, envelope: &Envelope) -> Result<Bytes, AttestationError>;
}
