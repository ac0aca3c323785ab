use crate::{AttestationError, CheckpointError, MessageError, SourceError};
use thiserror::Error;

/// Errors that may occur while orchestrating a partition.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Represents an error from the checkpoint manager.
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    /// Represents an error while reading the source chain.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// A retry-exhausted attestation failure for one envelope.
    #[error(transparent)]
    Attestation(#[from] AttestationError),

    /// A retry-exhausted message-handling failure for one envelope.
    #[error(transparent)]
    Message(#[from] MessageError),

    /// The work queue was closed while admitting blocks.
    #[error("work queue closed")]
    QueueClosed,
}
