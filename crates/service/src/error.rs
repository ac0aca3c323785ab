use alloy_primitives::ChainId;
use courier_core::{CheckpointError, ConfigError};
use thiserror::Error;

/// Errors that may occur while assembling or running the service.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Represents a configuration error.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Represents an error initializing a partition's checkpoint.
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    /// A partition references a chain with no wired collaborator.
    #[error("no client wired for chain {0}")]
    MissingClient(ChainId),

    /// A collaborator could not be constructed.
    #[error("failed to build client: {0}")]
    ClientSetup(String),

    /// Every configured partition failed to start.
    #[error("no partition could be started")]
    NoPartitions,
}
