use alloy_primitives::B256;
use thiserror::Error;

/// Errors that may occur while interacting with a checkpoint store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The requested data key does not exist in the partition's namespace.
    #[error("data key not found: {0}")]
    KeyNotFound(String),

    /// No state exists for the requested partition.
    #[error("no state for partition {0}")]
    PartitionNotFound(B256),

    /// An I/O failure while reading or writing the backing store.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The stored value could not be serialized or deserialized.
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    /// A lock guarding store state was poisoned.
    #[error("lock poisoned")]
    LockPoisoned,

    /// The backing store cannot be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    /// Returns `true` if the error means the requested key is absent, as
    /// opposed to the store being unreachable. Callers treat an absent key
    /// as "no prior state" and substitute a default.
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::KeyNotFound(_) | Self::PartitionNotFound(_))
    }
}
