use courier_storage::StorageError;
use thiserror::Error;

/// Errors that may occur while tracking or persisting checkpoint state.
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// Represents an error that occurred while interacting with the
    /// checkpoint store.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// A persisted height could not be parsed back.
    #[error("corrupt persisted height: {value:?}")]
    CorruptHeight {
        /// The raw stored value.
        value: String,
    },

    /// The lock guarding checkpoint state was poisoned.
    #[error("lock poisoned")]
    LockPoisoned,
}
