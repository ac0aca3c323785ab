//! Checkpoint storage for the relayer.
//!
//! Each relay route (partition) owns a logical key-value namespace in which
//! the relayer persists its progress markers. The [`CheckpointStore`] trait
//! is the contract the checkpoint manager consumes; this crate ships a
//! JSON-file-per-partition backend for production use and an in-memory
//! backend for tests and ephemeral runs.

mod error;
pub use error::StorageError;

mod traits;
pub use traits::{CheckpointStore, LATEST_COMMITTED_HEIGHT_KEY, LATEST_OBSERVED_HEIGHT_KEY};

mod json;
pub use json::JsonFileStore;

mod mem;
pub use mem::InMemoryStore;
