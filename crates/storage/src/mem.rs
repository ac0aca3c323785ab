use crate::{CheckpointStore, StorageError};
use alloy_primitives::B256;
use std::{collections::HashMap, sync::RwLock};

/// A [`CheckpointStore`] held entirely in memory.
///
/// Used by tests and by ephemeral deployments that accept replaying from
/// the configured start height on every restart.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: RwLock<HashMap<B256, HashMap<String, Vec<u8>>>>,
}

impl InMemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl CheckpointStore for InMemoryStore {
    fn get(&self, partition: B256, key: &str) -> Result<Vec<u8>, StorageError> {
        let entries = self.entries.read().map_err(|_| StorageError::LockPoisoned)?;
        let namespace =
            entries.get(&partition).ok_or(StorageError::PartitionNotFound(partition))?;
        namespace.get(key).cloned().ok_or_else(|| StorageError::KeyNotFound(key.to_string()))
    }

    fn put(&self, partition: B256, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        let mut entries = self.entries.write().map_err(|_| StorageError::LockPoisoned)?;
        entries.entry(partition).or_default().insert(key.to_string(), value);
        Ok(())
    }
}
