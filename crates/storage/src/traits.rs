use crate::StorageError;
use alloy_primitives::B256;
use std::fmt::Debug;

/// The data key under which a partition's highest contiguously-processed
/// height is persisted.
pub const LATEST_COMMITTED_HEIGHT_KEY: &str = "latestCommittedHeight";

/// The data key under which the highest height ever admitted for a partition
/// is persisted, independent of processing success.
pub const LATEST_OBSERVED_HEIGHT_KEY: &str = "latestObservedHeight";

/// A key-value store for relayer state, with each partition maintaining its
/// own namespace.
///
/// Implementations must be thread-safe: the checkpoint manager calls into
/// the store from every worker of a partition. Writes must be atomic at the
/// granularity of a single `put` so that no partial value is ever read back
/// after a crash.
pub trait CheckpointStore: Send + Sync + Debug {
    /// Reads the value stored under `key` in the partition's namespace.
    ///
    /// # Returns
    /// * `Ok(bytes)` if the key exists.
    /// * `Err(e)` with [`StorageError::is_not_found`] returning `true` if the
    ///   key or partition is absent; any other error means the store itself
    ///   failed.
    fn get(&self, partition: B256, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Writes `value` under `key` in the partition's namespace, creating the
    /// namespace if it does not exist yet.
    fn put(&self, partition: B256, key: &str, value: Vec<u8>) -> Result<(), StorageError>;
}
