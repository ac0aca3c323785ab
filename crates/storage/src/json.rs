use crate::{CheckpointStore, StorageError};
use alloy_primitives::B256;
use std::{
    collections::HashMap,
    fs,
    io::ErrorKind,
    path::PathBuf,
    sync::RwLock,
};
use tracing::debug;

/// A [`CheckpointStore`] backed by one JSON object file per partition.
///
/// Files live under a data directory and are named by the hex encoding of
/// the partition key. Values are kept as strings in the JSON object; writes
/// go to a temporary file first and are renamed into place, so a crash never
/// leaves a partially-written checkpoint behind.
///
/// An in-memory copy of every loaded partition is kept behind a [`RwLock`];
/// the file is the recovery source, the map is the hot path.
#[derive(Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
    cache: RwLock<HashMap<B256, HashMap<String, String>>>,
}

impl JsonFileStore {
    /// Opens (creating if needed) a store rooted at `dir`.
    ///
    /// Fails with [`StorageError::Io`] if the directory cannot be created,
    /// which callers treat as the store being unavailable.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, cache: RwLock::new(HashMap::new()) })
    }

    fn partition_path(&self, partition: B256) -> PathBuf {
        self.dir.join(format!("{partition:x}.json"))
    }

    /// Loads a partition's file into the cache if it is not resident yet.
    /// Returns `false` if no file exists for the partition.
    fn ensure_loaded(&self, partition: B256) -> Result<bool, StorageError> {
        {
            let cache = self.cache.read().map_err(|_| StorageError::LockPoisoned)?;
            if cache.contains_key(&partition) {
                return Ok(true);
            }
        }
        let raw = match fs::read(self.partition_path(partition)) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(false),
            Err(err) => return Err(err.into()),
        };
        let entries: HashMap<String, String> = serde_json::from_slice(&raw)?;
        let mut cache = self.cache.write().map_err(|_| StorageError::LockPoisoned)?;
        cache.entry(partition).or_insert(entries);
        Ok(true)
    }

    /// Atomically replaces the partition's file with `entries`.
    fn write_partition(
        &self,
        partition: B256,
        entries: &HashMap<String, String>,
    ) -> Result<(), StorageError> {
        let path = self.partition_path(partition);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(entries)?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

impl CheckpointStore for JsonFileStore {
    fn get(&self, partition: B256, key: &str) -> Result<Vec<u8>, StorageError> {
        if !self.ensure_loaded(partition)? {
            return Err(StorageError::PartitionNotFound(partition));
        }
        let cache = self.cache.read().map_err(|_| StorageError::LockPoisoned)?;
        cache
            .get(&partition)
            .and_then(|entries| entries.get(key))
            .map(|value| value.clone().into_bytes())
            .ok_or_else(|| StorageError::KeyNotFound(key.to_string()))
    }

    fn put(&self, partition: B256, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        let value = String::from_utf8(value)
            .map_err(|err| StorageError::Unavailable(format!("non-utf8 value: {err}")))?;
        self.ensure_loaded(partition)?;

        let mut cache = self.cache.write().map_err(|_| StorageError::LockPoisoned)?;
        let entries = cache.entry(partition).or_default();
        entries.insert(key.to_string(), value);
        self.write_partition(partition, entries)?;
        debug!(target: "courier::storage", %partition, key, "Persisted checkpoint entry");
        Ok(())
    }
}
