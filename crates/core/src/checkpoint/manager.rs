use super::CheckpointError;
use alloy_primitives::B256;
use courier_storage::{
    CheckpointStore, LATEST_COMMITTED_HEIGHT_KEY, LATEST_OBSERVED_HEIGHT_KEY, StorageError,
};
use courier_types::PartitionKey;
use std::{
    cmp::Reverse,
    collections::BinaryHeap,
    sync::{Arc, Mutex},
};
use tracing::{debug, trace, warn};

/// Gauge tracking the committed height per partition.
const COMMITTED_HEIGHT_GAUGE: &str = "courier_committed_height";

#[derive(Debug)]
struct CheckpointState {
    /// Highest height H such that all heights `1..=H` finished processing.
    committed_height: u64,
    /// Heights that finished processing but sit above a gap. Min-heap, every
    /// element strictly greater than `committed_height`.
    pending: BinaryHeap<Reverse<u64>>,
    /// Highest height ever admitted, independent of processing success.
    observed_height: u64,
}

/// Tracks the highest contiguously-processed block height for one partition
/// and persists it on every advance.
///
/// Completion signals arrive from concurrent workers in arbitrary order; the
/// internal min-heap holds heights above a gap until the gap closes. The
/// persisted marker is only ever overwritten with a larger value, and the
/// in-memory state is the authority for the running process — a failed
/// persist is surfaced but never rolled back.
#[derive(Debug)]
pub struct CheckpointManager<S> {
    partition: PartitionKey,
    key_id: B256,
    store: Arc<S>,
    state: Mutex<CheckpointState>,
}

impl<S: CheckpointStore> CheckpointManager<S> {
    /// Loads the checkpoint for `partition` from the store.
    ///
    /// An absent committed-height key means no prior state; `start_height`
    /// is used instead (0 to reprocess from scratch, or a configured resume
    /// height). Any other store failure is fatal to starting the partition.
    pub fn initialize(
        store: Arc<S>,
        partition: PartitionKey,
        start_height: u64,
    ) -> Result<Self, CheckpointError> {
        let key_id = partition.key_id();
        let committed_height = match store.get(key_id, LATEST_COMMITTED_HEIGHT_KEY) {
            Ok(raw) => parse_height(&raw)?,
            Err(err) if err.is_not_found() => start_height,
            Err(err) => return Err(err.into()),
        };
        let observed_height = match store.get(key_id, LATEST_OBSERVED_HEIGHT_KEY) {
            Ok(raw) => parse_height(&raw)?,
            Err(err) if err.is_not_found() => committed_height,
            Err(err) => return Err(err.into()),
        };

        debug!(
            target: "courier::checkpoint",
            %partition,
            committed_height,
            observed_height,
            "Initialized checkpoint"
        );
        Ok(Self {
            partition,
            key_id,
            store,
            state: Mutex::new(CheckpointState {
                committed_height,
                pending: BinaryHeap::new(),
                observed_height,
            }),
        })
    }

    /// The partition this manager tracks.
    pub const fn partition(&self) -> &PartitionKey {
        &self.partition
    }

    /// Signals that block `height` finished processing.
    ///
    /// Stale and duplicate signals are no-ops. If `height` closes the gap
    /// above the committed height, the committed height advances across the
    /// whole contiguous run held pending and the new value is persisted
    /// before returning. A persist failure is returned to the caller without
    /// rolling back the in-memory advance; repeated failures widen the
    /// replay window after a restart and must be alerted on.
    pub fn commit_height(&self, height: u64) -> Result<(), CheckpointError> {
        let mut state = self.state.lock().map_err(|_| CheckpointError::LockPoisoned)?;

        if height <= state.committed_height {
            trace!(
                target: "courier::checkpoint",
                partition = %self.partition,
                height,
                committed = state.committed_height,
                "Stale commit signal"
            );
            return Ok(());
        }

        if height > state.committed_height + 1 {
            if !state.pending.iter().any(|Reverse(pending)| *pending == height) {
                state.pending.push(Reverse(height));
            }
            return Ok(());
        }

        state.committed_height = height;
        while let Some(&Reverse(next)) = state.pending.peek() {
            if next != state.committed_height + 1 {
                break;
            }
            state.pending.pop();
            state.committed_height = next;
        }

        let committed = state.committed_height;
        metrics::gauge!(COMMITTED_HEIGHT_GAUGE, "partition" => self.partition.to_string())
            .set(committed as f64);
        debug!(
            target: "courier::checkpoint",
            partition = %self.partition,
            committed,
            "Committed height advanced"
        );

        // Persisting under the lock keeps store writes monotone.
        self.persist(LATEST_COMMITTED_HEIGHT_KEY, committed)?;
        Ok(())
    }

    /// Records that `height` was admitted for processing, persisting the
    /// monotone maximum under the observed-height key.
    pub fn record_observed_height(&self, height: u64) -> Result<(), CheckpointError> {
        let mut state = self.state.lock().map_err(|_| CheckpointError::LockPoisoned)?;
        if height <= state.observed_height {
            return Ok(());
        }
        state.observed_height = height;
        self.persist(LATEST_OBSERVED_HEIGHT_KEY, height)?;
        Ok(())
    }

    /// A snapshot of the committed height. Safe to call concurrently with
    /// [`Self::commit_height`].
    pub fn committed_height(&self) -> Result<u64, CheckpointError> {
        let state = self.state.lock().map_err(|_| CheckpointError::LockPoisoned)?;
        Ok(state.committed_height)
    }

    /// Re-persists the current committed height.
    ///
    /// Called on graceful shutdown, and usable to narrow the replay window
    /// after an earlier persist failed.
    pub fn flush(&self) -> Result<(), CheckpointError> {
        let state = self.state.lock().map_err(|_| CheckpointError::LockPoisoned)?;
        self.persist(LATEST_COMMITTED_HEIGHT_KEY, state.committed_height)
    }

    fn persist(&self, key: &str, height: u64) -> Result<(), CheckpointError> {
        self.store.put(self.key_id, key, height.to_string().into_bytes()).map_err(
            |err: StorageError| {
                warn!(
                    target: "courier::checkpoint",
                    partition = %self.partition,
                    key,
                    height,
                    %err,
                    "Failed to persist checkpoint height"
                );
                err.into()
            },
        )
    }
}

fn parse_height(raw: &[u8]) -> Result<u64, CheckpointError> {
    let text = std::str::from_utf8(raw)
        .map_err(|_| CheckpointError::CorruptHeight { value: format!("{raw:?}") })?;
    text.parse().map_err(|_| CheckpointError::CorruptHeight { value: text.to_string() })
}
