use super::{OrchestratorError, Worker};
use crate::{AttestationProvider, BlockSource, CheckpointManager, ProtocolRegistry, SourceError};
use backon::{ExponentialBuilder, Retryable};
use courier_storage::CheckpointStore;
use courier_types::{PartitionKey, SourceBlock};
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Tuning knobs for one partition's pipeline.
#[derive(Debug, Clone, Copy)]
pub struct OrchestratorConfig {
    /// Number of concurrent workers.
    pub workers: usize,
    /// Depth of the bounded block queue.
    pub queue_depth: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self { workers: 4, queue_depth: 64 }
    }
}

/// Drives one partition: owns the bounded work queue, the worker pool and
/// startup catch-up.
///
/// Blocks are admitted through [`Self::block_sender`] by the subscription
/// feed; [`Self::catch_up`] closes any gap left by a prior crash before
/// steady-state admission begins.
#[derive(Debug)]
pub struct Orchestrator<S, A> {
    partition: PartitionKey,
    registry: Arc<ProtocolRegistry>,
    checkpoint: Arc<CheckpointManager<S>>,
    attestor: Arc<A>,
    config: OrchestratorConfig,
    cancellation: CancellationToken,
    queue_tx: async_channel::Sender<SourceBlock>,
    queue_rx: async_channel::Receiver<SourceBlock>,
}

impl<S, A> Orchestrator<S, A>
where
    S: CheckpointStore + 'static,
    A: AttestationProvider + 'static,
{
    /// Creates a new [`Orchestrator`].
    pub fn new(
        partition: PartitionKey,
        registry: Arc<ProtocolRegistry>,
        checkpoint: Arc<CheckpointManager<S>>,
        attestor: Arc<A>,
        config: OrchestratorConfig,
        cancellation: CancellationToken,
    ) -> Self {
        let (queue_tx, queue_rx) = async_channel::bounded(config.queue_depth);
        Self { partition, registry, checkpoint, attestor, config, cancellation, queue_tx, queue_rx }
    }

    /// The partition this orchestrator drives.
    pub const fn partition(&self) -> &PartitionKey {
        &self.partition
    }

    /// The partition's checkpoint manager.
    pub const fn checkpoint(&self) -> &Arc<CheckpointManager<S>> {
        &self.checkpoint
    }

    /// A handle for admitting candidate blocks into the work queue.
    pub fn block_sender(&self) -> async_channel::Sender<SourceBlock> {
        self.queue_tx.clone()
    }

    /// Spawns the worker pool onto `join_set`.
    pub fn start(&self, join_set: &mut JoinSet<()>) {
        for _ in 0..self.config.workers.max(1) {
            let worker = Worker::new(
                self.partition,
                self.registry.clone(),
                self.checkpoint.clone(),
                self.attestor.clone(),
                self.queue_rx.clone(),
                self.cancellation.clone(),
            );
            join_set.spawn(worker.run());
        }
        debug!(
            target: "courier::orchestrator",
            partition = %self.partition,
            workers = self.config.workers.max(1),
            "Started worker pool"
        );
    }

    /// Re-scans blocks from `committed_height + 1` up to the current source
    /// head, admitting each through the work queue, so that any gap left by
    /// a prior crash closes before steady-state subscription begins.
    ///
    /// Returns the head height the scan caught up to.
    pub async fn catch_up<B: BlockSource>(&self, source: &B) -> Result<u64, OrchestratorError> {
        let head = (|| source.latest_height())
            .retry(ExponentialBuilder::default())
            .when(|err: &SourceError| matches!(err, SourceError::Network(_)))
            .await?;
        let mut next = self.checkpoint.committed_height()? + 1;
        if next > head {
            return Ok(head);
        }

        info!(
            target: "courier::orchestrator",
            partition = %self.partition,
            from = next,
            to = head,
            "Catching up missed blocks"
        );
        while next <= head {
            let block = (|| source.block_at(next))
                .retry(ExponentialBuilder::default())
                .when(|err: &SourceError| matches!(err, SourceError::Network(_)))
                .await?;
            tokio::select! {
                _ = self.cancellation.cancelled() => return Ok(head),
                sent = self.queue_tx.send(block) => {
                    sent.map_err(|_| OrchestratorError::QueueClosed)?;
                }
            }
            next += 1;
        }
        Ok(head)
    }
}
