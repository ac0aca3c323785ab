use alloy_primitives::ChainId;
use courier_core::BlockSource;
use courier_types::SourceBlock;
use std::{sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Default interval between head polls.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Polls one source chain for new blocks and fans them out to every
/// partition relaying from that chain.
///
/// The feed only moves forward: it starts at the height the startup
/// catch-up finished at and admits each subsequent block exactly once per
/// partition. A poll failure is logged and retried on the next tick; the
/// missed span is picked up because `next_height` does not advance.
#[derive(Debug)]
pub struct BlockFeed<B> {
    chain_id: ChainId,
    source: Arc<B>,
    senders: Vec<async_channel::Sender<SourceBlock>>,
    next_height: u64,
    poll_interval: Duration,
    cancellation: CancellationToken,
}

impl<B: BlockSource> BlockFeed<B> {
    /// Creates a feed that admits blocks starting at `next_height`.
    pub fn new(
        chain_id: ChainId,
        source: Arc<B>,
        senders: Vec<async_channel::Sender<SourceBlock>>,
        next_height: u64,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            chain_id,
            source,
            senders,
            next_height,
            poll_interval: DEFAULT_POLL_INTERVAL,
            cancellation,
        }
    }

    /// Overrides the poll interval.
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Polls until cancelled.
    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = self.cancellation.cancelled() => {
                    debug!(target: "courier::feed", chain_id = self.chain_id, "Feed cancelled, stopping polling");
                    break;
                }
                _ = ticker.tick() => {
                    if !self.poll().await {
                        break;
                    }
                }
            }
        }
    }

    /// Admits all blocks up to the current head. Returns `false` once every
    /// downstream queue is gone.
    async fn poll(&mut self) -> bool {
        let head = match self.source.latest_height().await {
            Ok(head) => head,
            Err(err) => {
                warn!(target: "courier::feed", chain_id = self.chain_id, %err, "Failed to poll head");
                return true;
            }
        };

        while self.next_height <= head {
            let block = match self.source.block_at(self.next_height).await {
                Ok(block) => block,
                Err(err) => {
                    warn!(
                        target: "courier::feed",
                        chain_id = self.chain_id,
                        height = self.next_height,
                        %err,
                        "Failed to fetch block, will retry next tick"
                    );
                    return true;
                }
            };
            trace!(
                target: "courier::feed",
                chain_id = self.chain_id,
                height = block.height,
                envelopes = block.envelopes.len(),
                "Admitting block"
            );
            let mut delivered = false;
            for sender in &self.senders {
                tokio::select! {
                    _ = self.cancellation.cancelled() => return false,
                    sent = sender.send(block.clone()) => {
                        delivered |= sent.is_ok();
                    }
                }
            }
            if !delivered {
                return false;
            }
            self.next_height += 1;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use courier_core::SourceError;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[derive(Debug)]
    struct FakeSource {
        head: AtomicU64,
    }

    #[async_trait]
    impl BlockSource for FakeSource {
        async fn latest_height(&self) -> Result<u64, SourceError> {
            Ok(self.head.load(Ordering::SeqCst))
        }

        async fn block_at(&self, height: u64) -> Result<SourceBlock, SourceError> {
            Ok(SourceBlock::empty(height))
        }
    }

    #[tokio::test]
    async fn test_feed_admits_blocks_in_order() {
        let source = Arc::new(FakeSource { head: AtomicU64::new(12) });
        let (tx, rx) = async_channel::bounded(16);
        let cancellation = CancellationToken::new();
        let feed = BlockFeed::new(1, source, vec![tx], 10, cancellation.clone())
            .with_poll_interval(Duration::from_millis(10));
        let handle = tokio::spawn(feed.run());

        for expected in 10..=12 {
            let block = rx.recv().await.unwrap();
            assert_eq!(block.height, expected);
        }
        cancellation.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_feed_stops_when_queues_close() {
        let source = Arc::new(FakeSource { head: AtomicU64::new(12) });
        let (tx, rx) = async_channel::bounded(16);
        let feed = BlockFeed::new(1, source, vec![tx], 10, CancellationToken::new())
            .with_poll_interval(Duration::from_millis(10));
        rx.close();
        // run() returns on its own once the only queue is closed
        tokio::time::timeout(Duration::from_secs(5), feed.run()).await.unwrap();
    }
}
