use crate::{BlockFeed, ServiceError};
use alloy_primitives::ChainId;
use courier_core::{
    AttestationProvider, BlockSource, CheckpointManager, Config, DestinationClient, NativeProtocol,
    Orchestrator, OrchestratorConfig, ProtocolRegistry,
    config::ProtocolFormat,
};
use courier_storage::CheckpointStore;
use courier_types::PartitionKey;
use std::{
    collections::HashMap,
    sync::Arc,
    time::Duration,
};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Bound on how long shutdown waits for in-flight tasks.
const SHUTDOWN_DEADLINE: Duration = Duration::from_secs(10);

/// The main relayer service. Orchestrates partitions, feeds and shutdown.
///
/// Generic over the store and the external collaborators so that tests can
/// wire fakes where production wires the RPC-backed clients.
#[derive(Debug)]
pub struct Service<S, B, D, A> {
    config: Arc<Config>,
    store: Arc<S>,
    sources: HashMap<ChainId, Arc<B>>,
    destinations: HashMap<ChainId, Arc<D>>,
    attestor: Arc<A>,

    orchestrators: Vec<Orchestrator<S, A>>,

    cancel_token: CancellationToken,
    join_set: JoinSet<()>,
}

impl<S, B, D, A> Service<S, B, D, A>
where
    S: CheckpointStore + 'static,
    B: BlockSource + 'static,
    D: DestinationClient + 'static,
    A: AttestationProvider + 'static,
{
    /// Creates a new service instance over the given collaborators.
    pub fn new(
        config: Config,
        store: Arc<S>,
        sources: HashMap<ChainId, Arc<B>>,
        destinations: HashMap<ChainId, Arc<D>>,
        attestor: Arc<A>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            sources,
            destinations,
            attestor,
            orchestrators: Vec::new(),
            cancel_token: CancellationToken::new(),
            join_set: JoinSet::new(),
        }
    }

    /// Initialises one orchestrator per configured partition.
    ///
    /// A partition whose checkpoint cannot be loaded is logged and skipped;
    /// the rest of the service starts. Only a fully failed startup is an
    /// error.
    pub fn initialise(&mut self) -> Result<(), ServiceError> {
        self.config.validate()?;
        self.check_destination_clients()?;
        let registries = self.build_registries();

        for partition in self.config.partition_keys() {
            let Some(source_cfg) = self.config.source_chain(partition.source_chain_id) else {
                continue;
            };
            if !self.sources.contains_key(&partition.source_chain_id) {
                error!(
                    target: "courier::service",
                    %partition,
                    "No source client wired for partition, skipping"
                );
                continue;
            }
            let Some(registry) = registries.get(&partition.source_chain_id) else { continue };

            let checkpoint = match CheckpointManager::initialize(
                self.store.clone(),
                partition,
                source_cfg.start_height,
            ) {
                Ok(checkpoint) => checkpoint,
                // Fatal for this partition only; unrelated partitions start.
                Err(err) => {
                    error!(
                        target: "courier::service",
                        %partition,
                        %err,
                        "Failed to initialise checkpoint, partition not started"
                    );
                    continue;
                }
            };

            self.orchestrators.push(Orchestrator::new(
                partition,
                registry.clone(),
                Arc::new(checkpoint),
                self.attestor.clone(),
                OrchestratorConfig { workers: source_cfg.workers, ..Default::default() },
                self.cancel_token.clone(),
            ));
            info!(target: "courier::service", %partition, "Partition initialised");
        }

        if self.orchestrators.is_empty() {
            return Err(ServiceError::NoPartitions);
        }
        Ok(())
    }

    /// Starts worker pools, performs catch-up and spawns the block feeds,
    /// then parks until cancellation.
    pub async fn run(&mut self) -> Result<(), ServiceError> {
        self.start().await?;
        self.cancel_token.cancelled().await;
        Ok(())
    }

    /// Starts all partitions without waiting for cancellation.
    pub async fn start(&mut self) -> Result<(), ServiceError> {
        let mut join_set = std::mem::take(&mut self.join_set);
        let mut feed_starts: HashMap<ChainId, u64> = HashMap::new();

        for orchestrator in &self.orchestrators {
            orchestrator.start(&mut join_set);

            let chain_id = orchestrator.partition().source_chain_id;
            let source = self
                .sources
                .get(&chain_id)
                .ok_or(ServiceError::MissingClient(chain_id))?;
            // The head can move between sequential scans, so the feed must
            // start at the lowest height any of the chain's partitions still
            // needs. Re-admitting already-committed heights is harmless:
            // stale commits are no-ops and deliveries are dedup-checked.
            let next_height = match orchestrator.catch_up(source.as_ref()).await {
                Ok(head) => head + 1,
                Err(err) => {
                    error!(
                        target: "courier::service",
                        partition = %orchestrator.partition(),
                        %err,
                        "Catch-up failed; feeding partition from its committed height"
                    );
                    orchestrator.checkpoint().committed_height()? + 1
                }
            };
            let entry = feed_starts.entry(chain_id).or_insert(next_height);
            *entry = (*entry).min(next_height);
        }

        for (&chain_id, source) in &self.sources {
            let senders: Vec<_> = self
                .orchestrators
                .iter()
                .filter(|orchestrator| orchestrator.partition().source_chain_id == chain_id)
                .map(Orchestrator::block_sender)
                .collect();
            if senders.is_empty() {
                continue;
            }
            // Every orchestrator recorded a start height above.
            let Some(&next_height) = feed_starts.get(&chain_id) else { continue };
            let feed = BlockFeed::new(
                chain_id,
                source.clone(),
                senders,
                next_height,
                self.cancel_token.clone(),
            );
            join_set.spawn(feed.run());
            info!(target: "courier::service", chain_id, next_height, "Block feed started");
        }

        self.join_set = join_set;
        Ok(())
    }

    /// Stops admission, waits (bounded) for in-flight tasks and flushes
    /// every partition's checkpoint.
    ///
    /// Tasks abandoned at the deadline leave their heights uncommitted;
    /// catch-up on the next start reprocesses them.
    pub async fn shutdown(&mut self) -> Result<(), ServiceError> {
        info!(target: "courier::service", "Shutting down");
        self.cancel_token.cancel();

        let drained = tokio::time::timeout(SHUTDOWN_DEADLINE, async {
            while self.join_set.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            warn!(target: "courier::service", "Shutdown deadline reached, abandoning in-flight tasks");
            self.join_set.abort_all();
        }

        for orchestrator in &self.orchestrators {
            if let Err(err) = orchestrator.checkpoint().flush() {
                error!(
                    target: "courier::service",
                    partition = %orchestrator.partition(),
                    %err,
                    "Failed to flush checkpoint on shutdown"
                );
            }
        }
        Ok(())
    }

    /// Committed heights per partition, for status reporting.
    pub fn committed_heights(&self) -> Vec<(PartitionKey, u64)> {
        self.orchestrators
            .iter()
            .filter_map(|orchestrator| {
                orchestrator
                    .checkpoint()
                    .committed_height()
                    .ok()
                    .map(|height| (*orchestrator.partition(), height))
            })
            .collect()
    }

    /// Verifies every wired destination client reports the chain it is
    /// configured for. A mismatch would silently deliver to the wrong chain.
    fn check_destination_clients(&self) -> Result<(), ServiceError> {
        for destination in &self.config.destination_chains {
            let Some(client) = self.destinations.get(&destination.chain_id) else { continue };
            if client.destination_chain_id() != destination.chain_id {
                return Err(ServiceError::ClientSetup(format!(
                    "destination client for chain {} reports chain {}",
                    destination.chain_id,
                    client.destination_chain_id()
                )));
            }
            info!(
                target: "courier::service",
                chain_id = destination.chain_id,
                sender = %client.sender_address(),
                "Destination client ready"
            );
        }
        Ok(())
    }

    /// One protocol registry per source chain, built from its configured
    /// message contracts.
    fn build_registries(&self) -> HashMap<ChainId, Arc<ProtocolRegistry>> {
        let mut registries = HashMap::new();
        for source in &self.config.source_chains {
            let mut registry = ProtocolRegistry::new();
            for (&origin, protocol_cfg) in &source.message_contracts {
                match protocol_cfg.format {
                    ProtocolFormat::Native => {
                        let mut protocol = NativeProtocol::new(
                            self.destinations.clone(),
                            protocol_cfg.settings.reward_address.unwrap_or_default(),
                        );
                        if let Some(gas_limit) = protocol_cfg.settings.gas_limit {
                            protocol = protocol.with_gas_limit(gas_limit);
                        }
                        registry.register(origin, Arc::new(protocol));
                    }
                }
            }
            registries.insert(source.chain_id, Arc::new(registry));
        }
        registries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, B256, Bytes, address};
    use async_trait::async_trait;
    use courier_core::{
        AttestationError, ClientError, SourceError, TxResult,
        config::{DestinationChainConfig, ProtocolConfig, ProtocolSettings, SourceChainConfig},
    };
    use courier_storage::InMemoryStore;
    use courier_types::{Envelope, SignedEnvelope, SourceBlock};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const ORIGIN: Address = address!("00000000000000000000000000000000000000cc");
    const DEST_ADDR: Address = address!("00000000000000000000000000000000000000dd");

    #[derive(Debug)]
    struct FakeSource;

    #[async_trait]
    impl BlockSource for FakeSource {
        async fn latest_height(&self) -> Result<u64, SourceError> {
            Ok(12)
        }

        async fn block_at(&self, height: u64) -> Result<SourceBlock, SourceError> {
            if height == 10 {
                let mut payload = Vec::new();
                payload.extend_from_slice(&2u64.to_be_bytes());
                payload.extend_from_slice(DEST_ADDR.as_slice());
                payload.extend_from_slice(b"hello");
                let envelope = Envelope::new(1, ORIGIN, payload.into(), height);
                return Ok(SourceBlock::new(height, vec![envelope]));
            }
            Ok(SourceBlock::empty(height))
        }
    }

    /// A source whose reported head steps through `heads` one poll at a
    /// time, then stays at the last entry.
    #[derive(Debug)]
    struct SteppingSource {
        calls: AtomicUsize,
        heads: Vec<u64>,
    }

    impl SteppingSource {
        fn new(heads: Vec<u64>) -> Self {
            Self { calls: AtomicUsize::new(0), heads }
        }
    }

    #[async_trait]
    impl BlockSource for SteppingSource {
        async fn latest_height(&self) -> Result<u64, SourceError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.heads[call.min(self.heads.len() - 1)])
        }

        async fn block_at(&self, height: u64) -> Result<SourceBlock, SourceError> {
            Ok(SourceBlock::empty(height))
        }
    }

    #[derive(Debug)]
    struct FakeDestination {
        chain_id: ChainId,
        sends: AtomicUsize,
    }

    impl FakeDestination {
        fn new(chain_id: ChainId) -> Self {
            Self { chain_id, sends: AtomicUsize::new(0) }
        }
    }

    #[async_trait]
    impl DestinationClient for FakeDestination {
        fn destination_chain_id(&self) -> ChainId {
            self.chain_id
        }

        fn sender_address(&self) -> Address {
            Address::ZERO
        }

        async fn message_delivered(&self, _: B256) -> Result<bool, ClientError> {
            Ok(false)
        }

        async fn send_tx(
            &self,
            _: &SignedEnvelope,
            _: Address,
            _: u64,
            _: Bytes,
        ) -> Result<TxResult, ClientError> {
            self.sends.fetch_add(1, Ordering::SeqCst);
            Ok(TxResult { tx_hash: B256::ZERO })
        }
    }

    #[derive(Debug)]
    struct FakeAttestor;

    #[async_trait]
    impl AttestationProvider for FakeAttestor {
        async fn attest(&self, _: &Envelope) -> Result<Bytes, AttestationError> {
            Ok(Bytes::from_static(b"attestation"))
        }
    }

    fn test_config(destinations: &[ChainId]) -> Config {
        let mut message_contracts = HashMap::new();
        message_contracts.insert(
            ORIGIN,
            ProtocolConfig { format: ProtocolFormat::Native, settings: ProtocolSettings::default() },
        );
        Config {
            storage_dir: "/tmp/courier-test".into(),
            attestation_url: "http://localhost:8080/attest".parse().unwrap(),
            source_chains: vec![SourceChainConfig {
                chain_id: 1,
                rpc_url: "http://localhost:8545".parse().unwrap(),
                start_height: 9,
                workers: 2,
                message_contracts,
            }],
            destination_chains: destinations
                .iter()
                .map(|&chain_id| DestinationChainConfig {
                    chain_id,
                    rpc_url: "http://localhost:9545".parse().unwrap(),
                    gateway_address: DEST_ADDR,
                    account_private_key: "00".repeat(32),
                })
                .collect(),
        }
    }

    fn service_with<B: BlockSource + 'static>(
        source: B,
        destinations: &[ChainId],
    ) -> Service<InMemoryStore, B, FakeDestination, FakeAttestor> {
        let mut sources = HashMap::new();
        sources.insert(1u64, Arc::new(source));
        let clients = destinations
            .iter()
            .map(|&chain_id| (chain_id, Arc::new(FakeDestination::new(chain_id))))
            .collect();
        Service::new(
            test_config(destinations),
            Arc::new(InMemoryStore::new()),
            sources,
            clients,
            Arc::new(FakeAttestor),
        )
    }

    async fn wait_for_committed(
        service: &Service<InMemoryStore, impl BlockSource + 'static, FakeDestination, FakeAttestor>,
        height: u64,
    ) {
        tokio::time::timeout(Duration::from_secs(10), async {
            loop {
                let heights = service.committed_heights();
                if !heights.is_empty() && heights.iter().all(|(_, committed)| *committed >= height)
                {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("partitions caught up");
    }

    #[tokio::test]
    async fn test_end_to_end_catch_up_relays_and_commits() {
        let mut service = service_with(FakeSource, &[2]);
        service.initialise().unwrap();
        assert_eq!(service.orchestrators.len(), 1);

        service.start().await.unwrap();
        wait_for_committed(&service, 12).await;

        let sends = service.destinations.get(&2).unwrap().sends.load(Ordering::SeqCst);
        assert_eq!(sends, 1, "exactly one delivery for the single envelope");

        service.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_feed_start_covers_slowest_partition() {
        // The head advances while the two partitions scan sequentially: the
        // first sees 15, the second sees 20. The feed must start low enough
        // that the first partition still receives 16..=20.
        let mut service = service_with(SteppingSource::new(vec![15, 20, 25]), &[2, 3]);
        service.initialise().unwrap();
        assert_eq!(service.orchestrators.len(), 2);

        service.start().await.unwrap();
        wait_for_committed(&service, 25).await;

        service.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_initialise_without_partitions_fails() {
        let mut service = service_with(FakeSource, &[2]);
        service.sources.clear();
        assert!(matches!(service.initialise(), Err(ServiceError::NoPartitions)));
    }

    #[tokio::test]
    async fn test_initialise_rejects_mismatched_destination_client() {
        let mut service = service_with(FakeSource, &[2]);
        service.destinations.insert(2, Arc::new(FakeDestination::new(9)));
        assert!(matches!(service.initialise(), Err(ServiceError::ClientSetup(_))));
    }
}
