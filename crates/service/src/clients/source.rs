use alloy_primitives::{Address, ChainId};
use alloy_provider::{Provider, RootProvider};
use alloy_rpc_types_eth::Filter;
use async_trait::async_trait;
use courier_core::{BlockSource, SourceError};
use courier_types::{Envelope, SourceBlock};
use url::Url;

/// A [`BlockSource`] reading finalized blocks and message logs over JSON-RPC.
///
/// Envelope extraction is log-based: every log emitted by one of the
/// configured origin contracts in the queried block becomes a candidate
/// envelope carrying the raw log data as payload.
#[derive(Debug)]
pub struct RpcBlockSource {
    chain_id: ChainId,
    provider: RootProvider,
    contracts: Vec<Address>,
}

impl RpcBlockSource {
    /// Creates a source over `rpc_url` observing the given origin contracts.
    pub fn new(chain_id: ChainId, rpc_url: Url, contracts: Vec<Address>) -> Self {
        Self { chain_id, provider: RootProvider::new_http(rpc_url), contracts }
    }
}

#[async_trait]
impl BlockSource for RpcBlockSource {
    async fn latest_height(&self) -> Result<u64, SourceError> {
        self.provider
            .get_block_number()
            .await
            .map_err(|err| SourceError::Network(err.to_string()))
    }

    async fn block_at(&self, height: u64) -> Result<SourceBlock, SourceError> {
        let filter =
            Filter::new().from_block(height).to_block(height).address(self.contracts.clone());
        let logs = self
            .provider
            .get_logs(&filter)
            .await
            .map_err(|err| SourceError::Network(err.to_string()))?;

        let envelopes = logs
            .into_iter()
            .map(|log| {
                Envelope::new(self.chain_id, log.address(), log.data().data.clone(), height)
            })
            .collect();
        Ok(SourceBlock::new(height, envelopes))
    }
}
