use async_trait::async_trait;
use courier_types::SourceBlock;
use std::fmt::Debug;
use thiserror::Error;

/// Errors that may occur while reading from a source chain.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SourceError {
    /// The source chain could not be reached.
    #[error("source network error: {0}")]
    Network(String),

    /// The requested block does not exist (yet).
    #[error("block not found at height {0}")]
    BlockNotFound(u64),
}

/// Read access to one source chain: the current head and envelope
/// extraction per block. Used for startup catch-up and by the polling feed.
#[async_trait]
pub trait BlockSource: Send + Sync + Debug {
    /// The height of the latest finalized block.
    async fn latest_height(&self) -> Result<u64, SourceError>;

    /// The block at `height` with all candidate envelopes extracted from it.
    async fn block_at(&self, height: u64) -> Result<SourceBlock, SourceError>;
}
