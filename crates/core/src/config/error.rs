use alloy_primitives::ChainId;
use thiserror::Error;

/// Errors that may occur while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The configuration file could not be parsed.
    #[error(transparent)]
    Parse(#[from] toml::de::Error),

    /// No source chains are configured.
    #[error("no source chains configured")]
    NoSourceChains,

    /// No destination chains are configured.
    #[error("no destination chains configured")]
    NoDestinationChains,

    /// A chain ID appears more than once in the same role.
    #[error("duplicate chain id {0}")]
    DuplicateChain(ChainId),

    /// A source chain observes no message contracts.
    #[error("source chain {0} has no message contracts")]
    NoMessageContracts(ChainId),
}
