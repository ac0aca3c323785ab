//! Service layer for the courier relayer.
//!
//! Wires configuration into running partitions: per-route checkpoint
//! managers and orchestrators, a polling block feed per source chain, and
//! the RPC-backed collaborators (source reader, destination client,
//! attestation client). Owns startup catch-up and graceful shutdown.

mod error;
pub use error::ServiceError;

mod service;
pub use service::Service;

mod feed;
pub use feed::BlockFeed;

pub mod clients;
pub use clients::{HttpAttestationClient, RpcBlockSource, RpcDestinationClient};
