//! RPC-backed implementations of the core's collaborator traits.

mod source;
pub use source::RpcBlockSource;

mod destination;
pub use destination::RpcDestinationClient;

mod attestor;
pub use attestor::HttpAttestationClient;
