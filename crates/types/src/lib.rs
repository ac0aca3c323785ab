//! Core types shared across courier components.
//!
//! This crate defines the fundamental data structures used by the relayer:
//! partition identities, message envelopes and routing metadata.

mod partition;
pub use partition::PartitionKey;

mod envelope;
pub use envelope::{Envelope, SignedEnvelope, SourceBlock};

mod routing;
pub use routing::RoutingInfo;
