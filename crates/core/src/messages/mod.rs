//! The pluggable message-protocol abstraction.
//!
//! Wire format, fee accounting and destination call shape differ per
//! protocol, but the orchestration (dedup-then-send-then-commit) is
//! identical. The registry isolates protocol-specific logic behind one
//! narrow contract so the pipeline stays protocol-agnostic.

mod error;
pub use error::MessageError;

mod registry;
pub use registry::ProtocolRegistry;

mod native;
pub use native::{NativeProtocol, DEFAULT_GAS_LIMIT};

use alloy_primitives::ChainId;
use async_trait::async_trait;
use courier_types::{Envelope, RoutingInfo, SignedEnvelope};
use std::fmt::Debug;

/// Protocol-specific logic for one supported message format. One
/// implementation per wire-format variant; instances are registered per
/// origin contract in a [`ProtocolRegistry`].
pub trait MessageProtocol: Send + Sync + Debug {
    /// Binds a stateful handler to one envelope, decoding its payload
    /// according to the protocol's wire format.
    ///
    /// A [`MessageError::Decode`] means the payload is malformed; the
    /// envelope is dropped without retry since resubmitting the same bytes
    /// cannot change the result.
    fn create_handler(&self, envelope: Envelope) -> Result<Box<dyn MessageHandler>, MessageError>;
}

/// A handler bound to one envelope, owned exclusively by the worker
/// processing it and discarded after the task completes.
#[async_trait]
pub trait MessageHandler: Send + Sync + Debug {
    /// Returns `true` if the message still must be sent to the destination
    /// chain.
    ///
    /// Queries true destination state, not local memory: the process may
    /// have restarted after a prior successful delivery whose checkpoint
    /// commit never persisted. Safe to call repeatedly.
    async fn should_send(&self, destination_chain_id: ChainId) -> Result<bool, MessageError>;

    /// Submits the attested message to the destination chain.
    async fn send(
        &self,
        signed: &SignedEnvelope,
        destination_chain_id: ChainId,
    ) -> Result<(), MessageError>;

    /// Routing metadata for the message, used to resolve the partition the
    /// delivery and checkpoint are scoped by.
    fn routing_info(&self) -> RoutingInfo;

    /// The envelope this handler is bound to.
    fn envelope(&self) -> &Envelope;
}
