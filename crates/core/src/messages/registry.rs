use super::MessageProtocol;
use alloy_primitives::Address;
use std::{collections::HashMap, sync::Arc};

/// Maps origin contracts to the protocol implementation that understands
/// the envelopes they emit.
///
/// An origin contract with no registered protocol is not an error: its
/// envelopes are simply not relay candidates and are skipped.
#[derive(Debug, Default)]
pub struct ProtocolRegistry {
    protocols: HashMap<Address, Arc<dyn MessageProtocol>>,
}

impl ProtocolRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `protocol` for envelopes emitted by `origin_contract`,
    /// replacing any previous registration.
    pub fn register(&mut self, origin_contract: Address, protocol: Arc<dyn MessageProtocol>) {
        self.protocols.insert(origin_contract, protocol);
    }

    /// Looks up the protocol registered for `origin_contract`.
    pub fn lookup(&self, origin_contract: &Address) -> Option<Arc<dyn MessageProtocol>> {
        self.protocols.get(origin_contract).cloned()
    }

    /// The number of registered origin contracts.
    pub fn len(&self) -> usize {
        self.protocols.len()
    }

    /// Returns `true` if no protocol is registered.
    pub fn is_empty(&self) -> bool {
        self.protocols.is_empty()
    }
}
