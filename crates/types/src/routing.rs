use crate::PartitionKey;
use alloy_primitives::{Address, ChainId};
use derive_more::Constructor;

/// Routing metadata reported by a protocol handler for one envelope:
/// where the message came from and where it must be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Constructor)]
pub struct RoutingInfo {
    /// The chain ID the message originated on.
    pub source_chain_id: ChainId,
    /// The address that sent the message on the source chain.
    pub origin_sender: Address,
    /// The chain ID the message must be delivered to.
    pub destination_chain_id: ChainId,
    /// The address the message must be delivered to.
    pub destination_address: Address,
}

impl RoutingInfo {
    /// The [`PartitionKey`] of the route this message travels.
    pub const fn partition_key(&self) -> PartitionKey {
        PartitionKey::new(
            self.source_chain_id,
            self.destination_chain_id,
            self.origin_sender,
            self.destination_address,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    #[test]
    fn test_partition_key_mirrors_routing() {
        let sender = address!("00000000000000000000000000000000000000aa");
        let receiver = address!("00000000000000000000000000000000000000bb");
        let routing = RoutingInfo::new(1, sender, 2, receiver);
        let key = routing.partition_key();
        assert_eq!(key, PartitionKey::new(1, 2, sender, receiver));
        assert!(key.admits(&routing));
    }
}
