use alloy_primitives::{Address, B256, ChainId, keccak256};
use serde::{Deserialize, Serialize};

/// The identity of one relay route: a (source chain, destination chain,
/// origin sender, destination address) tuple.
///
/// All checkpoint and ordering state is scoped by this key. Equality is
/// field-wise; [`Self::key_id`] derives the stable identifier used as the
/// storage namespace discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartitionKey {
    /// The chain ID the messages originate from.
    pub source_chain_id: ChainId,
    /// The chain ID the messages are delivered to.
    pub destination_chain_id: ChainId,
    /// The sender address this route relays for.
    pub origin_sender: Address,
    /// The destination address this route delivers to.
    pub destination_address: Address,
}

impl PartitionKey {
    /// Creates a new [`PartitionKey`].
    pub const fn new(
        source_chain_id: ChainId,
        destination_chain_id: ChainId,
        origin_sender: Address,
        destination_address: Address,
    ) -> Self {
        Self { source_chain_id, destination_chain_id, origin_sender, destination_address }
    }

    /// Returns `true` if a message with the given routing metadata travels
    /// this route. A zero `origin_sender` or `destination_address` acts as a
    /// wildcard admitting any address.
    pub fn admits(&self, routing: &crate::RoutingInfo) -> bool {
        self.source_chain_id == routing.source_chain_id
            && self.destination_chain_id == routing.destination_chain_id
            && (self.origin_sender.is_zero() || self.origin_sender == routing.origin_sender)
            && (self.destination_address.is_zero()
                || self.destination_address == routing.destination_address)
    }

    /// Derives the fixed-width identifier for this route.
    ///
    /// The four fields are joined with `-` in a stable encoding (decimal
    /// chain IDs, checksummed addresses) and hashed. The result is identical
    /// across processes and restarts, so persisted state keyed by it can be
    /// correlated across runs.
    pub fn key_id(&self) -> B256 {
        keccak256(
            format!(
                "{}-{}-{}-{}",
                self.source_chain_id,
                self.destination_chain_id,
                self.origin_sender,
                self.destination_address,
            )
            .as_bytes(),
        )
    }
}

impl core::fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{}->{} [{} -> {}]",
            self.source_chain_id, self.destination_chain_id, self.origin_sender, self.destination_address,
        )
    }
}
