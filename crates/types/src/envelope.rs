use alloy_primitives::{Address, B256, Bytes, ChainId, keccak256};
use serde::{Deserialize, Serialize};

/// An authenticated message extracted from a source-chain block.
///
/// Ephemeral: an envelope exists only for the duration of one processing
/// task. The payload is the raw, protocol-specific message body; decoding it
/// is the job of the protocol handler bound to the origin contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// The chain ID the envelope was observed on.
    pub source_chain_id: ChainId,
    /// The contract that emitted the envelope.
    pub origin_contract: Address,
    /// The raw message payload.
    pub payload: Bytes,
    /// The block height the envelope was extracted from.
    pub height: u64,
}

impl Envelope {
    /// Creates a new [`Envelope`].
    pub const fn new(
        source_chain_id: ChainId,
        origin_contract: Address,
        payload: Bytes,
        height: u64,
    ) -> Self {
        Self { source_chain_id, origin_contract, payload, height }
    }

    /// Derives the stable identifier for this message, used by destination
    /// side delivered-queries. Covers origin and payload but not the height,
    /// so a message re-emitted at a different height keeps its identity.
    pub fn message_id(&self) -> B256 {
        let mut preimage = Vec::with_capacity(8 + 20 + self.payload.len());
        preimage.extend_from_slice(&self.source_chain_id.to_be_bytes());
        preimage.extend_from_slice(self.origin_contract.as_slice());
        preimage.extend_from_slice(&self.payload);
        keccak256(&preimage)
    }
}

/// An [`Envelope`] together with the attestation required for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedEnvelope {
    /// The attested envelope.
    pub envelope: Envelope,
    /// The aggregated attestation over the envelope.
    pub attestation: Bytes,
}

impl SignedEnvelope {
    /// Creates a new [`SignedEnvelope`].
    pub const fn new(envelope: Envelope, attestation: Bytes) -> Self {
        Self { envelope, attestation }
    }
}

/// One candidate block pulled from a source chain: its height and the
/// envelopes extracted from it.
///
/// A block with no envelopes still flows through the pipeline so that its
/// height is committed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceBlock {
    /// The block height.
    pub height: u64,
    /// The envelopes extracted from the block.
    pub envelopes: Vec<Envelope>,
}

impl SourceBlock {
    /// Creates a new [`SourceBlock`].
    pub const fn new(height: u64, envelopes: Vec<Envelope>) -> Self {
        Self { height, envelopes }
    }

    /// Creates a [`SourceBlock`] containing no envelopes.
    pub const fn empty(height: u64) -> Self {
        Self { height, envelopes: Vec::new() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    #[test]
    fn test_message_id_ignores_height() {
        let contract = address!("00000000000000000000000000000000000000cc");
        let a = Envelope::new(1, contract, Bytes::from_static(b"payload"), 10);
        let b = Envelope::new(1, contract, Bytes::from_static(b"payload"), 99);
        assert_eq!(a.message_id(), b.message_id());
    }

    #[test]
    fn test_message_id_distinguishes_payloads() {
        let contract = address!("00000000000000000000000000000000000000cc");
        let a = Envelope::new(1, contract, Bytes::from_static(b"payload-a"), 10);
        let b = Envelope::new(1, contract, Bytes::from_static(b"payload-b"), 10);
        assert_ne!(a.message_id(), b.message_id());
    }
}
