use super::{MessageError, MessageHandler, MessageProtocol};
use crate::DestinationClient;
use alloy_primitives::{Address, Bytes, ChainId};
use async_trait::async_trait;
use courier_types::{Envelope, RoutingInfo, SignedEnvelope};
use std::{collections::HashMap, sync::Arc};
use tracing::{debug, info};

/// Gas limit used for delivery transactions unless configured otherwise.
pub const DEFAULT_GAS_LIMIT: u64 = 250_000;

/// Payload prefix: destination chain ID (8 bytes BE) + destination address
/// (20 bytes).
const HEADER_LEN: usize = 28;

/// The native message format: payloads carry an 8-byte big-endian
/// destination chain ID and a 20-byte destination address, followed by the
/// message body delivered as calldata.
///
/// Carries a reward address appended to the calldata so the destination
/// contract can credit the relayer that performed the delivery.
#[derive(Debug)]
pub struct NativeProtocol<C> {
    destinations: Arc<HashMap<ChainId, Arc<C>>>,
    reward_address: Address,
    gas_limit: u64,
}

impl<C> NativeProtocol<C> {
    /// Creates a protocol instance over the configured destination clients.
    pub fn new(destinations: HashMap<ChainId, Arc<C>>, reward_address: Address) -> Self {
        Self { destinations: Arc::new(destinations), reward_address, gas_limit: DEFAULT_GAS_LIMIT }
    }

    /// Overrides the delivery gas limit.
    pub const fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }
}

impl<C: DestinationClient + 'static> MessageProtocol for NativeProtocol<C> {
    fn create_handler(&self, envelope: Envelope) -> Result<Box<dyn MessageHandler>, MessageError> {
        let payload = envelope.payload.as_ref();
        if payload.len() < HEADER_LEN {
            return Err(MessageError::Decode(format!(
                "payload too short: {} < {HEADER_LEN}",
                payload.len()
            )));
        }
        let destination_chain_id = u64::from_be_bytes(
            payload[..8].try_into().map_err(|_| MessageError::Decode("bad header".to_string()))?,
        );
        let destination_address = Address::from_slice(&payload[8..HEADER_LEN]);
        let body = Bytes::copy_from_slice(&payload[HEADER_LEN..]);

        let routing = RoutingInfo::new(
            envelope.source_chain_id,
            envelope.origin_contract,
            destination_chain_id,
            destination_address,
        );
        debug!(
            target: "courier::messages",
            height = envelope.height,
            destination_chain_id,
            %destination_address,
            "Decoded native message"
        );
        Ok(Box::new(NativeHandler {
            envelope,
            routing,
            body,
            destinations: self.destinations.clone(),
            reward_address: self.reward_address,
            gas_limit: self.gas_limit,
        }))
    }
}

/// A [`NativeProtocol`] handler bound to one decoded envelope.
#[derive(Debug)]
struct NativeHandler<C> {
    envelope: Envelope,
    routing: RoutingInfo,
    body: Bytes,
    destinations: Arc<HashMap<ChainId, Arc<C>>>,
    reward_address: Address,
    gas_limit: u64,
}

impl<C> NativeHandler<C> {
    fn client(&self, destination_chain_id: ChainId) -> Result<&Arc<C>, MessageError> {
        self.destinations
            .get(&destination_chain_id)
            .ok_or(MessageError::UnknownDestination(destination_chain_id))
    }

    /// Reward address followed by the decoded body; the destination contract
    /// credits the relayer out of the message's fee allowance.
    fn call_data(&self) -> Bytes {
        let mut data = Vec::with_capacity(20 + self.body.len());
        data.extend_from_slice(self.reward_address.as_slice());
        data.extend_from_slice(&self.body);
        data.into()
    }
}

#[async_trait]
impl<C: DestinationClient + 'static> MessageHandler for NativeHandler<C> {
    async fn should_send(&self, destination_chain_id: ChainId) -> Result<bool, MessageError> {
        let client = self.client(destination_chain_id)?;
        let delivered = client.message_delivered(self.envelope.message_id()).await?;
        Ok(!delivered)
    }

    async fn send(
        &self,
        signed: &SignedEnvelope,
        destination_chain_id: ChainId,
    ) -> Result<(), MessageError> {
        let client = self.client(destination_chain_id)?;
        let result = client
            .send_tx(signed, self.routing.destination_address, self.gas_limit, self.call_data())
            .await?;
        info!(
            target: "courier::messages",
            height = self.envelope.height,
            destination_chain_id,
            tx_hash = %result.tx_hash,
            "Delivered native message"
        );
        Ok(())
    }

    fn routing_info(&self) -> RoutingInfo {
        self.routing
    }

    fn envelope(&self) -> &Envelope {
        &self.envelope
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ClientError, TxResult};
    use alloy_primitives::{B256, address, b256};
    use mockall::{mock, predicate::eq};

    mock!(
        #[derive(Debug)]
        pub Destination {}

        #[async_trait]
        impl DestinationClient for Destination {
            fn destination_chain_id(&self) -> ChainId;
            fn sender_address(&self) -> Address;
            async fn message_delivered(&self, message_id: B256) -> Result<bool, ClientError>;
            async fn send_tx(
                &self,
                signed: &SignedEnvelope,
                to: Address,
                gas_limit: u64,
                call_data: Bytes,
            ) -> Result<TxResult, ClientError>;
        }
    );

    const DEST_ADDR: Address = address!("00000000000000000000000000000000000000dd");
    const REWARD: Address = address!("00000000000000000000000000000000000000ee");

    fn native_payload(destination_chain_id: ChainId, to: Address, body: &[u8]) -> Bytes {
        let mut payload = Vec::new();
        payload.extend_from_slice(&destination_chain_id.to_be_bytes());
        payload.extend_from_slice(to.as_slice());
        payload.extend_from_slice(body);
        payload.into()
    }

    fn protocol_with(client: MockDestination) -> NativeProtocol<MockDestination> {
        let mut destinations = HashMap::new();
        destinations.insert(2u64, Arc::new(client));
        NativeProtocol::new(destinations, REWARD)
    }

    #[test]
    fn test_short_payload_is_decode_error() {
        let protocol = protocol_with(MockDestination::new());
        let envelope = Envelope::new(
            1,
            address!("00000000000000000000000000000000000000cc"),
            Bytes::from_static(b"short"),
            10,
        );
        let err = protocol.create_handler(envelope).unwrap_err();
        assert!(matches!(err, MessageError::Decode(_)));
        assert!(err.is_unrecoverable());
    }

    #[test]
    fn test_routing_info_comes_from_payload() {
        let origin = address!("00000000000000000000000000000000000000cc");
        let protocol = protocol_with(MockDestination::new());
        let envelope = Envelope::new(1, origin, native_payload(2, DEST_ADDR, b"body"), 10);
        let handler = protocol.create_handler(envelope).unwrap();
        let routing = handler.routing_info();
        assert_eq!(routing, RoutingInfo::new(1, origin, 2, DEST_ADDR));
    }

    #[tokio::test]
    async fn test_should_send_false_when_already_delivered() {
        let mut client = MockDestination::new();
        client.expect_message_delivered().returning(|_| Ok(true));
        let protocol = protocol_with(client);
        let envelope = Envelope::new(
            1,
            address!("00000000000000000000000000000000000000cc"),
            native_payload(2, DEST_ADDR, b"body"),
            10,
        );
        let handler = protocol.create_handler(envelope).unwrap();
        assert!(!handler.should_send(2).await.unwrap());
    }

    #[tokio::test]
    async fn test_send_prefixes_reward_address() {
        let tx_hash = b256!("4444444444444444444444444444444444444444444444444444444444444444");
        let mut expected_call_data = Vec::new();
        expected_call_data.extend_from_slice(REWARD.as_slice());
        expected_call_data.extend_from_slice(b"body");

        let mut client = MockDestination::new();
        client
            .expect_send_tx()
            .with(
                mockall::predicate::always(),
                eq(DEST_ADDR),
                eq(DEFAULT_GAS_LIMIT),
                eq(Bytes::from(expected_call_data)),
            )
            .returning(move |_, _, _, _| Ok(TxResult { tx_hash }));
        let protocol = protocol_with(client);
        let envelope = Envelope::new(
            1,
            address!("00000000000000000000000000000000000000cc"),
            native_payload(2, DEST_ADDR, b"body"),
            10,
        );
        let handler = protocol.create_handler(envelope.clone()).unwrap();
        let signed = SignedEnvelope::new(envelope, Bytes::from_static(b"attestation"));
        handler.send(&signed, 2).await.unwrap();
    }

    #[tokio::test]
    async fn test_unknown_destination_is_unrecoverable() {
        let protocol = protocol_with(MockDestination::new());
        let envelope = Envelope::new(
            1,
            address!("00000000000000000000000000000000000000cc"),
            native_payload(9, DEST_ADDR, b"body"),
            10,
        );
        let handler = protocol.create_handler(envelope).unwrap();
        let err = handler.should_send(9).await.unwrap_err();
        assert_eq!(err, MessageError::UnknownDestination(9));
        assert!(err.is_unrecoverable());
    }
}
