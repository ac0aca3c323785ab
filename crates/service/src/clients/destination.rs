use crate::ServiceError;
use alloy_network::EthereumWallet;
use alloy_primitives::{Address, B256, Bytes, ChainId, keccak256};
use alloy_provider::{DynProvider, Provider, ProviderBuilder};
use alloy_rpc_types_eth::{TransactionInput, TransactionRequest};
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use courier_core::{ClientError, DestinationClient, TxResult};
use courier_types::SignedEnvelope;
use url::Url;

/// A [`DestinationClient`] submitting deliveries over JSON-RPC with a local
/// signing key.
///
/// Delivered-queries are issued as `eth_call`s against the configured
/// gateway contract.
#[derive(Debug)]
pub struct RpcDestinationClient {
    chain_id: ChainId,
    gateway: Address,
    sender: Address,
    provider: DynProvider,
}

impl RpcDestinationClient {
    /// Creates a client for `chain_id`, signing with `account_private_key`.
    pub fn new(
        chain_id: ChainId,
        rpc_url: Url,
        gateway: Address,
        account_private_key: &str,
    ) -> Result<Self, ServiceError> {
        let signer: PrivateKeySigner = account_private_key
            .parse()
            .map_err(|err| ServiceError::ClientSetup(format!("invalid account key: {err}")))?;
        let sender = signer.address();
        let provider =
            ProviderBuilder::new().wallet(EthereumWallet::from(signer)).connect_http(rpc_url);
        Ok(Self { chain_id, gateway, sender, provider: provider.erased() })
    }

    fn delivered_query(message_id: B256) -> Bytes {
        let selector = &keccak256(b"messageDelivered(bytes32)")[..4];
        let mut data = Vec::with_capacity(4 + 32);
        data.extend_from_slice(selector);
        data.extend_from_slice(message_id.as_slice());
        data.into()
    }

    fn classify(err: impl core::fmt::Display) -> ClientError {
        let message = err.to_string();
        if message.contains("revert") {
            ClientError::Rejected(message)
        } else {
            ClientError::Network(message)
        }
    }
}

#[async_trait]
impl DestinationClient for RpcDestinationClient {
    fn destination_chain_id(&self) -> ChainId {
        self.chain_id
    }

    fn sender_address(&self) -> Address {
        self.sender
    }

    async fn message_delivered(&self, message_id: B256) -> Result<bool, ClientError> {
        let request = TransactionRequest::default()
            .to(self.gateway)
            .input(TransactionInput::new(Self::delivered_query(message_id)));
        let returned = self.provider.call(request).await.map_err(Self::classify)?;
        Ok(returned.last().is_some_and(|byte| *byte != 0))
    }

    async fn send_tx(
        &self,
        signed: &SignedEnvelope,
        to: Address,
        gas_limit: u64,
        call_data: Bytes,
    ) -> Result<TxResult, ClientError> {
        // The gateway expects the attestation ahead of the protocol calldata.
        let mut input = Vec::with_capacity(signed.attestation.len() + call_data.len());
        input.extend_from_slice(&signed.attestation);
        input.extend_from_slice(&call_data);
        let request = TransactionRequest::default()
            .from(self.sender)
            .to(to)
            .gas_limit(gas_limit)
            .input(TransactionInput::new(input.into()));
        let pending = self.provider.send_transaction(request).await.map_err(Self::classify)?;
        Ok(TxResult { tx_hash: *pending.tx_hash() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivered_query_layout() {
        let id = B256::repeat_byte(0x5a);
        let data = RpcDestinationClient::delivered_query(id);
        assert_eq!(data.len(), 36);
        assert_eq!(&data[..4], &keccak256(b"messageDelivered(bytes32)")[..4]);
        assert_eq!(&data[4..], id.as_slice());
    }

    #[test]
    fn test_classify_revert_vs_network() {
        assert!(matches!(
            RpcDestinationClient::classify("execution reverted: delivered"),
            ClientError::Rejected(_)
        ));
        assert!(matches!(
            RpcDestinationClient::classify("connection refused"),
            ClientError::Network(_)
        ));
    }
}
