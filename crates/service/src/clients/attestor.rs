use alloy_primitives::{Address, Bytes, ChainId};
use async_trait::async_trait;
use courier_core::{AttestationError, AttestationProvider};
use courier_types::Envelope;
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Serialize)]
struct AttestationRequest<'a> {
    source_chain_id: ChainId,
    origin_contract: Address,
    payload: &'a Bytes,
    height: u64,
}

#[derive(Debug, Deserialize)]
struct AttestationResponse {
    attestation: Bytes,
}

/// An [`AttestationProvider`] backed by an HTTP aggregation service.
///
/// Posts the envelope and receives the aggregated attestation bytes once a
/// signing quorum is reached. Transport failures and server errors are
/// retryable; a client-error status means the service refused to attest.
#[derive(Debug)]
pub struct HttpAttestationClient {
    url: Url,
    client: reqwest::Client,
}

impl HttpAttestationClient {
    /// Creates a client posting to `url`.
    pub fn new(url: Url) -> Self {
        Self { url, client: reqwest::Client::new() }
    }
}

#[async_trait]
impl AttestationProvider for HttpAttestationClient {
    async fn attest(&self, envelope: &Envelope) -> Result<Bytes, AttestationError> {
        let request = AttestationRequest {
            source_chain_id: envelope.source_chain_id,
            origin_contract: envelope.origin_contract,
            payload: &envelope.payload,
            height: envelope.height,
        };
        let response = self
            .client
            .post(self.url.clone())
            .json(&request)
            .send()
            .await
            .map_err(|err| AttestationError::Unavailable(err.to_string()))?;

        let status = response.status();
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(AttestationError::Refused(format!("{status}: {body}")));
        }
        if !status.is_success() {
            return Err(AttestationError::Unavailable(status.to_string()));
        }

        let body: AttestationResponse = response
            .json()
            .await
            .map_err(|err| AttestationError::Unavailable(err.to_string()))?;
        Ok(body.attestation)
    }
}
