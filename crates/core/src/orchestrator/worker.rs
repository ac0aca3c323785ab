use super::OrchestratorError;
use crate::{
    AttestationProvider, CheckpointError, CheckpointManager, MessageError, ProtocolRegistry,
};
use backon::{ExponentialBuilder, Retryable};
use courier_storage::CheckpointStore;
use courier_types::{Envelope, PartitionKey, SignedEnvelope, SourceBlock};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

const MESSAGES_RELAYED: &str = "courier_messages_relayed_total";
const MESSAGES_SKIPPED: &str = "courier_messages_skipped_total";
const BLOCK_FAILURES: &str = "courier_block_failures_total";

/// The outcome of processing one envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeOutcome {
    /// The message was attested and delivered.
    Relayed,
    /// The envelope required no delivery.
    Skipped(SkipReason),
}

/// Why an envelope was skipped. Skips count as handled: they never block the
/// enclosing block's height commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No protocol is registered for the origin contract.
    UnsupportedOrigin,
    /// The message routes outside this worker's partition.
    ForeignRoute,
    /// Destination state shows the message was already delivered.
    AlreadyDelivered,
    /// The payload does not decode under the registered protocol.
    Undecodable,
}

impl SkipReason {
    const fn as_str(&self) -> &'static str {
        match self {
            Self::UnsupportedOrigin => "unsupported_origin",
            Self::ForeignRoute => "foreign_route",
            Self::AlreadyDelivered => "already_delivered",
            Self::Undecodable => "undecodable",
        }
    }
}

/// One worker of a partition's pool.
///
/// Pulls candidate blocks off the shared queue and runs every envelope
/// through lookup, dedup check, attestation and delivery before committing
/// the block's height. Workers of the same partition run concurrently; no
/// ordering holds between them — the checkpoint manager tolerates that.
#[derive(Debug)]
pub struct Worker<S, A> {
    partition: PartitionKey,
    registry: Arc<ProtocolRegistry>,
    checkpoint: Arc<CheckpointManager<S>>,
    attestor: Arc<A>,
    queue: async_channel::Receiver<SourceBlock>,
    cancellation: CancellationToken,
}

impl<S, A> Worker<S, A>
where
    S: CheckpointStore + 'static,
    A: AttestationProvider + 'static,
{
    /// Creates a new [`Worker`].
    pub const fn new(
        partition: PartitionKey,
        registry: Arc<ProtocolRegistry>,
        checkpoint: Arc<CheckpointManager<S>>,
        attestor: Arc<A>,
        queue: async_channel::Receiver<SourceBlock>,
        cancellation: CancellationToken,
    ) -> Self {
        Self { partition, registry, checkpoint, attestor, queue, cancellation }
    }

    /// Consumes blocks until cancellation or queue close.
    pub async fn run(self) {
        loop {
            tokio::select! {
                _ = self.cancellation.cancelled() => {
                    debug!(target: "courier::orchestrator", partition = %self.partition, "Worker cancelled");
                    break;
                }
                block = self.queue.recv() => {
                    let Ok(block) = block else { break };
                    let height = block.height;
                    if let Err(err) = self.handle_block(&block).await {
                        metrics::counter!(BLOCK_FAILURES, "partition" => self.partition.to_string())
                            .increment(1);
                        error!(
                            target: "courier::orchestrator",
                            partition = %self.partition,
                            height,
                            %err,
                            "Failed to process block; height left uncommitted for replay"
                        );
                    }
                }
            }
        }
    }

    /// Processes all envelopes of one block, then commits its height.
    ///
    /// An error means some envelope failed after retries; the height is not
    /// committed and startup catch-up will reprocess it. Skipped envelopes
    /// count as handled.
    pub async fn handle_block(&self, block: &SourceBlock) -> Result<(), OrchestratorError> {
        if let Err(err) = self.checkpoint.record_observed_height(block.height) {
            warn!(
                target: "courier::orchestrator",
                partition = %self.partition,
                height = block.height,
                %err,
                "Failed to record observed height"
            );
        }

        for envelope in &block.envelopes {
            match self.process_envelope(envelope).await? {
                EnvelopeOutcome::Relayed => {
                    metrics::counter!(MESSAGES_RELAYED, "partition" => self.partition.to_string())
                        .increment(1);
                }
                EnvelopeOutcome::Skipped(reason) => {
                    metrics::counter!(MESSAGES_SKIPPED, "reason" => reason.as_str()).increment(1);
                    trace!(
                        target: "courier::orchestrator",
                        partition = %self.partition,
                        height = envelope.height,
                        reason = reason.as_str(),
                        "Skipped envelope"
                    );
                }
            }
        }

        match self.checkpoint.commit_height(block.height) {
            Ok(()) => Ok(()),
            // The in-memory height advanced; only the recovery marker lags.
            // Retry the persist with backoff before leaving it to the next
            // advance. The block itself is done either way.
            Err(CheckpointError::Storage(err)) => {
                warn!(
                    target: "courier::orchestrator",
                    partition = %self.partition,
                    height = block.height,
                    %err,
                    "Failed to persist committed height, retrying"
                );
                if let Err(err) = (|| async { self.checkpoint.flush() })
                    .retry(ExponentialBuilder::default())
                    .when(|err: &CheckpointError| matches!(err, CheckpointError::Storage(_)))
                    .notify(|err, after| {
                        debug!(target: "courier::orchestrator", %err, ?after, "Retrying checkpoint persist");
                    })
                    .await
                {
                    error!(
                        target: "courier::orchestrator",
                        partition = %self.partition,
                        height = block.height,
                        %err,
                        "Committed height advanced in memory but failed to persist"
                    );
                }
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Runs one envelope through the relay pipeline.
    pub async fn process_envelope(
        &self,
        envelope: &Envelope,
    ) -> Result<EnvelopeOutcome, OrchestratorError> {
        let Some(protocol) = self.registry.lookup(&envelope.origin_contract) else {
            return Ok(EnvelopeOutcome::Skipped(SkipReason::UnsupportedOrigin));
        };

        let handler = match protocol.create_handler(envelope.clone()) {
            Ok(handler) => handler,
            Err(err) if err.is_unrecoverable() => {
                warn!(
                    target: "courier::orchestrator",
                    partition = %self.partition,
                    height = envelope.height,
                    origin = %envelope.origin_contract,
                    %err,
                    "Dropping undecodable envelope"
                );
                return Ok(EnvelopeOutcome::Skipped(SkipReason::Undecodable));
            }
            Err(err) => return Err(err.into()),
        };

        let routing = handler.routing_info();
        if !self.partition.admits(&routing) {
            trace!(
                target: "courier::orchestrator",
                partition = %self.partition,
                route = %routing.partition_key(),
                "Envelope routes outside this partition"
            );
            return Ok(EnvelopeOutcome::Skipped(SkipReason::ForeignRoute));
        }
        let destination = routing.destination_chain_id;

        let should_send = match (|| handler.should_send(destination))
            .retry(ExponentialBuilder::default())
            .when(|err: &MessageError| err.is_retryable())
            .notify(|err, after| {
                debug!(target: "courier::orchestrator", %err, ?after, "Retrying dedup check");
            })
            .await
        {
            Ok(should_send) => should_send,
            Err(err) if err.is_unrecoverable() => {
                warn!(
                    target: "courier::orchestrator",
                    partition = %self.partition,
                    height = envelope.height,
                    %err,
                    "Message routes to an unconfigured destination"
                );
                return Ok(EnvelopeOutcome::Skipped(SkipReason::ForeignRoute));
            }
            Err(err) => return Err(err.into()),
        };
        if !should_send {
            return Ok(EnvelopeOutcome::Skipped(SkipReason::AlreadyDelivered));
        }

        let attestation = (|| self.attestor.attest(envelope))
            .retry(ExponentialBuilder::default())
            .when(|err| err.is_retryable())
            .notify(|err, after| {
                debug!(target: "courier::orchestrator", %err, ?after, "Retrying attestation fetch");
            })
            .await?;
        let signed = SignedEnvelope::new(envelope.clone(), attestation);

        (|| handler.send(&signed, destination))
            .retry(ExponentialBuilder::default())
            .when(|err: &MessageError| err.is_retryable())
            .notify(|err, after| {
                debug!(target: "courier::orchestrator", %err, ?after, "Retrying delivery");
            })
            .await?;

        info!(
            target: "courier::orchestrator",
            partition = %self.partition,
            height = envelope.height,
            destination,
            "Relayed message"
        );
        Ok(EnvelopeOutcome::Relayed)
    }
}
