//! Core relay pipeline: checkpoint/ordering state, the message-protocol
//! abstraction, and the per-partition orchestrator that drives envelopes
//! from extraction through attested delivery to checkpoint commit.

pub mod checkpoint;
pub use checkpoint::{CheckpointError, CheckpointManager};

pub mod messages;
pub use messages::{
    MessageError, MessageHandler, MessageProtocol, NativeProtocol, ProtocolRegistry,
};

pub mod orchestrator;
pub use orchestrator::{Orchestrator, OrchestratorConfig, OrchestratorError};

pub mod config;
pub use config::{Config, ConfigError};

mod client;
pub use client::{ClientError, DestinationClient, TxResult};

mod attestation;
pub use attestation::{AttestationError, AttestationProvider};

mod source;
pub use source::{BlockSource, SourceError};
