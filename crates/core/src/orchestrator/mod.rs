//! The per-partition processing pipeline.
//!
//! Each partition owns a bounded queue of candidate blocks and a fixed pool
//! of workers that run envelopes through protocol lookup, dedup check,
//! attestation and delivery before committing the block's height. Workers
//! complete in arbitrary order; the checkpoint manager restores order.

mod error;
pub use error::OrchestratorError;

mod worker;
pub use worker::{EnvelopeOutcome, SkipReason, Worker};

mod runner;
pub use runner::{Orchestrator, OrchestratorConfig};
