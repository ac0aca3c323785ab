//! Crash-consistent progress tracking per relay route.
//!
//! Workers complete block heights in arbitrary order; the checkpoint manager
//! advances the persisted progress marker only across contiguous runs, so a
//! restart can always resume at `committed + 1` without skipping anything.

mod error;
pub use error::CheckpointError;

mod manager;
pub use manager::CheckpointManager;
