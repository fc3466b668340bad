//! Fetch Cycles
//!
//! One cycle runs from an idle re-entry to a terminal state write.
//!
//! # Steps
//! - Optional fresh-cache short circuit
//! - Network attempts with a fixed delay between them
//! - A guarded terminal write that newer cycles can veto

mod cycle;
mod orchestrator;

pub use cycle::{CycleContext, CycleMarker};
pub use orchestrator::{CycleOutcome, Orchestrator};
