//! Background Tasks Module
//!
//! Contains work that runs off the caller's thread.
//!
//! # Tasks
//! - Expiry sweep: deletes persisted records older than an expiry window

mod sweep;

pub use sweep::{run_sweep, ExpirySweepScheduler, SweepReport};
