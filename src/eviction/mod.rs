//! Eviction Module
//!
//! Policy validation and capacity enforcement for the persistence tier.
//! Time-based expiry runs in the background, see [`crate::tasks`].

mod capacity;
mod policy;

pub use capacity::{eviction_order, CapacityEvictor};
pub use policy::EvictionPolicy;
