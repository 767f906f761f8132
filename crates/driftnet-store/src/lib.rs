//! # Driftnet Store
//!
//! Bounded per-node bundle storage for the Driftnet routing engine.
//!
//! Each node owns exactly one [`BundleStore`]. The store enforces the
//! capacity bound on every mutating operation, prefers dropping the
//! lowest-priority (then oldest) resident over rejecting a higher-priority
//! arrival, and sweeps TTL-expired bundles ahead of each routing
//! evaluation.

pub mod error;
pub mod store;

pub use error::StoreError;
pub use store::BundleStore;
