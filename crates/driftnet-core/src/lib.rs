//! # Driftnet Core
//!
//! Core types for the Driftnet delay-tolerant routing engine.
//!
//! Driftnet models store-and-forward message delivery over intermittently
//! connected nodes: a bundle is carried until a useful contact appears,
//! then forwarded, possibly duplicated, until it reaches its destination
//! or expires. This crate holds the types the other crates build on:
//!
//! - [`NodeIdentity`]: abstraction over node identification
//!   ([`SimulationId`] for tests and simulation)
//! - [`Bundle`]: the unit of data in transit, with its routing metadata
//! - [`NodeContext`]: per-node mutable routing state
//! - [`Transport`]: the outbound boundary toward the transport collaborator
//!
//! The core is driven entirely by an external clock: every time-dependent
//! operation takes an explicit `now`, and nothing here spawns timers or
//! threads.

pub mod bundle;
pub mod context;
pub mod error;
pub mod identity;
pub mod transport;

pub use bundle::{Bundle, BundleId, BundleState, Priority};
pub use context::{NodeContext, NodeType, PredictabilityParams};
pub use error::IdentityError;
pub use identity::{NodeIdentity, SimulationId};
pub use transport::{DropReason, ForwardRefusal, Transport};
