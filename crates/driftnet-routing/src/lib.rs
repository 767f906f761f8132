//! # Driftnet Routing
//!
//! Forwarding policies for delay-tolerant store-and-forward networks.
//!
//! Connectivity in a driftnet deployment is intermittent: nodes carry
//! bundles and hand copies to neighbors during brief contact windows.
//! This crate holds the per-contact forwarding decision logic; the store
//! and the engine that applies decisions live in sibling crates.
//!
//! ## Policies
//!
//! - **Epidemic**: flood to every neighbor not already on the route path.
//! - **Predictability**: forward only toward carriers with at least our own
//!   encounter-derived delivery estimate for the destination.
//! - **Spray-and-wait**: bound total copies via binary splitting, then wait
//!   for direct contact with the destination.
//! - **Scored**: an online logistic model predicts per-contact delivery
//!   success and is thresholded against bundle urgency.
//!
//! ## Modules
//!
//! - [`policy`]: the [`RoutingPolicy`] variants and the decision function
//! - [`scoring`]: the logistic [`ScoringModel`] and its online update
//! - [`features`]: per-contact feature extraction
//! - [`urgency`]: priority- and deadline-driven urgency scoring
//! - [`seen`]: duplicate-suppression cache of observed bundle ids

pub mod features;
pub mod policy;
pub mod scoring;
pub mod seen;
pub mod urgency;

pub use features::{ContactFeatures, FEATURE_COUNT};
pub use policy::{ForwardDecision, HoldReason, RoutingPolicy};
pub use scoring::{ScoringConfig, ScoringModel};
pub use seen::{SeenCache, SeenRecord};
pub use urgency::{UrgencyWeights, urgency_score};
