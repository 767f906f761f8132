//! Forwarding policies
//!
//! A policy decides, per bundle per contact, whether to hand a copy to the
//! neighbor. Policies are a closed variant set dispatched through a single
//! [`RoutingPolicy::decide`]; the decision is a pure function of its
//! inputs and the engine applies all side effects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use driftnet_core::{Bundle, NodeContext, NodeIdentity};

use crate::features::ContactFeatures;
use crate::scoring::ScoringModel;
use crate::urgency::{UrgencyWeights, urgency_score};

/// Predictability threshold above which a node considers itself a carrier
const PREDICTABILITY_FORWARD_THRESHOLD: f64 = 0.5;

/// Pluggable forwarding strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoutingPolicy {
    /// Forward to every neighbor that has not carried the bundle yet.
    /// Unbounded copy count; maximizes delivery probability at the cost
    /// of bandwidth and storage.
    Epidemic,
    /// Forward only toward carriers with at least our own delivery
    /// predictability for the destination.
    Predictability,
    /// Bound total copies: spray while copies remain, then wait for
    /// direct contact with the destination.
    SprayAndWait { spray_factor: u8 },
    /// Threshold the learned delivery estimate against bundle urgency.
    Scored,
}

impl RoutingPolicy {
    /// Copy budget assigned to bundles originated under this policy
    pub fn initial_copies(&self) -> u8 {
        match self {
            RoutingPolicy::SprayAndWait { spray_factor } => (*spray_factor).max(1),
            _ => 1,
        }
    }

    /// Decide whether to forward a bundle to a neighbor
    pub fn decide<I: NodeIdentity>(
        &self,
        bundle: &Bundle<I>,
        local: &NodeContext<I>,
        neighbor: &NodeContext<I>,
        model: &ScoringModel,
        urgency_weights: &UrgencyWeights,
        now: DateTime<Utc>,
    ) -> ForwardDecision {
        if !bundle.is_live(now) {
            return ForwardDecision::Hold(HoldReason::Expired);
        }

        // Epidemic and Scored check the route path first: a destination
        // already on it received its copy, so meeting it again must not
        // re-send. Predictability and spray keep the destination bypass
        // ahead of their gates (worse-carrier rule, wait phase).
        match self {
            RoutingPolicy::Epidemic => {
                if bundle.has_visited(&neighbor.node_id) {
                    ForwardDecision::Hold(HoldReason::AlreadyCarried)
                } else {
                    ForwardDecision::Forward
                }
            }
            RoutingPolicy::Predictability => {
                if neighbor.node_id == bundle.destination {
                    return ForwardDecision::Forward;
                }
                let local_p = local.predictability_for(&bundle.destination);
                let neighbor_p = neighbor.predictability_for(&bundle.destination);
                if local_p <= PREDICTABILITY_FORWARD_THRESHOLD {
                    ForwardDecision::Hold(HoldReason::LowPredictability)
                } else if neighbor_p < local_p {
                    // Never hand off to a worse carrier
                    ForwardDecision::Hold(HoldReason::WorseCarrier)
                } else {
                    ForwardDecision::Forward
                }
            }
            RoutingPolicy::SprayAndWait { .. } => {
                if neighbor.node_id == bundle.destination {
                    return ForwardDecision::Forward;
                }
                if bundle.remaining_copies <= 1 {
                    ForwardDecision::Hold(HoldReason::WaitPhase)
                } else if bundle.has_visited(&neighbor.node_id) {
                    ForwardDecision::Hold(HoldReason::AlreadyCarried)
                } else {
                    ForwardDecision::Forward
                }
            }
            RoutingPolicy::Scored => {
                if bundle.has_visited(&neighbor.node_id) {
                    return ForwardDecision::Hold(HoldReason::AlreadyCarried);
                }
                if neighbor.node_id == bundle.destination {
                    return ForwardDecision::Forward;
                }
                let urgency = urgency_score(bundle, urgency_weights, now);
                let features = ContactFeatures::extract(bundle, neighbor, now);
                let predicted = model.predict(&features);
                // More urgent bundles forward at lower predicted success
                let threshold = 0.3 + 0.4 * urgency;
                if predicted > threshold {
                    ForwardDecision::Forward
                } else {
                    ForwardDecision::Hold(HoldReason::BelowThreshold)
                }
            }
        }
    }
}

/// Outcome of a policy decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardDecision {
    /// Hand an owned copy to the neighbor
    Forward,
    /// Keep carrying the bundle
    Hold(HoldReason),
}

impl ForwardDecision {
    /// Whether this decision results in a forward
    pub fn is_forward(&self) -> bool {
        matches!(self, ForwardDecision::Forward)
    }
}

/// Why a bundle was held rather than forwarded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldReason {
    /// TTL elapsed; the sweep will collect it
    Expired,
    /// Neighbor already appears on the route path
    AlreadyCarried,
    /// Local predictability for the destination is below threshold
    LowPredictability,
    /// Neighbor is a worse carrier for the destination
    WorseCarrier,
    /// Spray-and-wait wait phase: direct contact only
    WaitPhase,
    /// Predicted delivery probability below the urgency threshold
    BelowThreshold,
}
