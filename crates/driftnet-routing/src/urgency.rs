//! Urgency scoring shared by the scored policy and diagnostics
//!
//! Urgency measures how close a bundle is to being dropped: a base term
//! per priority class, plus pressure as the TTL runs out, minus a penalty
//! per retransmission already spent on it. Always clamped to [0, 1].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use driftnet_core::{Bundle, NodeIdentity, Priority};

/// Base urgency per priority class; a configuration input
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UrgencyWeights {
    pub emergency: f64,
    pub medical: f64,
    pub general: f64,
    pub low: f64,
}

impl Default for UrgencyWeights {
    fn default() -> Self {
        Self {
            emergency: 1.0,
            medical: 0.8,
            general: 0.5,
            low: 0.2,
        }
    }
}

impl UrgencyWeights {
    /// Base term for a priority class
    pub fn base_for(&self, priority: Priority) -> f64 {
        match priority {
            Priority::Emergency => self.emergency,
            Priority::Medical => self.medical,
            Priority::General => self.general,
            Priority::Low => self.low,
        }
    }
}

/// Urgency of a bundle at the given time, in [0, 1]
///
/// base + `0.5 * (1 - remaining ttl fraction)` - `0.1 * retransmissions`,
/// clamped at both ends.
pub fn urgency_score<I: NodeIdentity>(
    bundle: &Bundle<I>,
    weights: &UrgencyWeights,
    now: DateTime<Utc>,
) -> f64 {
    let base = weights.base_for(bundle.priority);
    let ttl_pressure = 0.5 * (1.0 - bundle.ttl_fraction_remaining(now));
    let retransmission_penalty = 0.1 * bundle.retransmission_count as f64;
    (base + ttl_pressure - retransmission_penalty).clamp(0.0, 1.0)
}
