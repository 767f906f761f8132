//! Contact feature extraction for the scoring model
//!
//! A contact opportunity is summarized as a fixed-length vector in a fixed
//! order; the scoring model carries one weight per slot. All features are
//! normalized into [0, 1] before prediction.

use chrono::{DateTime, Utc};

use driftnet_core::{Bundle, NodeContext, NodeIdentity};

/// Number of features per contact
pub const FEATURE_COUNT: usize = 8;

/// Fixed-order feature vector for one (bundle, neighbor) contact
///
/// Slots, in order:
/// 0. distance-to-destination proxy (complement of the neighbor's
///    delivery predictability for the destination)
/// 1. neighbor battery level
/// 2. neighbor buffer occupancy fraction
/// 3. neighbor social weight
/// 4. neighbor trust score
/// 5. normalized bundle priority
/// 6. normalized bundle age (age / 1 hour, clamped)
/// 7. normalized hop count (hops / 10, clamped)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactFeatures(pub [f64; FEATURE_COUNT]);

impl ContactFeatures {
    /// Extract the feature vector for forwarding `bundle` to `neighbor`
    pub fn extract<I: NodeIdentity>(
        bundle: &Bundle<I>,
        neighbor: &NodeContext<I>,
        now: DateTime<Utc>,
    ) -> Self {
        let distance_proxy =
            (1.0 - neighbor.predictability_for(&bundle.destination)).clamp(0.0, 1.0);
        let age_secs = bundle.age(now).num_milliseconds().max(0) as f64 / 1000.0;

        Self([
            distance_proxy,
            neighbor.battery_level.clamp(0.0, 1.0),
            neighbor.buffer_fraction(),
            neighbor.social_weight.clamp(0.0, 1.0),
            neighbor.trust_score.clamp(0.0, 1.0),
            bundle.priority.normalized(),
            (age_secs / 3600.0).min(1.0),
            (bundle.hop_count as f64 / 10.0).min(1.0),
        ])
    }

    /// The raw feature slots
    pub fn as_array(&self) -> &[f64; FEATURE_COUNT] {
        &self.0
    }
}
