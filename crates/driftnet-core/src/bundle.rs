//! DTN bundles - the unit of application data in transit
//!
//! A bundle is carried by a node until a useful contact appears, then
//! forwarded, possibly duplicated, until it reaches its destination or
//! expires. Besides identity and payload it carries the mutable routing
//! metadata the policies and the scoring model work from.

use std::hash::{Hash, Hasher};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::NodeIdentity;

/// Unique identifier for a bundle
///
/// Derived from the source node, an explicit creation timestamp and a
/// per-source sequence number, so ids are unique without coordination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BundleId {
    /// Hash of the source identity
    pub source_hash: u64,
    /// Creation timestamp in Unix milliseconds
    pub created_ms: i64,
    /// Sequence number for bundles created at the same millisecond
    pub sequence: u32,
}

impl BundleId {
    /// Create a new bundle ID at an externally supplied time
    pub fn new(source_hash: u64, sequence: u32, now: DateTime<Utc>) -> Self {
        Self {
            source_hash,
            created_ms: now.timestamp_millis(),
            sequence,
        }
    }
}

impl std::fmt::Display for BundleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:08x}@{}#{}",
            self.source_hash & 0xFFFF,
            self.created_ms,
            self.sequence
        )
    }
}

/// Priority classes for bundles
///
/// Ordered so that `Emergency > Medical > General > Low`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum Priority {
    /// Lowest priority - first to be evicted under buffer pressure
    Low,
    /// Routine traffic (default)
    #[default]
    General,
    /// Medical traffic - elevated handling
    Medical,
    /// Emergency traffic - highest priority, forwarded most liberally
    Emergency,
}

impl Priority {
    /// All classes, lowest first
    pub const ALL: [Priority; 4] = [
        Priority::Low,
        Priority::General,
        Priority::Medical,
        Priority::Emergency,
    ];

    /// Map the class onto [0, 1] for the scoring feature vector
    pub fn normalized(self) -> f64 {
        match self {
            Priority::Low => 0.0,
            Priority::General => 1.0 / 3.0,
            Priority::Medical => 2.0 / 3.0,
            Priority::Emergency => 1.0,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::Low => write!(f, "low"),
            Priority::General => write!(f, "general"),
            Priority::Medical => write!(f, "medical"),
            Priority::Emergency => write!(f, "emergency"),
        }
    }
}

/// Lifecycle state of a bundle at one node
///
/// `Delivered` and `Expired` are terminal; a copy in a terminal state is
/// removed from that node's store. Copies at other nodes continue
/// independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BundleState {
    /// Created at the originating node, not yet stored
    Created,
    /// Resident in a store, eligible for forwarding
    InTransit,
    /// Received by its destination
    Delivered,
    /// TTL elapsed or evicted under buffer pressure
    Expired,
}

/// A unit of application data in transit
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "I: NodeIdentity")]
pub struct Bundle<I: NodeIdentity> {
    /// Bundle identifier, immutable after creation
    pub id: BundleId,
    /// Originating node
    pub source: I,
    /// Final destination
    pub destination: I,
    /// Priority class
    pub priority: Priority,
    /// Application payload
    pub payload: Vec<u8>,
    /// When the bundle was created
    pub creation_time: DateTime<Utc>,
    /// Lifetime; the bundle is live iff `now - creation_time < ttl`
    pub ttl: Duration,
    /// Lifecycle state at the holding node
    pub state: BundleState,
    /// Hops taken so far, monotonically non-decreasing
    pub hop_count: u32,
    /// Forward attempts so far, monotonically non-decreasing
    pub retransmission_count: u32,
    /// Last scored delivery estimate, in [0, 1]
    pub delivery_probability: f64,
    /// Last computed urgency, in [0, 1]
    pub urgency_score: f64,
    /// Total energy spent forwarding this copy
    pub energy_cost_accrued: f64,
    /// When this copy was last forwarded
    pub last_forward_time: Option<DateTime<Utc>>,
    /// Copies left for spray-and-wait; only ever decrements
    pub remaining_copies: u8,
    /// Nodes this copy has visited, append-only, seeded with the source
    pub route_path: Vec<I>,
}

impl<I: NodeIdentity> Bundle<I> {
    /// Create a new bundle at the originating node
    pub fn new(
        id: BundleId,
        source: I,
        destination: I,
        payload: Vec<u8>,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Self {
        let route_path = vec![source.clone()];
        Self {
            id,
            source,
            destination,
            priority: Priority::default(),
            payload,
            creation_time: now,
            ttl,
            state: BundleState::Created,
            hop_count: 0,
            retransmission_count: 0,
            delivery_probability: 0.5,
            urgency_score: 0.0,
            energy_cost_accrued: 0.0,
            last_forward_time: None,
            remaining_copies: 1,
            route_path,
        }
    }

    /// Set the priority class
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Set the copy budget for spray-and-wait routing
    pub fn with_copies(mut self, copies: u8) -> Self {
        self.remaining_copies = copies.max(1);
        self
    }

    /// Age of this bundle at the given time
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.creation_time
    }

    /// Whether the TTL has not yet elapsed
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.age(now) < self.ttl
    }

    /// Fraction of the TTL still remaining, clamped to [0, 1]
    pub fn ttl_fraction_remaining(&self, now: DateTime<Utc>) -> f64 {
        let total = self.ttl.num_milliseconds();
        if total <= 0 {
            return 0.0;
        }
        let remaining = (self.ttl - self.age(now)).num_milliseconds();
        (remaining as f64 / total as f64).clamp(0.0, 1.0)
    }

    /// Check whether a node already appears on this copy's route
    pub fn has_visited(&self, node: &I) -> bool {
        self.route_path.contains(node)
    }

    /// Apply the forwarding side effects as a single unit
    ///
    /// Called once per successful forward decision; callers must have
    /// already checked the energy budget so this cannot fail partway.
    pub fn apply_forward(&mut self, local: &I, energy_cost: f64, now: DateTime<Utc>) {
        self.hop_count += 1;
        self.retransmission_count += 1;
        self.energy_cost_accrued += energy_cost;
        self.last_forward_time = Some(now);
        if !self.has_visited(local) {
            self.route_path.push(local.clone());
        }
    }

    /// Split the copy budget for a binary spray
    ///
    /// The holder keeps the ceiling half, the relayed copy gets the floor
    /// half. Returns the relay's share; both sides stay at least 1 and the
    /// count never goes negative.
    pub fn split_copies(&mut self) -> u8 {
        if self.remaining_copies <= 1 {
            return 0;
        }
        let given = self.remaining_copies / 2;
        self.remaining_copies -= given;
        given
    }
}

impl<I: NodeIdentity> PartialEq for Bundle<I> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<I: NodeIdentity> Eq for Bundle<I> {}

impl<I: NodeIdentity> Hash for Bundle<I> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::SimulationId;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    fn make_bundle(ttl_secs: i64) -> Bundle<SimulationId> {
        let source = SimulationId::new('A').unwrap();
        let dest = SimulationId::new('Z').unwrap();
        let id = BundleId::new(source.stable_hash(), 0, t0());
        Bundle::new(
            id,
            source,
            dest,
            b"test payload".to_vec(),
            Duration::seconds(ttl_secs),
            t0(),
        )
    }

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::Emergency > Priority::Medical);
        assert!(Priority::Medical > Priority::General);
        assert!(Priority::General > Priority::Low);
    }

    #[test]
    fn test_bundle_creation() {
        let bundle = make_bundle(3600);
        assert_eq!(bundle.state, BundleState::Created);
        assert_eq!(bundle.hop_count, 0);
        assert_eq!(bundle.remaining_copies, 1);
        assert!(bundle.has_visited(&SimulationId::new('A').unwrap()));
        assert!(bundle.is_live(t0()));
    }

    #[test]
    fn test_ttl_elapses() {
        let bundle = make_bundle(300);
        let later = t0() + Duration::seconds(301);
        assert!(!bundle.is_live(later));
        assert_eq!(bundle.ttl_fraction_remaining(later), 0.0);
    }

    #[test]
    fn test_ttl_fraction_remaining() {
        let bundle = make_bundle(100);
        let halfway = t0() + Duration::seconds(50);
        let frac = bundle.ttl_fraction_remaining(halfway);
        assert!((frac - 0.5).abs() < 1e-9);
        assert_eq!(bundle.ttl_fraction_remaining(t0()), 1.0);
    }

    #[test]
    fn test_apply_forward() {
        let mut bundle = make_bundle(3600);
        let relay = SimulationId::new('B').unwrap();
        let now = t0() + Duration::seconds(10);

        bundle.apply_forward(&relay, 0.25, now);

        assert_eq!(bundle.hop_count, 1);
        assert_eq!(bundle.retransmission_count, 1);
        assert!((bundle.energy_cost_accrued - 0.25).abs() < 1e-12);
        assert_eq!(bundle.last_forward_time, Some(now));
        assert!(bundle.has_visited(&relay));

        // Forwarding again from the same node does not duplicate the path entry
        bundle.apply_forward(&relay, 0.25, now);
        assert_eq!(
            bundle.route_path.iter().filter(|n| **n == relay).count(),
            1
        );
    }

    #[test]
    fn test_split_copies_binary() {
        let mut bundle = make_bundle(3600).with_copies(4);
        assert_eq!(bundle.split_copies(), 2);
        assert_eq!(bundle.remaining_copies, 2);
        assert_eq!(bundle.split_copies(), 1);
        assert_eq!(bundle.remaining_copies, 1);
        // Wait phase: nothing left to hand off
        assert_eq!(bundle.split_copies(), 0);
        assert_eq!(bundle.remaining_copies, 1);
    }

    #[test]
    fn test_split_copies_odd() {
        let mut bundle = make_bundle(3600).with_copies(5);
        // Holder keeps the ceiling half
        assert_eq!(bundle.split_copies(), 2);
        assert_eq!(bundle.remaining_copies, 3);
    }

    #[test]
    fn test_bundle_equality_by_id() {
        let a = make_bundle(3600);
        let mut b = a.clone();
        b.hop_count = 7;
        assert_eq!(a, b);
    }
}
