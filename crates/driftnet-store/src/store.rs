//! Bounded store-and-forward buffer for one node
//!
//! Holds the bundles a node is carrying. Capacity is fixed at
//! construction; when the store is full an arriving bundle may displace
//! the lowest-priority resident, but never a resident of equal or higher
//! priority. Expired bundles are swept out before each routing evaluation
//! so the engine never looks at a dead bundle.

use std::cmp::Reverse;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use driftnet_core::{Bundle, BundleId, BundleState, NodeIdentity, Priority};

use crate::error::StoreError;

/// Bounded multiset of bundles for one node
///
/// Invariant: `len() <= capacity()` after every mutating operation.
#[derive(Debug, Clone)]
pub struct BundleStore<I: NodeIdentity> {
    capacity: usize,
    bundles: HashMap<BundleId, Bundle<I>>,
}

impl<I: NodeIdentity> BundleStore<I> {
    /// Create a store with the given capacity
    ///
    /// Zero capacity is a configuration error and rejected outright.
    pub fn new(capacity: usize) -> Result<Self, StoreError> {
        if capacity == 0 {
            return Err(StoreError::InvalidCapacity(capacity));
        }
        Ok(Self {
            capacity,
            bundles: HashMap::new(),
        })
    }

    /// Number of resident bundles
    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    /// Whether the store holds no bundles
    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }

    /// Configured capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether the store is at capacity
    pub fn is_full(&self) -> bool {
        self.bundles.len() >= self.capacity
    }

    /// Whether a bundle id is resident
    pub fn contains(&self, id: &BundleId) -> bool {
        self.bundles.contains_key(id)
    }

    /// Get a resident bundle
    pub fn get(&self, id: &BundleId) -> Option<&Bundle<I>> {
        self.bundles.get(id)
    }

    /// Get a resident bundle mutably
    pub fn get_mut(&mut self, id: &BundleId) -> Option<&mut Bundle<I>> {
        self.bundles.get_mut(id)
    }

    /// Insert a bundle, evicting a lower-priority resident if necessary
    ///
    /// When full, the arrival displaces the lowest-priority (then oldest)
    /// resident only if it strictly outranks it; otherwise the insert is
    /// rejected with [`StoreError::BufferFull`]. Returns the displaced
    /// victim, if any, so the caller can report the drop.
    pub fn insert(&mut self, mut bundle: Bundle<I>) -> Result<Option<Bundle<I>>, StoreError> {
        if self.bundles.contains_key(&bundle.id) {
            return Err(StoreError::Duplicate(bundle.id.to_string()));
        }

        let mut victim = None;
        if self.is_full() {
            match self.eviction_victim() {
                Some(victim_id) if self.bundles[&victim_id].priority < bundle.priority => {
                    if let Some(mut displaced) = self.bundles.remove(&victim_id) {
                        displaced.state = BundleState::Expired;
                        debug!(
                            victim = %displaced.id,
                            arrival = %bundle.id,
                            "Evicted lower-priority bundle"
                        );
                        victim = Some(displaced);
                    }
                }
                _ => {
                    return Err(StoreError::BufferFull {
                        capacity: self.capacity,
                    });
                }
            }
        }

        bundle.state = BundleState::InTransit;
        self.bundles.insert(bundle.id, bundle);
        Ok(victim)
    }

    /// Remove every bundle whose TTL has elapsed
    ///
    /// Must run before each routing evaluation cycle. Returns the removed
    /// bundles, each transitioned to `Expired`.
    pub fn sweep_expired(&mut self, now: DateTime<Utc>) -> Vec<Bundle<I>> {
        let expired_ids: Vec<BundleId> = self
            .bundles
            .values()
            .filter(|b| !b.is_live(now))
            .map(|b| b.id)
            .collect();

        let mut removed = Vec::with_capacity(expired_ids.len());
        for id in expired_ids {
            if let Some(mut bundle) = self.bundles.remove(&id) {
                bundle.state = BundleState::Expired;
                removed.push(bundle);
            }
        }
        if !removed.is_empty() {
            debug!(count = removed.len(), remaining = self.bundles.len(), "Swept expired bundles");
        }
        removed
    }

    /// Transition a bundle to `Delivered` and remove it
    ///
    /// A given id can only ever be marked delivered once at this node,
    /// because the copy leaves the store here.
    pub fn mark_delivered(&mut self, id: &BundleId) -> Result<Bundle<I>, StoreError> {
        let mut bundle = self
            .bundles
            .remove(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        bundle.state = BundleState::Delivered;
        Ok(bundle)
    }

    /// Ids of live in-transit bundles, in evaluation order
    ///
    /// Sorted by priority (highest first), then creation time (oldest
    /// first), then id, so evaluation order is deterministic.
    pub fn live_ids(&self, now: DateTime<Utc>) -> Vec<BundleId> {
        let mut live: Vec<(Reverse<Priority>, DateTime<Utc>, BundleId)> = self
            .bundles
            .values()
            .filter(|b| b.state == BundleState::InTransit && b.is_live(now))
            .map(|b| (Reverse(b.priority), b.creation_time, b.id))
            .collect();
        live.sort();
        live.into_iter().map(|(_, _, id)| id).collect()
    }

    /// Iterate over all resident bundles, order unspecified
    pub fn iter(&self) -> impl Iterator<Item = &Bundle<I>> {
        self.bundles.values()
    }

    /// Pick the eviction victim: lowest priority, then oldest, then by id
    fn eviction_victim(&self) -> Option<BundleId> {
        self.bundles
            .values()
            .min_by_key(|b| (b.priority, b.creation_time, b.id))
            .map(|b| b.id)
    }
}
