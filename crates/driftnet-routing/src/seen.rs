//! Duplicate-suppression cache
//!
//! Every bundle id a node has ever stored, delivered, or relayed is
//! remembered here so re-offered copies can be refused without touching
//! the store. Entries expire after a configurable retention window, but
//! never before the hold horizon recorded when the id was first seen:
//! a live bundle's id must outlast the bundle itself, or a late duplicate
//! would be accepted (and delivered) a second time.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use driftnet_core::BundleId;

/// When a bundle id was first observed and how often since
#[derive(Debug, Clone, Copy)]
pub struct SeenRecord {
    pub first_seen: DateTime<Utc>,
    /// Cleanup must not remove this entry before this instant
    pub hold_until: DateTime<Utc>,
    pub count: u32,
}

/// Concurrent cache of observed bundle ids
#[derive(Debug, Default)]
pub struct SeenCache {
    entries: DashMap<BundleId, SeenRecord>,
}

impl SeenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an observation of a bundle id
    ///
    /// `hold_until` pins the entry against cleanup, typically to the
    /// bundle's TTL deadline. Returns `true` if this id was already known.
    pub fn mark_seen(&self, id: BundleId, now: DateTime<Utc>, hold_until: DateTime<Utc>) -> bool {
        let mut known = true;
        self.entries
            .entry(id)
            .and_modify(|record| {
                record.count += 1;
                record.hold_until = record.hold_until.max(hold_until);
            })
            .or_insert_with(|| {
                known = false;
                SeenRecord {
                    first_seen: now,
                    hold_until,
                    count: 1,
                }
            });
        known
    }

    /// Whether this id has been observed before
    pub fn have_seen(&self, id: &BundleId) -> bool {
        self.entries.contains_key(id)
    }

    /// How many times this id has been observed
    pub fn seen_count(&self, id: &BundleId) -> u32 {
        self.entries.get(id).map(|r| r.count).unwrap_or(0)
    }

    /// Drop entries past both the retention window and their hold horizon
    ///
    /// Returns the number of entries removed.
    pub fn cleanup(&self, retention: Duration, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, record| now - record.first_seen < retention || now < record.hold_until);
        let removed = before - self.entries.len();
        if removed > 0 {
            tracing::debug!(
                removed,
                remaining = self.entries.len(),
                "Cleaned up seen bundle records"
            );
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
