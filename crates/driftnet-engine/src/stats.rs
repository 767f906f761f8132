//! Per-node delivery statistics

use serde::{Deserialize, Serialize};

/// Counters accumulated by one node's engine over its lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
    /// Bundles originated locally
    pub created: u64,
    /// Copies handed to the transport
    pub forwards: u64,
    /// Forwards refused to protect the battery reserve
    pub refused_forwards: u64,
    /// Bundles delivered here as destination
    pub delivered: u64,
    /// Arrivals suppressed as duplicates
    pub duplicates_suppressed: u64,
    /// Bundles removed by TTL sweeps
    pub expired: u64,
    /// Residents evicted for a higher-priority arrival
    pub evicted: u64,
    /// Arrivals rejected by a full store
    pub rejected_inserts: u64,
}
