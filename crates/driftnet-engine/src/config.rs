//! Engine configuration
//!
//! Everything tunable about a node's routing behavior is supplied here at
//! construction time and validated once; the engine itself never re-reads
//! external configuration.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use driftnet_core::PredictabilityParams;
use driftnet_routing::{ScoringConfig, UrgencyWeights};

use crate::error::ConfigError;

/// How many forwards a route evaluation may emit
///
/// The per-bundle variant caps duplication per bundle per evaluation; the
/// per-tick variant caps total forwards per evaluation to emulate channel
/// contention. Candidates are walked in sorted order either way, so the
/// chosen targets are deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForwardBudget {
    /// At most this many forwards per bundle per evaluation
    PerBundle(u8),
    /// At most this many forwards in total per evaluation
    PerTick(u8),
}

impl Default for ForwardBudget {
    fn default() -> Self {
        ForwardBudget::PerBundle(1)
    }
}

impl ForwardBudget {
    fn limit(&self) -> u8 {
        match self {
            ForwardBudget::PerBundle(n) | ForwardBudget::PerTick(n) => *n,
        }
    }
}

/// Per-node engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Bundle store capacity; `None` uses the node type's default
    pub buffer_capacity: Option<usize>,
    /// TTL applied to bundles created without an explicit one
    pub default_ttl: Duration,
    /// Expected tick cadence; `None` uses the node type's default.
    /// Predictability aging counts elapsed intervals of this length.
    pub tick_interval: Option<Duration>,
    /// Scoring model initialization and learning rate
    pub scoring: ScoringConfig,
    /// Delivery-predictability reinforcement and aging parameters
    pub predictability: PredictabilityParams,
    /// Battery cost of a forward, per payload byte
    pub energy_cost_coefficient: f64,
    /// Forwards are refused rather than drive battery below this
    pub battery_reserve_floor: f64,
    /// Battery drained on each periodic tick
    pub battery_drain_per_tick: f64,
    /// Per-priority urgency base weights
    pub urgency: UrgencyWeights,
    /// Forward budget per route evaluation
    pub forward_budget: ForwardBudget,
    /// Retention window for the duplicate-suppression cache
    pub seen_ttl: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: None,
            default_ttl: Duration::hours(1),
            tick_interval: None,
            scoring: ScoringConfig::default(),
            predictability: PredictabilityParams::default(),
            energy_cost_coefficient: 1e-4,
            battery_reserve_floor: 0.10,
            battery_drain_per_tick: 1e-3,
            urgency: UrgencyWeights::default(),
            forward_budget: ForwardBudget::default(),
            seen_ttl: Duration::hours(1),
        }
    }
}

impl EngineConfig {
    /// Validate configuration invariants
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer_capacity == Some(0) {
            return Err(ConfigError::ZeroBufferCapacity);
        }
        if self.default_ttl <= Duration::zero() {
            return Err(ConfigError::NonPositiveTtl);
        }
        if let Some(interval) = self.tick_interval
            && interval <= Duration::zero()
        {
            return Err(ConfigError::NonPositiveTickInterval);
        }
        if self.scoring.learning_rate <= 0.0 {
            return Err(ConfigError::NonPositiveLearningRate(
                self.scoring.learning_rate,
            ));
        }
        if !(0.0..1.0).contains(&self.battery_reserve_floor) {
            return Err(ConfigError::InvalidReserveFloor(self.battery_reserve_floor));
        }
        if self.energy_cost_coefficient < 0.0 {
            return Err(ConfigError::NegativeEnergyCost(self.energy_cost_coefficient));
        }
        if self.battery_drain_per_tick < 0.0 {
            return Err(ConfigError::NegativeBatteryDrain(self.battery_drain_per_tick));
        }
        if self.forward_budget.limit() == 0 {
            return Err(ConfigError::ZeroForwardBudget);
        }
        Ok(())
    }
}
