//! Engine error types

use thiserror::Error;

use driftnet_store::StoreError;

/// Malformed configuration, rejected at construction time
///
/// The only fatal error class: routing outcomes (full buffers, refused
/// forwards, expiry) are reported through the transport notifications
/// instead.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("buffer capacity must be positive")]
    ZeroBufferCapacity,

    #[error("spray factor must be positive")]
    ZeroSprayFactor,

    #[error("default TTL must be positive")]
    NonPositiveTtl,

    #[error("tick interval must be positive")]
    NonPositiveTickInterval,

    #[error("learning rate must be positive, got {0}")]
    NonPositiveLearningRate(f64),

    #[error("battery reserve floor must be in [0, 1), got {0}")]
    InvalidReserveFloor(f64),

    #[error("energy cost coefficient must be non-negative, got {0}")]
    NegativeEnergyCost(f64),

    #[error("battery drain per tick must be non-negative, got {0}")]
    NegativeBatteryDrain(f64),

    #[error("forward budget must be positive")]
    ZeroForwardBudget,
}

/// Runtime engine errors
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine is stopped")]
    Stopped,

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
