//! # Driftnet Engine
//!
//! The per-node orchestrator for driftnet's store-and-forward routing.
//!
//! A [`RoutingEngine`] owns one node's bundle store, context, policy,
//! and scoring model, and reacts synchronously to events delivered by an
//! external driver: periodic ticks, contact events, arriving bundles, and
//! delivery outcomes. It holds no timers or threads of its own; the driver
//! supplies every timestamp. Outbound effects (sends, delivery and drop
//! notifications) flow through the [`Transport`](driftnet_core::Transport)
//! collaborator, so no routing outcome is silently swallowed.
//!
//! ## Modules
//!
//! - [`engine`]: the [`RoutingEngine`] event handlers
//! - [`config`]: [`EngineConfig`] and its construction-time validation
//! - [`stats`]: per-node delivery counters
//! - [`error`]: configuration and runtime error types

pub mod config;
pub mod engine;
pub mod error;
pub mod stats;

pub use config::{EngineConfig, ForwardBudget};
pub use engine::RoutingEngine;
pub use error::{ConfigError, EngineError};
pub use stats::EngineStats;
