//! Per-node routing state
//!
//! A [`NodeContext`] is owned exclusively by one node and mutated only by
//! that node's routing engine. A serialized snapshot of it crosses the
//! boundary on contact events so neighbors can be scored.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::NodeIdentity;

/// Role of a node in the network
///
/// Determines default buffer capacity and tick cadence. A configuration
/// input, not engine logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum NodeType {
    MobileCommandCenter,
    EmergencyResponder,
    #[default]
    CivilianDevice,
    RescueVehicle,
    AutonomousDrone,
    EmergencyShelter,
    HospitalCenter,
    IotSensor,
}

impl NodeType {
    /// Default bundle store capacity for this role
    pub fn default_buffer_capacity(self) -> usize {
        match self {
            NodeType::MobileCommandCenter => 500,
            NodeType::EmergencyResponder => 200,
            NodeType::CivilianDevice => 100,
            NodeType::RescueVehicle => 300,
            NodeType::AutonomousDrone => 150,
            NodeType::EmergencyShelter => 400,
            NodeType::HospitalCenter => 500,
            NodeType::IotSensor => 50,
        }
    }

    /// Default tick cadence for this role
    pub fn default_tick_interval(self) -> chrono::Duration {
        let secs = match self {
            NodeType::MobileCommandCenter => 5,
            NodeType::EmergencyResponder => 7,
            NodeType::CivilianDevice => 15,
            NodeType::RescueVehicle => 6,
            NodeType::AutonomousDrone => 3,
            NodeType::EmergencyShelter => 8,
            NodeType::HospitalCenter => 4,
            NodeType::IotSensor => 30,
        };
        chrono::Duration::seconds(secs)
    }
}

/// Parameters for the delivery-predictability estimate
///
/// Reinforced on direct contact, aged down otherwise.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PredictabilityParams {
    /// Reinforcement applied on direct contact: `P += (1 - P) * encounter_gain`
    pub encounter_gain: f64,
    /// Multiplicative decay applied per elapsed aging interval
    pub decay: f64,
    /// Entries below this are dropped from the table
    pub floor: f64,
    /// Cap on any single estimate
    pub max: f64,
}

impl Default for PredictabilityParams {
    fn default() -> Self {
        Self {
            encounter_gain: 0.75,
            decay: 0.98,
            floor: 0.01,
            max: 0.99,
        }
    }
}

/// Per-node mutable routing state
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "I: NodeIdentity")]
pub struct NodeContext<I: NodeIdentity> {
    /// This node's identity
    pub node_id: I,
    /// Role, fixed at configuration time
    pub node_type: NodeType,
    /// Battery in [0, 1]; only decreases except for external recharge
    pub battery_level: f64,
    /// Capacity of this node's bundle store
    pub buffer_capacity: usize,
    /// Live bundle count in this node's store
    pub buffer_occupancy: usize,
    /// Social weight in [0, 1], derived from encounter history
    pub social_weight: f64,
    /// Trust in [0, 1]: successful deliveries over messages sent
    pub trust_score: f64,
    /// Cumulative encounter weight per neighbor
    pub encounter_history: HashMap<I, f64>,
    /// Last contact timestamp per neighbor
    pub last_contact: HashMap<I, DateTime<Utc>>,
    /// Delivery-predictability estimate per destination
    pub predictability: HashMap<I, f64>,
    /// Bundles originated at this node
    pub messages_sent: u32,
    /// Bundles received at this node (as relay or destination)
    pub messages_received: u32,
    /// Delivery outcomes observed as successful
    pub successful_deliveries: u32,
    /// Running mean of observed delivery delay, in seconds
    pub average_delay: f64,
}

impl<I: NodeIdentity> NodeContext<I> {
    /// Create a fresh context for a node
    pub fn new(node_id: I, node_type: NodeType, buffer_capacity: usize) -> Self {
        Self {
            node_id,
            node_type,
            battery_level: 1.0,
            buffer_capacity,
            buffer_occupancy: 0,
            social_weight: 0.5,
            trust_score: 0.8,
            encounter_history: HashMap::new(),
            last_contact: HashMap::new(),
            predictability: HashMap::new(),
            messages_sent: 0,
            messages_received: 0,
            successful_deliveries: 0,
            average_delay: 0.0,
        }
    }

    /// Record a contact with a neighbor
    ///
    /// Bumps the encounter weight and last-contact time and reinforces the
    /// delivery-predictability estimate for that neighbor as a destination.
    pub fn record_encounter(
        &mut self,
        neighbor: &I,
        params: &PredictabilityParams,
        now: DateTime<Utc>,
    ) {
        if *neighbor == self.node_id {
            return;
        }
        *self.encounter_history.entry(neighbor.clone()).or_insert(0.0) += 1.0;
        self.last_contact.insert(neighbor.clone(), now);

        let entry = self.predictability.entry(neighbor.clone()).or_insert(0.0);
        *entry = (*entry + (1.0 - *entry) * params.encounter_gain).min(params.max);
    }

    /// Age every predictability estimate by the given number of intervals
    ///
    /// Entries falling below the floor are dropped.
    pub fn age_predictability(&mut self, params: &PredictabilityParams, intervals: u32) {
        if intervals == 0 {
            return;
        }
        let factor = params.decay.powi(intervals as i32);
        self.predictability.retain(|_, p| {
            *p *= factor;
            *p >= params.floor
        });
    }

    /// Delivery predictability for a destination; 0 if unknown
    pub fn predictability_for(&self, destination: &I) -> f64 {
        self.predictability.get(destination).copied().unwrap_or(0.0)
    }

    /// Fraction of the buffer currently occupied, in [0, 1]
    pub fn buffer_fraction(&self) -> f64 {
        if self.buffer_capacity == 0 {
            return 1.0;
        }
        (self.buffer_occupancy as f64 / self.buffer_capacity as f64).clamp(0.0, 1.0)
    }

    /// Periodic context refresh: battery drain, social weight, trust
    pub fn refresh(&mut self, battery_drain: f64) {
        self.battery_level = (self.battery_level - battery_drain).max(0.0);

        let total_encounters: f64 = self.encounter_history.values().sum();
        self.social_weight = (total_encounters / 100.0).min(1.0);

        self.trust_score = (self.successful_deliveries as f64
            / (self.messages_sent.max(1) as f64))
            .min(1.0);
    }

    /// External recharge; the one allowed battery increase
    pub fn recharge(&mut self, level: f64) {
        self.battery_level = level.clamp(0.0, 1.0);
    }

    /// Fold one observed delivery delay into the running mean
    pub fn record_delay(&mut self, delay_secs: f64) {
        let n = self.successful_deliveries as f64;
        if n <= 1.0 {
            self.average_delay = delay_secs;
        } else {
            self.average_delay += (delay_secs - self.average_delay) / n;
        }
    }
}
