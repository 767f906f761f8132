//! Per-node routing engine
//!
//! One [`RoutingEngine`] instance exists per node and owns all of that
//! node's routing state: context, store, policy, scoring model, neighbor
//! snapshots, and statistics. It is single-threaded by construction: all
//! work happens synchronously inside the event handlers (`on_periodic_tick`,
//! `on_contact_event`, `receive_bundle`, `on_delivery_outcome`) invoked by
//! the external driver, which also supplies every timestamp. Cross-node
//! interaction goes exclusively through the [`Transport`] collaborator.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, instrument, warn};

use driftnet_core::{
    Bundle, BundleId, BundleState, DropReason, ForwardRefusal, NodeContext, NodeIdentity, NodeType,
    Priority, Transport,
};
use driftnet_routing::{ContactFeatures, RoutingPolicy, ScoringModel, SeenCache, urgency_score};
use driftnet_store::{BundleStore, StoreError};

use crate::config::{EngineConfig, ForwardBudget};
use crate::error::{ConfigError, EngineError};
use crate::stats::EngineStats;

/// Store-and-forward routing engine for one node
pub struct RoutingEngine<I: NodeIdentity, T: Transport<I>> {
    context: NodeContext<I>,
    store: BundleStore<I>,
    policy: RoutingPolicy,
    model: ScoringModel,
    config: EngineConfig,
    tick_interval: Duration,
    transport: T,
    /// Latest context snapshot per reachable neighbor
    neighbors: HashMap<I, NodeContext<I>>,
    /// Feature vector from the last evaluation of each bundle, kept for
    /// outcome feedback into the scoring model
    last_features: HashMap<BundleId, ContactFeatures>,
    seen: SeenCache,
    stats: EngineStats,
    next_sequence: u32,
    last_tick: Option<DateTime<Utc>>,
    stopped: bool,
}

impl<I: NodeIdentity, T: Transport<I>> RoutingEngine<I, T> {
    /// Construct an engine for a node
    ///
    /// Rejects malformed configuration; this is the only fatal error class.
    pub fn new(
        node_id: I,
        node_type: NodeType,
        policy: RoutingPolicy,
        config: EngineConfig,
        transport: T,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        if let RoutingPolicy::SprayAndWait { spray_factor } = policy
            && spray_factor == 0
        {
            return Err(ConfigError::ZeroSprayFactor);
        }

        let capacity = config
            .buffer_capacity
            .unwrap_or_else(|| node_type.default_buffer_capacity());
        let store = BundleStore::new(capacity).map_err(|_| ConfigError::ZeroBufferCapacity)?;
        let tick_interval = config
            .tick_interval
            .unwrap_or_else(|| node_type.default_tick_interval());
        let model = ScoringModel::new(&config.scoring);

        info!(
            node = %node_id,
            ?node_type,
            ?policy,
            capacity,
            "Routing engine started"
        );

        Ok(Self {
            context: NodeContext::new(node_id, node_type, capacity),
            store,
            policy,
            model,
            config,
            tick_interval,
            transport,
            neighbors: HashMap::new(),
            last_features: HashMap::new(),
            seen: SeenCache::new(),
            stats: EngineStats::default(),
            next_sequence: 0,
            last_tick: None,
            stopped: false,
        })
    }

    /// Originate a bundle at this node
    ///
    /// Spray policies seed the copy budget from their spray factor. The
    /// bundle enters the local store immediately; an eviction or rejection
    /// is reported through the transport like any other drop.
    #[instrument(skip(self, payload), fields(node = %self.context.node_id, dest = %destination))]
    pub fn create_bundle(
        &mut self,
        destination: I,
        priority: Priority,
        payload: Vec<u8>,
        ttl: Option<Duration>,
        now: DateTime<Utc>,
    ) -> Result<BundleId, EngineError> {
        if self.stopped {
            return Err(EngineError::Stopped);
        }

        let sequence = self.next_sequence;
        self.next_sequence += 1;
        let id = BundleId::new(self.context.node_id.stable_hash(), sequence, now);
        let bundle = Bundle::new(
            id,
            self.context.node_id.clone(),
            destination,
            payload,
            ttl.unwrap_or(self.config.default_ttl),
            now,
        )
        .with_priority(priority)
        .with_copies(self.policy.initial_copies());

        self.seen
            .mark_seen(id, now, bundle.creation_time + bundle.ttl);
        self.context.messages_sent += 1;
        self.stats.created += 1;

        let result = self.store.insert(bundle);
        self.context.buffer_occupancy = self.store.len();
        match result {
            Ok(None) => {}
            Ok(Some(victim)) => {
                self.stats.evicted += 1;
                self.transport
                    .notify_dropped(victim.id, DropReason::BufferFull);
            }
            Err(err) => {
                self.stats.rejected_inserts += 1;
                self.transport.notify_dropped(id, DropReason::BufferFull);
                return Err(EngineError::Store(err));
            }
        }

        debug!(%id, %priority, "Bundle created");
        Ok(id)
    }

    /// Periodic maintenance tick
    ///
    /// Refreshes the context, ages predictability estimates by the number
    /// of elapsed tick intervals, sweeps expired bundles, then runs a route
    /// evaluation against the known neighbors.
    #[instrument(skip(self), fields(node = %self.context.node_id))]
    pub fn on_periodic_tick(&mut self, now: DateTime<Utc>) {
        if self.stopped {
            return;
        }

        self.context.refresh(self.config.battery_drain_per_tick);

        let intervals = match self.last_tick {
            Some(last) => {
                let elapsed = (now - last).num_milliseconds();
                let interval = self.tick_interval.num_milliseconds().max(1);
                (elapsed / interval).clamp(0, u32::MAX as i64) as u32
            }
            None => 1,
        };
        self.context
            .age_predictability(&self.config.predictability, intervals);
        self.last_tick = Some(now);

        let cleaned = self.seen.cleanup(self.config.seen_ttl, now);
        if cleaned > 0 {
            debug!(cleaned, "Seen cache cleaned up");
        }

        self.sweep_expired(now);
        self.evaluate_routes(now);
    }

    /// A neighbor became reachable
    ///
    /// Records the encounter, stores the neighbor's context snapshot, and
    /// runs an immediate route evaluation rather than waiting for the next
    /// tick; contact windows are too short to waste.
    #[instrument(
        skip(self, snapshot),
        fields(node = %self.context.node_id, neighbor = %neighbor_id)
    )]
    pub fn on_contact_event(
        &mut self,
        neighbor_id: I,
        snapshot: NodeContext<I>,
        now: DateTime<Utc>,
    ) {
        if self.stopped {
            return;
        }

        self.context
            .record_encounter(&neighbor_id, &self.config.predictability, now);
        self.neighbors.insert(neighbor_id, snapshot);

        self.sweep_expired(now);
        self.evaluate_routes(now);
    }

    /// A neighbor is no longer reachable
    pub fn on_contact_lost(&mut self, neighbor_id: &I) {
        self.neighbors.remove(neighbor_id);
    }

    /// Accept a bundle copy arriving from the transport
    ///
    /// Dead arrivals are dropped, duplicates are suppressed via the seen
    /// cache (whose entries are held at least until the bundle's TTL
    /// deadline, guaranteeing at-most-one delivery per bundle id at this
    /// node), and the rest are either delivered (this node is the
    /// destination) or stored.
    #[instrument(skip(self, bundle), fields(node = %self.context.node_id, id = %bundle.id))]
    pub fn receive_bundle(&mut self, mut bundle: Bundle<I>, now: DateTime<Utc>) {
        if self.stopped {
            return;
        }

        // A late transport delivery can outlive the bundle
        if !bundle.is_live(now) {
            self.stats.expired += 1;
            debug!("Expired bundle arrived, dropped");
            self.transport
                .notify_dropped(bundle.id, DropReason::Expired);
            return;
        }

        let ttl_deadline = bundle.creation_time + bundle.ttl;
        if self.seen.mark_seen(bundle.id, now, ttl_deadline) {
            self.stats.duplicates_suppressed += 1;
            debug!("Duplicate bundle suppressed");
            return;
        }
        self.context.messages_received += 1;

        if bundle.destination == self.context.node_id {
            bundle.state = BundleState::Delivered;
            let delay_secs = (now - bundle.creation_time).num_milliseconds() as f64 / 1000.0;
            self.context.successful_deliveries += 1;
            self.context.record_delay(delay_secs);
            self.stats.delivered += 1;
            info!(delay_secs, hops = bundle.hop_count, "Bundle delivered");
            self.transport.notify_delivered(&bundle);
            return;
        }

        let id = bundle.id;
        let result = self.store.insert(bundle);
        self.context.buffer_occupancy = self.store.len();
        match result {
            Ok(None) => debug!("Bundle stored"),
            Ok(Some(victim)) => {
                self.stats.evicted += 1;
                debug!(victim = %victim.id, "Resident evicted for higher-priority arrival");
                self.transport
                    .notify_dropped(victim.id, DropReason::BufferFull);
            }
            Err(StoreError::BufferFull { .. }) => {
                self.stats.rejected_inserts += 1;
                warn!("Bundle rejected, store full");
                self.transport.notify_dropped(id, DropReason::BufferFull);
            }
            Err(StoreError::Duplicate(_)) => {
                self.stats.duplicates_suppressed += 1;
            }
            Err(err) => warn!(%err, "Unexpected store error on receive"),
        }
    }

    /// Feed an observed delivery outcome back into the scoring model
    ///
    /// Uses the feature vector recorded at this bundle's last evaluation.
    /// A successful outcome also retires any local copy still resident.
    #[instrument(skip(self), fields(node = %self.context.node_id, id = %id))]
    pub fn on_delivery_outcome(&mut self, id: BundleId, success: bool, delay_secs: f64) {
        if self.stopped {
            return;
        }

        if let Some(features) = self.last_features.remove(&id) {
            let observed = if success { 1.0 } else { 0.0 };
            self.model.update(&features, observed);
            debug!(success, "Scoring model updated from outcome");
        }

        if success {
            self.context.successful_deliveries += 1;
            self.context.record_delay(delay_secs);
            if self.store.contains(&id) && self.store.mark_delivered(&id).is_ok() {
                self.context.buffer_occupancy = self.store.len();
                debug!("Local copy retired after downstream delivery");
            }
        }
    }

    /// Stop the engine; all subsequent events are ignored
    ///
    /// Safe to call between a contact event and its tick: forward side
    /// effects apply as a single unit, so no bundle is left half-updated.
    pub fn stop(&mut self) {
        self.stopped = true;
        self.neighbors.clear();
        self.last_features.clear();
        info!(node = %self.context.node_id, "Routing engine stopped");
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    pub fn context(&self) -> &NodeContext<I> {
        &self.context
    }

    pub fn store(&self) -> &BundleStore<I> {
        &self.store
    }

    pub fn policy(&self) -> RoutingPolicy {
        self.policy
    }

    pub fn model(&self) -> &ScoringModel {
        &self.model
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Remove expired bundles and report each drop
    fn sweep_expired(&mut self, now: DateTime<Utc>) {
        let expired = self.store.sweep_expired(now);
        self.context.buffer_occupancy = self.store.len();
        for bundle in expired {
            self.stats.expired += 1;
            self.last_features.remove(&bundle.id);
            debug!(id = %bundle.id, "Bundle expired");
            self.transport.notify_dropped(bundle.id, DropReason::Expired);
        }
    }

    /// Evaluate every live bundle against every known neighbor
    ///
    /// Bundles are walked in priority order and neighbors in sorted id
    /// order, so with a fixed forward budget the chosen targets are
    /// deterministic.
    fn evaluate_routes(&mut self, now: DateTime<Utc>) {
        if self.neighbors.is_empty() {
            return;
        }

        let mut neighbor_ids: Vec<I> = self.neighbors.keys().cloned().collect();
        neighbor_ids.sort();

        let (per_bundle_limit, per_tick_limit) = match self.config.forward_budget {
            ForwardBudget::PerBundle(n) => (n as u32, u32::MAX),
            ForwardBudget::PerTick(n) => (u32::MAX, n as u32),
        };
        let mut tick_forwards = 0u32;

        for id in self.store.live_ids(now) {
            if tick_forwards >= per_tick_limit {
                break;
            }
            let mut bundle_forwards = 0u32;

            for neighbor_id in &neighbor_ids {
                if bundle_forwards >= per_bundle_limit || tick_forwards >= per_tick_limit {
                    break;
                }
                let Some(neighbor) = self.neighbors.get(neighbor_id) else {
                    continue;
                };
                let Some(bundle) = self.store.get_mut(&id) else {
                    break;
                };

                // Refresh per-evaluation metadata on the resident copy
                bundle.urgency_score = urgency_score(bundle, &self.config.urgency, now);
                let features = ContactFeatures::extract(bundle, neighbor, now);
                bundle.delivery_probability = self.model.predict(&features);
                self.last_features.insert(id, features);

                let decision = self.policy.decide(
                    bundle,
                    &self.context,
                    neighbor,
                    &self.model,
                    &self.config.urgency,
                    now,
                );
                if !decision.is_forward() {
                    continue;
                }

                let energy_cost =
                    self.config.energy_cost_coefficient * bundle.payload.len() as f64;
                if self.context.battery_level - energy_cost < self.config.battery_reserve_floor {
                    self.stats.refused_forwards += 1;
                    warn!(id = %id, "Forward refused, battery at reserve floor");
                    self.transport
                        .notify_forward_refused(id, ForwardRefusal::InsufficientEnergy);
                    continue;
                }

                // Forward side effects, applied as one unit. The recipient
                // joins the route path so later evaluations treat it as a
                // carrier and do not re-send the same copy.
                bundle.apply_forward(&self.context.node_id, energy_cost, now);
                if !bundle.has_visited(neighbor_id) {
                    bundle.route_path.push(neighbor_id.clone());
                }
                let handed = bundle.split_copies();
                let mut copy = bundle.clone();
                if handed > 0 {
                    copy.remaining_copies = handed;
                }
                self.context.battery_level -= energy_cost;
                self.stats.forwards += 1;
                bundle_forwards += 1;
                tick_forwards += 1;

                debug!(
                    id = %id,
                    to = %neighbor_id,
                    hops = copy.hop_count,
                    probability = copy.delivery_probability,
                    "Bundle forwarded"
                );
                self.transport.send(copy, neighbor_id);
            }
        }
    }
}
