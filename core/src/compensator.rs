//! Compensation orchestration
//!
//! [`Compensator`] is the host-facing entry point tying the engine
//! together: the per-tick capture path, entity lifecycle notifications,
//! per-client settings, and the rewind/evaluate/restore sequence for one
//! interaction. It is generic over the [`Host`] interface the same way the
//! host runtime drives everything else: the engine never reads clocks or
//! network state itself.
//!
//! # Interaction flow
//!
//! 1. Compute the target past time from the client's reported latency,
//!    clamped to the configured maximum lookback.
//! 2. Rewind every eligible candidate entity to that time, collecting a
//!    session per rewound entity.
//! 3. Run the host's evaluator against the rewound world.
//! 4. Restore every session, on every exit path.
//!
//! Any compensation-layer failure along the way degrades to evaluating
//! against live state; the interaction itself always proceeds.

use hashbrown::HashMap;
use hindsight_shared::{ClientId, EntityId, EntityObservation};
use smallvec::SmallVec;

use crate::capture::capture_tick;
use crate::config::{CompensationConfig, ConfigError};
use crate::flags::{EntityFlag, FlagRegistry};
use crate::history::Pose;
use crate::registry::EntityRegistry;
use crate::session::{RewindScope, WorldView};

/// Host-provided services the engine consumes.
pub trait Host {
    /// Round-trip latency for a client, in seconds.
    ///
    /// The engine tolerates any value here: negative or non-finite
    /// latencies rewind nothing, and large ones are clamped to the
    /// configured maximum lookback.
    fn latency_seconds(&self, client: ClientId) -> f64;
}

/// Per-client settings pushed in by the host (persisted preferences).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientSettings {
    /// Client opted in to lag compensation for their interactions
    pub compensation_enabled: bool,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            compensation_enabled: true,
        }
    }
}

/// Running counters for observability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompensationStats {
    /// Snapshots appended by the capture driver
    pub snapshots_captured: u64,
    /// Rewind sessions opened
    pub rewinds: u64,
    /// Rewinds whose target fell outside the recorded range
    pub clamped_rewinds: u64,
    /// Rewinds skipped because a session was already active
    pub session_conflicts: u64,
    /// Restores abandoned because the slot was reset mid-session
    pub stale_restores: u64,
}

/// Which entities an interaction should consider.
#[derive(Debug, Clone)]
pub enum Candidates {
    /// Every tracked entity
    All,
    /// Only the listed entities (e.g. those near the interaction ray)
    Only(Vec<EntityId>),
}

/// One interaction request from the host.
#[derive(Debug, Clone)]
pub struct InteractionRequest {
    /// Client whose latency drives the rewind target
    pub client: ClientId,
    /// Entities relevant to this interaction
    pub candidates: Candidates,
}

impl InteractionRequest {
    /// Consider every tracked entity.
    pub fn all(client: ClientId) -> Self {
        Self {
            client,
            candidates: Candidates::All,
        }
    }

    /// Consider only the listed entities.
    pub fn targeting(client: ClientId, entities: Vec<EntityId>) -> Self {
        Self {
            client,
            candidates: Candidates::Only(entities),
        }
    }
}

/// The lag compensation engine.
///
/// Owns all entity state and drives the full
/// capture -> rewind -> evaluate -> restore cycle. Single-threaded by design;
/// the host's callback architecture guarantees sequential invocation.
pub struct Compensator<H: Host> {
    host: H,
    config: CompensationConfig,
    registry: EntityRegistry,
    flags: FlagRegistry,
    clients: HashMap<ClientId, ClientSettings>,
    stats: CompensationStats,
    sim_time: f64,
}

impl<H: Host> Compensator<H> {
    /// Create an engine with the given host interface and configuration.
    ///
    /// All storage is allocated here; an invalid configuration prevents
    /// activation entirely.
    pub fn new(host: H, config: CompensationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let registry = EntityRegistry::new(config.max_entities, config.history_capacity);
        let flags = FlagRegistry::new(config.max_entities);
        log::info!(
            "lag compensation active: {} slots, {} records each, {:.0} ms max lookback",
            config.max_entities,
            config.history_capacity,
            config.max_lookback * 1000.0
        );
        Ok(Self {
            host,
            config,
            registry,
            flags,
            clients: HashMap::new(),
            stats: CompensationStats::default(),
            sim_time: 0.0,
        })
    }

    /// Capture one simulation tick.
    ///
    /// Must be called before any interaction evaluated for the same tick,
    /// so the newest sample reflects the tick just completed.
    pub fn begin_tick(&mut self, sim_time: f64, observations: &[EntityObservation]) {
        self.sim_time = sim_time;
        capture_tick(
            &mut self.registry,
            &mut self.flags,
            &self.config,
            &mut self.stats,
            sim_time,
            observations,
        );
    }

    /// Entity removal notification: reset the slot before any reuse.
    pub fn entity_destroyed(&mut self, entity: EntityId) {
        if !self.registry.in_range(entity) {
            return;
        }
        if self.registry.is_occupied(entity) {
            log::debug!("untracking {entity}");
        }
        self.registry.release(entity);
        self.flags.clear_slot(entity);
    }

    /// Round-restart notification: reset every slot and all counters.
    /// Client settings persist across rounds.
    pub fn reset_all(&mut self) {
        self.registry.reset_all();
        self.flags.clear_all();
        self.stats = CompensationStats::default();
    }

    /// Store a client's persisted settings.
    pub fn set_client_settings(&mut self, client: ClientId, settings: ClientSettings) {
        self.clients.insert(client, settings);
    }

    /// A client's settings (defaults if the host never pushed any).
    pub fn client_settings(&self, client: ClientId) -> ClientSettings {
        self.clients.get(&client).copied().unwrap_or_default()
    }

    /// Forget a disconnected client's settings.
    pub fn remove_client(&mut self, client: ClientId) {
        self.clients.remove(&client);
    }

    /// Exclude or re-admit an entity for capture and rewind.
    pub fn set_blacklisted(&mut self, entity: EntityId, blacklisted: bool) {
        if !self.registry.in_range(entity) {
            log::warn!("blacklist request for {entity} outside slot range");
            return;
        }
        if blacklisted {
            self.flags.set(entity, EntityFlag::Blacklisted);
        } else {
            self.flags.clear(entity, EntityFlag::Blacklisted);
        }
    }

    /// Mark an entity as blocking trigger volumes while compensated.
    pub fn set_blocks_triggers(&mut self, entity: EntityId, blocks: bool) {
        if !self.registry.in_range(entity) {
            log::warn!("trigger-block request for {entity} outside slot range");
            return;
        }
        if blocks {
            self.flags.set(entity, EntityFlag::BlocksTriggers);
        } else {
            self.flags.clear(entity, EntityFlag::BlocksTriggers);
        }
    }

    /// Whether an entity is marked as blocking triggers.
    pub fn blocks_triggers(&self, entity: EntityId) -> bool {
        self.registry.in_range(entity) && self.flags.check(entity, EntityFlag::BlocksTriggers)
    }

    /// Whether an entity is currently tracked.
    pub fn is_tracked(&self, entity: EntityId) -> bool {
        self.registry.in_range(entity) && self.registry.is_occupied(entity)
    }

    /// Live (authoritative) pose of a tracked entity.
    pub fn live_pose(&self, entity: EntityId) -> Option<Pose> {
        if !self.registry.in_range(entity) {
            return None;
        }
        self.registry.live_pose(entity)
    }

    /// Number of history records for a tracked entity.
    pub fn snapshot_count(&self, entity: EntityId) -> usize {
        if !self.registry.in_range(entity) {
            return 0;
        }
        self.registry.history(entity).map_or(0, |h| h.len())
    }

    /// Running counters.
    pub fn stats(&self) -> &CompensationStats {
        &self.stats
    }

    /// The configuration the engine was built with.
    pub fn config(&self) -> &CompensationConfig {
        &self.config
    }

    /// Simulation time of the latest captured tick.
    pub fn sim_time(&self) -> f64 {
        self.sim_time
    }

    /// The host interface.
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Run one interaction: rewind, evaluate, restore.
    ///
    /// The evaluator sees candidate entities as the requesting client saw
    /// them `latency` seconds ago; every other caller only ever observes
    /// live state. The evaluator's outcome is returned verbatim.
    pub fn evaluate_interaction<R>(
        &mut self,
        request: &InteractionRequest,
        evaluator: impl FnOnce(WorldView<'_>, &InteractionRequest) -> R,
    ) -> R {
        let target = self.rewind_target(request.client);
        let enabled = self.client_settings(request.client).compensation_enabled;

        let mut targets: SmallVec<[EntityId; 16]> = SmallVec::new();
        if enabled {
            match &request.candidates {
                Candidates::All => targets.extend(self.registry.occupied_ids()),
                Candidates::Only(entities) => targets.extend(entities.iter().copied()),
            }
        } else {
            log::debug!("{} opted out; evaluating live state", request.client);
        }

        let mut scope = RewindScope::new(
            &mut self.registry,
            &mut self.flags,
            &mut self.stats,
            self.config.time_epsilon,
        );
        for entity in targets {
            scope.rewind(entity, target);
        }

        let outcome = evaluator(scope.view(), request);

        // The drop guard covers unwind paths; this is the normal path.
        scope.restore_all();
        outcome
    }

    /// Target past time for a client, bounded by the lookback clamp.
    fn rewind_target(&self, client: ClientId) -> f64 {
        let latency = self.host.latency_seconds(client);
        let latency = if latency.is_finite() {
            latency.clamp(0.0, self.config.max_lookback)
        } else {
            log::warn!("non-finite latency for {client}; compensating nothing");
            0.0
        };
        self.sim_time - latency
    }
}
