//! Simulation Facade
//!
//! `Simulation` owns the ECS world and the tick schedule. All engine
//! phases run inside one `Schedule` in a fixed chained order, so tick
//! N+1 can never begin before tick N's commit completes. The decide
//! phase reads shared state immutably; every mutation happens in the
//! commit systems on the schedule's single logical timeline.

use bevy_ecs::prelude::*;
use tracing::{debug, info, warn};

use cog_events::{Stimulus, TickResult, WorldSnapshot};

use crate::components::culture::CultureState;
use crate::components::world::{GlobalResources, WorldClock};
use crate::config::Config;
use crate::error::CoreError;
use crate::events::TickEvents;
use crate::memory::MemoryStore;
use crate::rng::{stream_rng, RngStream};
use crate::setup;
use crate::snapshot::{self, SnapshotHandle, SnapshotStore};
use crate::systems::{
    apply_migrations, apply_stimuli, clear_market, commit_memory, decay_relationships,
    decide_actions, drift_language, evolve_culture, process_trust_updates, rebuild_region_index,
    resolve_negotiations, update_visible_neighbors, ActionQueue, CultureChanges, EconomyTally,
    MarketBook, StimulusQueue, TrustUpdateQueue,
};
use crate::systems::perception::RegionIndex;
use crate::view::{build_state_view, StateView, ViewFilters};

/// The simulation engine: world state, schedule, and the external
/// contract surface.
pub struct Simulation {
    world: World,
    schedule: Schedule,
}

impl Simulation {
    /// Builds a world at tick 0 from a validated configuration.
    pub fn initialize(config: Config) -> Result<Self, CoreError> {
        config
            .validate()
            .map_err(|error| CoreError::InvalidConfig(error.to_string()))?;
        let seed = config.simulation.seed;
        let agent_count = config.simulation.agent_count;

        let mut world = World::new();
        world.insert_resource(WorldClock::new(seed));
        world.insert_resource(GlobalResources::uniform(
            config.simulation.initial_global_pool,
        ));
        world.insert_resource(MemoryStore::new());
        world.insert_resource(CultureState::new());
        world.insert_resource(RegionIndex::new());
        world.insert_resource(ActionQueue::new());
        world.insert_resource(MarketBook::new());
        world.insert_resource(EconomyTally::new());
        world.insert_resource(TrustUpdateQueue::new());
        world.insert_resource(CultureChanges::new());
        world.insert_resource(TickEvents::new());
        world.insert_resource(StimulusQueue::new());
        world.insert_resource(SnapshotStore::new());

        let mut rng = stream_rng(seed, 0, RngStream::Setup);
        let ids = setup::spawn_agents(&mut world, &config, &mut rng);
        setup::capture_baseline(&mut world);
        world.insert_resource(config);

        // Birth events form the first committed batch, at tick 0.
        {
            let mut tick_events = world.resource_mut::<TickEvents>();
            tick_events.begin_tick(0);
            for id in &ids {
                tick_events.emit(
                    cog_events::EventType::Lifecycle,
                    cog_events::EventSubtype::Born,
                    vec![id.clone()],
                    cog_events::EventPayload::None,
                );
            }
        }
        let batch = world.resource_mut::<TickEvents>().drain();
        world.resource_mut::<MemoryStore>().write_events(batch);

        info!(agents = agent_count, seed, "world initialized at tick 0");
        Ok(Self {
            world,
            schedule: build_schedule(),
        })
    }

    /// Runs one tick: stimulus intake, decide, commit phases, memory
    /// commit, clock already advanced to the tick being processed.
    ///
    /// Malformed stimuli are rejected here at the boundary - logged and
    /// counted, never handed to the engine.
    pub fn advance_tick(&mut self, stimuli: &[Stimulus]) -> Result<TickResult, CoreError> {
        let mut rejected = 0u32;
        let mut accepted = Vec::with_capacity(stimuli.len());
        for stimulus in stimuli {
            match stimulus.validate() {
                Ok(()) => accepted.push(stimulus.clone()),
                Err(error) => {
                    warn!("rejected stimulus ({:?}): {}", stimulus.category, error);
                    rejected += 1;
                }
            }
        }

        let tick = {
            let mut clock = self.world.resource_mut::<WorldClock>();
            clock.advance();
            clock.tick
        };
        self.world.resource_mut::<TickEvents>().begin_tick(tick);
        self.world.resource_mut::<EconomyTally>().reset();
        self.world
            .resource_mut::<StimulusQueue>()
            .set_batch(accepted);

        self.schedule.run(&mut self.world);

        let events_emitted = self
            .world
            .resource::<MemoryStore>()
            .episodic
            .events_at(tick)
            .len() as u64;
        let culture_changes = self.world.resource_mut::<CultureChanges>().drain();
        let economy_summary = self.world.resource::<EconomyTally>().to_summary();
        debug!(tick, events = events_emitted, "tick committed");

        let snapshot_interval = self
            .world
            .resource::<Config>()
            .simulation
            .snapshot_interval;
        if snapshot_interval > 0 && tick % snapshot_interval == 0 {
            self.snapshot("periodic")?;
        }

        Ok(TickResult {
            tick,
            events_emitted,
            rejected_stimuli: rejected,
            culture_changes,
            economy_summary,
        })
    }

    /// Captures a full snapshot and stores it in the in-memory store.
    ///
    /// `&mut self` gives the serialization exclusive access to world
    /// state for its whole duration, on every exit path.
    pub fn snapshot(&mut self, label: &str) -> Result<SnapshotHandle, CoreError> {
        let snapshot_id = self.world.resource_mut::<SnapshotStore>().next_id();
        let snapshot = snapshot::build_snapshot(&mut self.world, &snapshot_id, label)?;
        let handle = SnapshotHandle {
            snapshot_id: snapshot.meta.snapshot_id.clone(),
            tick: snapshot.meta.tick,
            content_hash: snapshot.meta.content_hash,
        };
        self.world.resource_mut::<SnapshotStore>().insert(snapshot);
        info!(id = %handle.snapshot_id, tick = handle.tick, label, "snapshot captured");
        Ok(handle)
    }

    /// Restores the world from a stored snapshot. Any integrity failure
    /// surfaces as an error and leaves the running world untouched.
    pub fn restore(&mut self, handle: &SnapshotHandle) -> Result<(), CoreError> {
        let snapshot = self
            .world
            .resource::<SnapshotStore>()
            .get(&handle.snapshot_id)
            .cloned()
            .ok_or_else(|| CoreError::UnknownSnapshot(handle.snapshot_id.clone()))?;
        if snapshot.meta.content_hash != handle.content_hash {
            return Err(CoreError::Integrity(format!(
                "handle hash {:016x} does not match stored snapshot {:016x}",
                handle.content_hash, snapshot.meta.content_hash
            )));
        }
        self.restore_from_snapshot(&snapshot)
    }

    /// Restores from an externally loaded snapshot document.
    pub fn restore_from_snapshot(&mut self, snapshot: &WorldSnapshot) -> Result<(), CoreError> {
        snapshot::restore_world(&mut self.world, snapshot)?;
        info!(tick = snapshot.meta.tick, "world restored from snapshot");
        Ok(())
    }

    /// Read-only filtered projection of current state.
    pub fn get_state_view(&mut self, filters: &ViewFilters) -> StateView {
        build_state_view(&mut self.world, filters)
    }

    /// Canonical digest of full world state, for determinism checks.
    pub fn state_hash(&mut self) -> Result<u64, CoreError> {
        let snapshot = snapshot::build_snapshot(&mut self.world, "hash_probe", "hash_probe")?;
        Ok(snapshot.meta.content_hash)
    }

    /// Builds (without storing) a snapshot for external persistence.
    pub fn export_snapshot(&mut self, label: &str) -> Result<WorldSnapshot, CoreError> {
        let snapshot_id = self.world.resource_mut::<SnapshotStore>().next_id();
        snapshot::build_snapshot(&mut self.world, &snapshot_id, label)
    }

    pub fn current_tick(&self) -> u64 {
        self.world.resource::<WorldClock>().tick
    }

    pub fn event_count(&self) -> usize {
        self.world.resource::<MemoryStore>().episodic.len()
    }

    /// Committed events of one tick, for log export.
    pub fn events_for_tick(&self, tick: u64) -> Vec<cog_events::Event> {
        self.world
            .resource::<MemoryStore>()
            .episodic
            .events_at(tick)
            .to_vec()
    }

    pub fn divergence(&self) -> f32 {
        self.world.resource::<CultureState>().divergence
    }

    /// Current global resource pools.
    pub fn global_resources(&self) -> std::collections::BTreeMap<cog_events::ResourceKind, u64> {
        self.world.resource::<GlobalResources>().as_map()
    }

    pub fn config(&self) -> &Config {
        self.world.resource::<Config>()
    }

    /// Escape hatch for tests and tooling.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }
}

/// Assembles the tick schedule. Order is the determinism contract:
/// perception, stimuli, decide, then commits - economy, social, culture,
/// migration, language, decay - and finally the memory commit.
fn build_schedule() -> Schedule {
    let mut schedule = Schedule::default();

    schedule.add_systems(
        (
            rebuild_region_index,
            update_visible_neighbors,
            apply_stimuli,
            decide_actions,
        )
            .chain(),
    );

    schedule.add_systems(
        (resolve_negotiations, clear_market, process_trust_updates)
            .chain()
            .after(decide_actions),
    );

    schedule.add_systems(
        (
            evolve_culture,
            apply_migrations,
            drift_language,
            decay_relationships,
            commit_memory,
        )
            .chain()
            .after(process_trust_updates),
    );

    schedule
}
