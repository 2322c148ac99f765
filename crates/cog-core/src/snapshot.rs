//! Snapshot / Restore
//!
//! Full-state capture and deterministic rewind. A snapshot serializes
//! every agent (sorted by id), the relationship edge table, the culture
//! artifact table, the global pools, and the episodic log, stamped with
//! (seed, tick) and a content hash. Restore verifies the hash, converts
//! the entire document into spawn plans first, and only then touches the
//! world - a corrupt snapshot can never leave a half-restored state
//! behind.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use cog_events::snapshot::{
    AgentSnapshot, CultureSnapshot, IdeologySnapshot, LexiconEntrySnapshot, MythSnapshot,
    NormSnapshot, PersonalitySnapshot, RelationshipSnapshot, SnapshotMeta, WorldSnapshot,
    SNAPSHOT_FORMAT_VERSION,
};
use cog_events::timestamp::format_snapshot_id;

use crate::components::agent::{
    Agent, AgentId, AgentName, Alive, Ideology, Inventory, Lexicon, LexiconEntry, Personality,
    Region, TrustLedger,
};
use crate::components::culture::{ArtifactStatus, CultureState, Myth, Norm, NormTopic};
use crate::components::world::{GlobalResources, WorldClock, REGIONS};
use crate::error::CoreError;
use crate::events::TickEvents;
use crate::memory::{EdgeKind, MemoryStore, RelationshipEdge};
use crate::systems::action::ActionQueue;
use crate::systems::culture::CultureChanges;
use crate::systems::market::{EconomyTally, MarketBook};
use crate::systems::perception::{RegionIndex, VisibleNeighbors};
use crate::systems::stimulus::StimulusQueue;
use crate::systems::trust::TrustUpdateQueue;

/// An opaque reference to a stored snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotHandle {
    pub snapshot_id: String,
    pub tick: u64,
    pub content_hash: u64,
}

/// Resource: in-memory snapshot storage keyed by snapshot id.
#[derive(Resource, Debug, Default)]
pub struct SnapshotStore {
    snapshots: BTreeMap<String, WorldSnapshot>,
    next_sequence: u64,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> String {
        let id = format_snapshot_id(self.next_sequence);
        self.next_sequence += 1;
        id
    }

    pub fn insert(&mut self, snapshot: WorldSnapshot) {
        self.snapshots
            .insert(snapshot.meta.snapshot_id.clone(), snapshot);
    }

    pub fn get(&self, snapshot_id: &str) -> Option<&WorldSnapshot> {
        self.snapshots.get(snapshot_id)
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

fn hash_bytes(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xCBF2_9CE4_8422_2325;
    for byte in bytes {
        hash = hash.rotate_left(7) ^ u64::from(*byte);
        hash = hash.wrapping_mul(0x517C_C1B7_2722_0A95);
    }
    hash
}

/// Content hash over the canonical serialization with the hash field
/// zeroed.
pub fn content_hash(snapshot: &WorldSnapshot) -> Result<u64, serde_json::Error> {
    let mut unhashed = snapshot.clone();
    unhashed.meta.content_hash = 0;
    let canonical = serde_json::to_string(&unhashed)?;
    Ok(hash_bytes(canonical.as_bytes()))
}

/// Verifies layout version and content hash.
pub fn verify(snapshot: &WorldSnapshot) -> Result<(), CoreError> {
    if snapshot.meta.format_version != SNAPSHOT_FORMAT_VERSION {
        return Err(CoreError::Integrity(format!(
            "unsupported snapshot format {} (expected {})",
            snapshot.meta.format_version, SNAPSHOT_FORMAT_VERSION
        )));
    }
    let expected = content_hash(snapshot)?;
    if expected != snapshot.meta.content_hash {
        return Err(CoreError::Integrity(format!(
            "content hash mismatch for {}: recorded {:016x}, computed {:016x}",
            snapshot.meta.snapshot_id, snapshot.meta.content_hash, expected
        )));
    }
    Ok(())
}

/// Collects all agents into snapshot form, sorted by id.
pub fn collect_agents(world: &mut World) -> Vec<AgentSnapshot> {
    let mut query = world.query::<(
        &AgentId,
        &AgentName,
        &Personality,
        &Ideology,
        &TrustLedger,
        &Inventory,
        &Lexicon,
        &Region,
        &Alive,
    )>();
    let mut agents: Vec<AgentSnapshot> = query
        .iter(world)
        .map(
            |(id, name, personality, ideology, trust, inventory, lexicon, region, alive)| {
                AgentSnapshot {
                    agent_id: id.0.clone(),
                    name: name.0.clone(),
                    personality: PersonalitySnapshot {
                        openness: personality.openness,
                        conscientiousness: personality.conscientiousness,
                        extraversion: personality.extraversion,
                        agreeableness: personality.agreeableness,
                        stability: personality.stability,
                    },
                    ideology: IdeologySnapshot {
                        tradition: ideology.tradition,
                        openness_axis: ideology.openness_axis,
                        hierarchy: ideology.hierarchy,
                        mysticism: ideology.mysticism,
                    },
                    trust: trust.iter().map(|(peer, value)| (peer.clone(), value)).collect(),
                    inventory: inventory.iter().collect(),
                    lexicon: lexicon
                        .iter()
                        .map(|(concept, entry)| {
                            (
                                concept.clone(),
                                LexiconEntrySnapshot {
                                    term: entry.term.clone(),
                                    history: entry.history.clone(),
                                },
                            )
                        })
                        .collect(),
                    region: region.0.clone(),
                    alive: alive.is_alive(),
                }
            },
        )
        .collect();
    agents.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));
    agents
}

/// Collects the relationship edge table, sorted by (from, to, kind).
pub fn collect_relationships(store: &MemoryStore) -> Vec<RelationshipSnapshot> {
    store
        .relationships
        .iter()
        .map(|(from, to, kind, edge)| RelationshipSnapshot {
            from: from.to_string(),
            to: to.to_string(),
            kind: kind.name().to_string(),
            weight: edge.weight,
            last_updated_tick: edge.last_updated_tick,
        })
        .collect()
}

/// Collects the culture artifact table.
pub fn collect_culture(culture: &CultureState) -> CultureSnapshot {
    CultureSnapshot {
        myths: culture
            .myths()
            .map(|myth| MythSnapshot {
                myth_id: myth.id.clone(),
                originators: myth.originators.clone(),
                summary: myth.summary.clone(),
                status: myth.status.name().to_string(),
                support: myth.support(),
                believers: myth.believers.iter().cloned().collect(),
                created_tick: myth.created_tick,
                last_reinforced_tick: myth.last_reinforced_tick,
                window_start_tick: myth.window_start_tick,
            })
            .collect(),
        norms: culture
            .norms()
            .map(|norm| NormSnapshot {
                norm_id: norm.id.clone(),
                topic: norm.topic.name().to_string(),
                status: norm.status.name().to_string(),
                support_weight: norm.support_weight,
                adherents: norm.adherents.iter().cloned().collect(),
                created_tick: norm.created_tick,
                last_reinforced_tick: norm.last_reinforced_tick,
            })
            .collect(),
        term_distribution: culture.term_distribution.clone(),
        baseline_distribution: culture.baseline_distribution.clone(),
        divergence: culture.divergence,
        sentiment_modifier: culture.sentiment_modifier,
        next_artifact_id: culture.artifact_counter(),
    }
}

/// Builds a complete snapshot of the world at the current tick.
///
/// Takes `&mut World`: exclusive access for the duration of
/// serialization, released on every exit path, so no partially written
/// snapshot is ever observable.
pub fn build_snapshot(
    world: &mut World,
    snapshot_id: &str,
    label: &str,
) -> Result<WorldSnapshot, CoreError> {
    let agents = collect_agents(world);
    let (tick, seed) = {
        let clock = world.resource::<WorldClock>();
        (clock.tick, clock.seed)
    };
    let store = world.resource::<MemoryStore>();
    let relationships = collect_relationships(store);
    let events = store.episodic.all().to_vec();
    let culture = collect_culture(world.resource::<CultureState>());
    let global_resources = world.resource::<GlobalResources>().as_map();
    let next_event_counter = world.resource::<TickEvents>().counter();

    let mut snapshot = WorldSnapshot {
        meta: SnapshotMeta {
            snapshot_id: snapshot_id.to_string(),
            label: label.to_string(),
            tick,
            seed,
            format_version: SNAPSHOT_FORMAT_VERSION,
            content_hash: 0,
        },
        agents,
        relationships,
        culture,
        global_resources,
        events,
        next_event_counter,
    };
    snapshot.meta.content_hash = content_hash(&snapshot)?;
    Ok(snapshot)
}

/// Everything needed to respawn one agent, parsed up front.
struct AgentPlan {
    id: String,
    name: String,
    personality: Personality,
    ideology: Ideology,
    trust: TrustLedger,
    inventory: Inventory,
    lexicon: Lexicon,
    region: String,
    alive: bool,
}

/// Restores the world from a verified snapshot.
///
/// Conversion happens before any mutation: if the snapshot names an
/// unknown region, edge kind, status, or topic, the restore fails with an
/// integrity error and the running world is untouched.
pub fn restore_world(world: &mut World, snapshot: &WorldSnapshot) -> Result<(), CoreError> {
    verify(snapshot)?;

    // Parse phase.
    let mut plans: Vec<AgentPlan> = Vec::with_capacity(snapshot.agents.len());
    for agent in &snapshot.agents {
        if !REGIONS.contains(&agent.region.as_str()) {
            return Err(CoreError::Integrity(format!(
                "agent {} references unknown region {}",
                agent.agent_id, agent.region
            )));
        }
        let mut trust = TrustLedger::new();
        for (peer, value) in &agent.trust {
            trust.set(peer.clone(), *value);
        }
        let mut inventory = Inventory::new();
        for (kind, quantity) in &agent.inventory {
            inventory.add(*kind, *quantity);
        }
        let mut lexicon = Lexicon::new();
        for (concept, entry) in &agent.lexicon {
            lexicon.insert_entry(
                concept.clone(),
                LexiconEntry {
                    term: entry.term.clone(),
                    history: entry.history.clone(),
                },
            );
        }
        plans.push(AgentPlan {
            id: agent.agent_id.clone(),
            name: agent.name.clone(),
            personality: Personality::new(
                agent.personality.openness,
                agent.personality.conscientiousness,
                agent.personality.extraversion,
                agent.personality.agreeableness,
                agent.personality.stability,
            ),
            ideology: Ideology::new(
                agent.ideology.tradition,
                agent.ideology.openness_axis,
                agent.ideology.hierarchy,
                agent.ideology.mysticism,
            ),
            trust,
            inventory,
            lexicon,
            region: agent.region.clone(),
            alive: agent.alive,
        });
    }
    plans.sort_by(|a, b| a.id.cmp(&b.id));

    let mut edges: BTreeMap<(String, String, EdgeKind), RelationshipEdge> = BTreeMap::new();
    for edge in &snapshot.relationships {
        let kind = EdgeKind::from_name(&edge.kind).ok_or_else(|| {
            CoreError::Integrity(format!("unknown relationship kind {}", edge.kind))
        })?;
        edges.insert(
            (edge.from.clone(), edge.to.clone(), kind),
            RelationshipEdge {
                weight: edge.weight,
                last_updated_tick: edge.last_updated_tick,
            },
        );
    }

    let mut culture = CultureState::new();
    for myth in &snapshot.culture.myths {
        let status = ArtifactStatus::from_name(&myth.status).ok_or_else(|| {
            CoreError::Integrity(format!("unknown myth status {}", myth.status))
        })?;
        culture.insert_myth(Myth {
            id: myth.myth_id.clone(),
            originators: myth.originators.clone(),
            summary: myth.summary.clone(),
            status,
            believers: myth.believers.iter().cloned().collect(),
            created_tick: myth.created_tick,
            last_reinforced_tick: myth.last_reinforced_tick,
            window_start_tick: myth.window_start_tick,
        });
    }
    for norm in &snapshot.culture.norms {
        let status = ArtifactStatus::from_name(&norm.status).ok_or_else(|| {
            CoreError::Integrity(format!("unknown norm status {}", norm.status))
        })?;
        let topic = NormTopic::from_name(&norm.topic).ok_or_else(|| {
            CoreError::Integrity(format!("unknown norm topic {}", norm.topic))
        })?;
        culture.insert_norm(Norm {
            id: norm.norm_id.clone(),
            topic,
            status,
            support_weight: norm.support_weight,
            adherents: norm.adherents.iter().cloned().collect(),
            created_tick: norm.created_tick,
            last_reinforced_tick: norm.last_reinforced_tick,
        });
    }
    culture.term_distribution = snapshot.culture.term_distribution.clone();
    culture.baseline_distribution = snapshot.culture.baseline_distribution.clone();
    culture.divergence = snapshot.culture.divergence;
    culture.sentiment_modifier = snapshot.culture.sentiment_modifier;
    culture.restore_counter(snapshot.culture.next_artifact_id);

    // The semantic index is derived state: concept seeds from the
    // baseline plus one entry per myth summary.
    let mut semantic_entries: Vec<(String, String)> = Vec::new();
    for (concept, terms) in &snapshot.culture.baseline_distribution {
        if let Some((term, _)) = terms.iter().next() {
            semantic_entries.push((concept.clone(), format!("{} {}", concept, term)));
        }
    }
    for myth in &snapshot.culture.myths {
        semantic_entries.push((myth.myth_id.clone(), myth.summary.clone()));
    }

    // Mutate phase - nothing below can fail.
    world.clear_entities();
    for plan in plans {
        world.spawn((
            Agent,
            AgentId(plan.id),
            AgentName(plan.name),
            plan.personality,
            plan.ideology,
            plan.trust,
            plan.inventory,
            plan.lexicon,
            Region(plan.region),
            Alive(plan.alive),
            VisibleNeighbors::new(),
        ));
    }

    world.insert_resource(WorldClock {
        tick: snapshot.meta.tick,
        seed: snapshot.meta.seed,
    });
    let mut pools = GlobalResources::new();
    pools.set_all(snapshot.global_resources.clone());
    world.insert_resource(pools);

    let mut store = MemoryStore::new();
    store.restore_from(snapshot.events.clone(), edges, semantic_entries);
    world.insert_resource(store);
    world.insert_resource(culture);

    let mut tick_events = TickEvents::new();
    tick_events.set_counter(snapshot.next_event_counter);
    tick_events.begin_tick(snapshot.meta.tick);
    world.insert_resource(tick_events);

    // Transient per-tick state starts clean.
    world.insert_resource(ActionQueue::new());
    world.insert_resource(MarketBook::new());
    world.insert_resource(EconomyTally::new());
    world.insert_resource(TrustUpdateQueue::new());
    world.insert_resource(CultureChanges::new());
    world.insert_resource(StimulusQueue::new());
    world.insert_resource(RegionIndex::new());

    Ok(())
}

/// Persists a snapshot atomically: temp file then rename. A failed write
/// never leaves a partial snapshot behind.
pub fn write_snapshot_to_dir(
    snapshot: &WorldSnapshot,
    dir: impl AsRef<Path>,
) -> Result<PathBuf, CoreError> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    let final_path = dir.join(format!(
        "{}_tick_{}.json",
        snapshot.meta.snapshot_id, snapshot.meta.tick
    ));
    let temp_path = dir.join(format!(".{}.tmp", snapshot.meta.snapshot_id));
    let json = serde_json::to_string_pretty(snapshot)?;
    if let Err(error) = fs::write(&temp_path, json) {
        let _ = fs::remove_file(&temp_path);
        return Err(error.into());
    }
    if let Err(error) = fs::rename(&temp_path, &final_path) {
        let _ = fs::remove_file(&temp_path);
        return Err(error.into());
    }
    Ok(final_path)
}

/// Loads and verifies a snapshot file.
pub fn load_snapshot_from_file(path: impl AsRef<Path>) -> Result<WorldSnapshot, CoreError> {
    let content = fs::read_to_string(path.as_ref())?;
    let snapshot: WorldSnapshot = serde_json::from_str(&content).map_err(|error| {
        CoreError::Integrity(format!(
            "malformed snapshot file {}: {}",
            path.as_ref().display(),
            error
        ))
    })?;
    verify(&snapshot)?;
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_sensitive_to_content() {
        let a = hash_bytes(b"the flood split the sky");
        let b = hash_bytes(b"the flood split the sea");
        assert_ne!(a, b);
        assert_eq!(a, hash_bytes(b"the flood split the sky"));
    }
}
