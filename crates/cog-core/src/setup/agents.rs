//! Agent Spawning
//!
//! Spawns the initial population with randomized personalities, seeded
//! lexicons, region assignments, starting inventories, and kinship ties.

use bevy_ecs::prelude::*;
use rand::rngs::SmallRng;
use rand::Rng;

use cog_events::ResourceKind;

use crate::components::agent::{
    Agent, AgentId, AgentName, Alive, Ideology, Inventory, Lexicon, Personality, Region,
    TrustLedger,
};
use crate::components::world::REGIONS;
use crate::config::Config;
use crate::memory::{EdgeKind, MemoryStore};
use crate::setup::concepts::CONCEPTS;
use crate::systems::perception::VisibleNeighbors;

/// Name pool for spawned agents.
const AGENT_NAMES: &[&str] = &[
    "Abren", "Calyx", "Darest", "Edda", "Ferun", "Galea", "Hestor", "Ilvane", "Joris", "Kessa",
    "Lorn", "Maize", "Nerith", "Odest", "Pyra", "Quill", "Rasten", "Sable", "Tovin", "Ursel",
    "Varn", "Wrenna", "Xal", "Ysolde", "Zeph", "Arlo", "Brisa", "Corvin", "Delf", "Enara",
    "Fenwick", "Gilda", "Harrow", "Iska", "Jemm", "Kol", "Lyra", "Moss", "Nim", "Orra",
    "Pell", "Rook", "Senna", "Tamsin", "Ulf", "Vesper", "Willa", "Yarrow",
];

/// Initial trust between spawned kin.
const KINSHIP_TRUST: f32 = 0.3;

/// Initial weight of a kinship edge.
const KINSHIP_WEIGHT: f32 = 0.6;

/// Generate randomized personality traits for an agent.
fn generate_personality(rng: &mut SmallRng) -> Personality {
    // Average of two uniform draws approximates a centered bell curve.
    let rand_trait = |rng: &mut SmallRng| -> f32 {
        let a: f32 = rng.gen();
        let b: f32 = rng.gen();
        ((a + b) / 2.0).clamp(0.05, 0.95)
    };

    Personality {
        openness: rand_trait(rng),
        conscientiousness: rand_trait(rng),
        extraversion: rand_trait(rng),
        agreeableness: rand_trait(rng),
        stability: rand_trait(rng),
    }
}

/// Generate a mild initial ideology.
fn generate_ideology(rng: &mut SmallRng) -> Ideology {
    let axis = |rng: &mut SmallRng| -> f32 { rng.gen::<f32>() - 0.5 };
    Ideology::new(axis(rng), axis(rng), axis(rng), axis(rng))
}

/// Starting inventory with per-kind variation around the configured base.
fn generate_inventory(base: u32, rng: &mut SmallRng) -> Inventory {
    let mut inventory = Inventory::new();
    let spread = (base / 2).max(1);
    for kind in ResourceKind::all() {
        let low = base.saturating_sub(spread);
        let quantity = rng.gen_range(low..=base + spread);
        inventory.add(*kind, quantity);
    }
    inventory
}

/// The shared starting lexicon.
fn seed_lexicon() -> Lexicon {
    let mut lexicon = Lexicon::new();
    for (concept, term) in CONCEPTS {
        lexicon.insert(*concept, *term);
    }
    lexicon
}

fn generate_agent_id(index: usize) -> String {
    format!("agent_{:04}", index)
}

fn generate_name(index: usize, region: &str) -> String {
    let base = AGENT_NAMES[index % AGENT_NAMES.len()];
    let suffix = match region {
        "amber_vale" => "of Amber Vale",
        "cinder_reach" => "of Cinder Reach",
        "glass_shoals" => "of Glass Shoals",
        "hollow_crown" => "of Hollow Crown",
        _ => "the Wanderer",
    };
    format!("{} {}", base, suffix)
}

/// Spawns the initial population and wires kinship. Returns the spawned
/// agent IDs in ascending order.
pub fn spawn_agents(world: &mut World, config: &Config, rng: &mut SmallRng) -> Vec<String> {
    let count = config.simulation.agent_count;
    let mut ids = Vec::with_capacity(count);
    let mut kin_pairs: Vec<(String, String)> = Vec::new();
    let mut previous_in_region: Vec<Option<String>> = vec![None; REGIONS.len()];

    for index in 0..count {
        let region_index = index % REGIONS.len();
        let region = REGIONS[region_index];
        let agent_id = generate_agent_id(index);

        let mut trust = TrustLedger::new();
        if let Some(kin) = &previous_in_region[region_index] {
            trust.set(kin.clone(), KINSHIP_TRUST);
            kin_pairs.push((kin.clone(), agent_id.clone()));
            previous_in_region[region_index] = None;
        } else {
            previous_in_region[region_index] = Some(agent_id.clone());
        }

        world.spawn((
            Agent,
            AgentId(agent_id.clone()),
            AgentName(generate_name(index, region)),
            generate_personality(rng),
            generate_ideology(rng),
            trust,
            generate_inventory(config.simulation.starting_inventory, rng),
            seed_lexicon(),
            Region(region.to_string()),
            Alive::new(),
            VisibleNeighbors::new(),
        ));
        ids.push(agent_id);
    }

    // Kinship is mutual: both edges and both ledger entries.
    let mut store = world.resource_mut::<MemoryStore>();
    for (elder, younger) in &kin_pairs {
        store
            .relationships
            .set_weight(elder, younger, EdgeKind::Kinship, KINSHIP_WEIGHT, 0);
        store
            .relationships
            .set_weight(younger, elder, EdgeKind::Kinship, KINSHIP_WEIGHT, 0);
        store
            .relationships
            .set_weight(elder, younger, EdgeKind::Trust, KINSHIP_TRUST, 0);
        store
            .relationships
            .set_weight(younger, elder, EdgeKind::Trust, KINSHIP_TRUST, 0);
    }
    for (concept, term) in CONCEPTS {
        store
            .semantic
            .upsert(*concept, format!("{} {}", concept, term));
    }

    // The elder of each pair also trusts the younger.
    let kin_of: std::collections::BTreeMap<String, String> = kin_pairs
        .iter()
        .flat_map(|(a, b)| [(a.clone(), b.clone()), (b.clone(), a.clone())])
        .collect();
    let mut query = world.query::<(&AgentId, &mut TrustLedger)>();
    for (agent_id, mut trust) in query.iter_mut(world) {
        if let Some(kin) = kin_of.get(&agent_id.0) {
            trust.set(kin.clone(), KINSHIP_TRUST);
        }
    }

    ids
}
