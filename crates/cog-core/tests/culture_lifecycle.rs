//! Myth lifecycle and norm referendum properties.

use bevy_ecs::prelude::*;

use cog_core::components::agent::{
    Agent, AgentId, AgentName, Alive, Ideology, Inventory, Lexicon, Personality, Region,
    TrustLedger,
};
use cog_core::components::culture::{ArtifactStatus, CultureState, NormTopic};
use cog_core::components::world::{GlobalResources, WorldClock};
use cog_core::events::TickEvents;
use cog_core::memory::MemoryStore;
use cog_core::systems::action::{ActionQueue, CultureBallot, ProposedAction};
use cog_core::systems::culture::{evolve_culture, CultureChanges};
use cog_core::systems::market::EconomyTally;
use cog_core::Config;

fn culture_world(agent_count: usize, ideology: Ideology) -> World {
    let mut world = World::new();
    world.insert_resource(WorldClock::new(7));
    world.insert_resource(Config::default());
    world.insert_resource(CultureState::new());
    world.insert_resource(MemoryStore::new());
    world.insert_resource(ActionQueue::new());
    world.insert_resource(EconomyTally::new());
    world.insert_resource(GlobalResources::new());
    world.insert_resource(CultureChanges::new());
    let mut tick_events = TickEvents::new();
    tick_events.begin_tick(0);
    world.insert_resource(tick_events);

    for index in 0..agent_count {
        world.spawn((
            Agent,
            AgentId(format!("agent_{:04}", index)),
            AgentName(format!("agent_{:04}", index)),
            Personality::default(),
            ideology.clone(),
            TrustLedger::new(),
            Inventory::uniform(10),
            Lexicon::new(),
            Region("amber_vale".to_string()),
            Alive::new(),
        ));
    }
    world
}

fn run_culture(world: &mut World, tick: u64) {
    world.resource_mut::<WorldClock>().tick = tick;
    world.resource_mut::<TickEvents>().begin_tick(tick);
    let mut schedule = Schedule::default();
    schedule.add_systems(evolve_culture);
    schedule.run(world);
}

fn ballot(world: &mut World, agent: &str, ballot: CultureBallot) {
    world
        .resource_mut::<ActionQueue>()
        .push(agent.to_string(), ProposedAction::Vote { ballot });
}

#[test]
fn myth_canonizes_when_support_crosses_the_threshold_in_window() {
    let mut world = culture_world(8, Ideology::default());
    ballot(
        &mut world,
        "agent_0000",
        CultureBallot::ProposeMyth {
            summary: "the first flood split the sky".to_string(),
        },
    );
    run_culture(&mut world, 1);

    let myth_id = {
        let culture = world.resource::<CultureState>();
        let myth = culture.myths().next().expect("myth should exist");
        assert_eq!(myth.status, ArtifactStatus::Proposed);
        myth.id.clone()
    };

    // Four more believers push support to the default threshold of 5.
    for index in 1..5 {
        ballot(
            &mut world,
            &format!("agent_{:04}", index),
            CultureBallot::SupportMyth {
                myth_id: myth_id.clone(),
            },
        );
    }
    run_culture(&mut world, 2);

    let culture = world.resource::<CultureState>();
    assert_eq!(
        culture.myth(&myth_id).unwrap().status,
        ArtifactStatus::Canonical
    );
}

#[test]
fn unsupported_myth_is_contested_before_it_is_forgotten() {
    let config = Config::default();
    let mut world = culture_world(4, Ideology::default());
    ballot(
        &mut world,
        "agent_0000",
        CultureBallot::ProposeMyth {
            summary: "the hollow king stole the summer".to_string(),
        },
    );
    run_culture(&mut world, 1);
    let myth_id = world
        .resource::<CultureState>()
        .myths()
        .next()
        .unwrap()
        .id
        .clone();

    // Past the support window: proposed degrades to contested, never
    // straight to forgotten.
    run_culture(&mut world, 1 + config.culture.myth_window + 1);
    assert_eq!(
        world.resource::<CultureState>().myth(&myth_id).unwrap().status,
        ArtifactStatus::Contested
    );

    // Past the retention window with no reinforcement: forgotten.
    run_culture(
        &mut world,
        1 + config.culture.myth_window + config.culture.myth_retention + 2,
    );
    assert_eq!(
        world.resource::<CultureState>().myth(&myth_id).unwrap().status,
        ArtifactStatus::Forgotten
    );
}

#[test]
fn canonical_myth_survives_while_reinforced() {
    let config = Config::default();
    let mut world = culture_world(8, Ideology::default());
    ballot(
        &mut world,
        "agent_0000",
        CultureBallot::ProposeMyth {
            summary: "the grain mother named the four valleys".to_string(),
        },
    );
    run_culture(&mut world, 1);
    let myth_id = world
        .resource::<CultureState>()
        .myths()
        .next()
        .unwrap()
        .id
        .clone();
    for index in 1..5 {
        ballot(
            &mut world,
            &format!("agent_{:04}", index),
            CultureBallot::SupportMyth {
                myth_id: myth_id.clone(),
            },
        );
    }
    run_culture(&mut world, 2);

    // Reinforce just inside the retention window; the myth holds.
    let mid_tick = 2 + config.culture.myth_retention;
    ballot(
        &mut world,
        "agent_0005",
        CultureBallot::SupportMyth {
            myth_id: myth_id.clone(),
        },
    );
    run_culture(&mut world, mid_tick);
    assert_eq!(
        world.resource::<CultureState>().myth(&myth_id).unwrap().status,
        ArtifactStatus::Canonical
    );

    // Then let it starve.
    run_culture(&mut world, mid_tick + config.culture.myth_retention + 1);
    assert_eq!(
        world.resource::<CultureState>().myth(&myth_id).unwrap().status,
        ArtifactStatus::Forgotten
    );
}

#[test]
fn referendum_below_quorum_leaves_the_norm_proposed() {
    // Near-zero conviction: nobody clears the participation bar.
    let mut world = culture_world(8, Ideology::new(0.0, 0.0, 0.0, 0.0));
    ballot(
        &mut world,
        "agent_0000",
        CultureBallot::ProposeNorm {
            topic: NormTopic::HonorDeals,
        },
    );
    run_culture(&mut world, 1);
    let norm_id = world
        .resource::<CultureState>()
        .norms()
        .next()
        .unwrap()
        .id
        .clone();

    let referendum_tick = Config::default().culture.referendum_interval;
    run_culture(&mut world, referendum_tick);
    assert_eq!(
        world.resource::<CultureState>().norm(&norm_id).unwrap().status,
        ArtifactStatus::Proposed
    );
}

#[test]
fn referendum_with_aligned_quorum_adopts_the_norm() {
    // Strongly traditional, hierarchical agents favor honor_deals.
    let mut world = culture_world(8, Ideology::new(0.8, 0.0, 0.6, 0.0));
    ballot(
        &mut world,
        "agent_0000",
        CultureBallot::ProposeNorm {
            topic: NormTopic::HonorDeals,
        },
    );
    run_culture(&mut world, 1);
    let norm_id = world
        .resource::<CultureState>()
        .norms()
        .next()
        .unwrap()
        .id
        .clone();

    let referendum_tick = Config::default().culture.referendum_interval;
    run_culture(&mut world, referendum_tick);
    let culture = world.resource::<CultureState>();
    let norm = culture.norm(&norm_id).unwrap();
    assert_eq!(norm.status, ArtifactStatus::Canonical);
    assert_eq!(norm.adherents.len(), 8);
}
