//! Economy properties
//!
//! Resource conservation, trust bounds, and the incompatible-reservation
//! negotiation scenario.

use bevy_ecs::prelude::*;
use std::collections::BTreeMap;

use cog_core::components::agent::{
    Agent, AgentId, AgentName, Alive, Ideology, Inventory, Lexicon, Personality, Region,
    TrustLedger,
};
use cog_core::components::world::WorldClock;
use cog_core::events::TickEvents;
use cog_core::systems::action::{ActionQueue, ProposedAction, TradeOffer};
use cog_core::systems::market::{EconomyTally, MarketBook};
use cog_core::systems::negotiation::resolve_negotiations;
use cog_core::systems::trust::TrustUpdateQueue;
use cog_core::{Config, Simulation, ViewFilters};
use cog_events::{EventSubtype, ResourceKind};

fn test_config(seed: u64, agents: usize) -> Config {
    let mut config = Config::default();
    config.simulation.seed = seed;
    config.simulation.agent_count = agents;
    config.simulation.snapshot_interval = 0;
    config
}

/// Total units of each kind across all agents plus the global pools.
fn world_totals(sim: &mut Simulation) -> BTreeMap<ResourceKind, u64> {
    let mut totals: BTreeMap<ResourceKind, u64> = sim.global_resources();
    let view = sim.get_state_view(&ViewFilters::everything());
    for agent in &view.agents {
        for (kind, quantity) in &agent.inventory {
            *totals.entry(*kind).or_insert(0) += u64::from(*quantity);
        }
    }
    totals
}

#[test]
fn resources_are_conserved_without_injection() {
    let mut sim = Simulation::initialize(test_config(42, 12)).unwrap();
    let before = world_totals(&mut sim);
    for _ in 0..50 {
        sim.advance_tick(&[]).unwrap();
    }
    let after = world_totals(&mut sim);
    assert_eq!(before, after, "trade must neither create nor destroy resources");
}

#[test]
fn trust_stays_bounded_over_a_long_run() {
    let mut sim = Simulation::initialize(test_config(42, 12)).unwrap();
    for _ in 0..100 {
        sim.advance_tick(&[]).unwrap();
    }
    let view = sim.get_state_view(&ViewFilters::everything());
    for agent in &view.agents {
        for (peer, trust) in &agent.trust {
            assert!(
                (-1.0..=1.0).contains(trust),
                "trust {} -> {} out of bounds: {}",
                agent.agent_id,
                peer,
                trust
            );
        }
    }
    for edge in &view.relationships {
        assert!(
            (-1.0..=1.0).contains(&edge.weight),
            "edge weight out of bounds: {}",
            edge.weight
        );
    }
}

fn spawn_party(
    world: &mut World,
    id: &str,
    region: &str,
    stock: &[(ResourceKind, u32)],
) -> String {
    let mut inventory = Inventory::new();
    for (kind, quantity) in stock {
        inventory.add(*kind, *quantity);
    }
    world.spawn((
        Agent,
        AgentId(id.to_string()),
        AgentName(id.to_string()),
        Personality::default(),
        Ideology::default(),
        TrustLedger::new(),
        inventory,
        Lexicon::new(),
        Region(region.to_string()),
        Alive::new(),
    ));
    id.to_string()
}

#[test]
fn incompatible_reservations_expire_without_mutation() {
    let mut world = World::new();
    world.insert_resource(WorldClock::new(7));
    world.insert_resource(Config::default());
    world.insert_resource(ActionQueue::new());
    world.insert_resource(MarketBook::new());
    world.insert_resource(EconomyTally::new());
    world.insert_resource(TrustUpdateQueue::new());
    let mut tick_events = TickEvents::new();
    tick_events.begin_tick(1);
    world.insert_resource(tick_events);

    // The initiator hoards relics it values dearly; the responder is
    // grain-starved and will not pay. Neither side's reservation can be
    // met inside the round limit.
    let initiator = spawn_party(
        &mut world,
        "agent_0001",
        "amber_vale",
        &[
            (ResourceKind::Relic, 4),
            (ResourceKind::Grain, 100),
            (ResourceKind::Ore, 50),
            (ResourceKind::Cloth, 50),
        ],
    );
    let responder = spawn_party(
        &mut world,
        "agent_0002",
        "amber_vale",
        &[
            (ResourceKind::Relic, 50),
            (ResourceKind::Grain, 3),
            (ResourceKind::Ore, 50),
            (ResourceKind::Cloth, 50),
        ],
    );

    world
        .resource_mut::<ActionQueue>()
        .push(
            initiator.clone(),
            ProposedAction::Negotiate {
                counterparty: responder.clone(),
                offer: TradeOffer {
                    give_kind: ResourceKind::Relic,
                    give_quantity: 4,
                    want_kind: ResourceKind::Grain,
                    want_quantity: 20,
                },
            },
        );

    let mut schedule = Schedule::default();
    schedule.add_systems(resolve_negotiations);
    schedule.run(&mut world);

    // Session expired at the round limit.
    let tally = world.resource::<EconomyTally>();
    assert_eq!(tally.expired_sessions, 1);
    assert_eq!(tally.trades_executed, 0);
    assert_eq!(tally.expired_initiators, vec![initiator.clone()]);

    // A negotiation_failed event names both agents.
    let events = world.resource::<TickEvents>();
    let failed: Vec<_> = events
        .events()
        .iter()
        .filter(|e| e.subtype == EventSubtype::NegotiationFailed)
        .collect();
    assert_eq!(failed.len(), 1);
    assert!(failed[0].involves(&initiator));
    assert!(failed[0].involves(&responder));

    // No resource mutation on either side.
    let mut query = world.query::<(&AgentId, &Inventory)>();
    for (agent_id, inventory) in query.iter(&world) {
        match agent_id.0.as_str() {
            "agent_0001" => {
                assert_eq!(inventory.quantity(ResourceKind::Relic), 4);
                assert_eq!(inventory.quantity(ResourceKind::Grain), 100);
            }
            "agent_0002" => {
                assert_eq!(inventory.quantity(ResourceKind::Relic), 50);
                assert_eq!(inventory.quantity(ResourceKind::Grain), 3);
            }
            other => panic!("unexpected agent {}", other),
        }
    }
}
