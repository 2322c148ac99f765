//! World initialization: agent spawning and the shared vocabulary.

pub mod agents;
pub mod concepts;

use bevy_ecs::prelude::*;
use std::collections::BTreeMap;

use crate::components::agent::{Alive, Lexicon};
use crate::components::culture::CultureState;

pub use agents::spawn_agents;

/// Captures the initial population term distribution as the drift
/// baseline. Called once, after spawning and before the first tick.
pub fn capture_baseline(world: &mut World) {
    let mut distribution: BTreeMap<String, BTreeMap<String, u32>> = BTreeMap::new();
    let mut query = world.query::<(&Lexicon, &Alive)>();
    for (lexicon, alive) in query.iter(world) {
        if !alive.is_alive() {
            continue;
        }
        for (concept, entry) in lexicon.iter() {
            *distribution
                .entry(concept.clone())
                .or_default()
                .entry(entry.term.clone())
                .or_insert(0) += 1;
        }
    }

    let mut culture = world.resource_mut::<CultureState>();
    culture.term_distribution = distribution.clone();
    culture.baseline_distribution = distribution;
    culture.divergence = 0.0;
}
