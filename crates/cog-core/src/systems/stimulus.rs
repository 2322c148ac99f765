//! Stimulus Application
//!
//! Applies the tick's validated stimulus batch to agent ideology, global
//! resource pools, and culture state. Validation happened at the engine
//! boundary; everything in the queue is already well-formed.

use bevy_ecs::prelude::*;
use rand::Rng;

use cog_events::{EventPayload, EventSubtype, EventType, ResourceKind, Stimulus, StimulusCategory};

use crate::components::agent::{AgentId, Alive, Ideology, Personality, Region};
use crate::components::culture::CultureState;
use crate::components::world::{GlobalResources, WorldClock};
use crate::events::TickEvents;
use crate::rng::{stream_rng, RngStream};
use crate::systems::perception::RegionIndex;

/// Scaling constants for stimulus effects.
pub mod stimulus_constants {
    /// Ideology shift per unit of impact, before stability damping.
    pub const IDEOLOGY_SCALE: f32 = 0.2;
    /// Resource units injected or drained per unit of impact.
    pub const RESOURCE_SCALE: f32 = 40.0;
    /// Fraction of a region lost to a full-impact cataclysm.
    pub const CASUALTY_FRACTION: f32 = 0.1;
    /// Impact below which a cataclysm causes casualties at all.
    pub const CASUALTY_IMPACT_FLOOR: f32 = -0.5;
    /// Bound on the sentiment stability modifier.
    pub const SENTIMENT_CAP: f32 = 0.3;
}

/// Resource: validated stimuli for the current tick only.
#[derive(Resource, Debug, Default)]
pub struct StimulusQueue {
    items: Vec<Stimulus>,
}

impl StimulusQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the queue with the current tick's validated batch.
    pub fn set_batch(&mut self, items: Vec<Stimulus>) {
        self.items = items;
    }

    pub fn drain(&mut self) -> Vec<Stimulus> {
        std::mem::take(&mut self.items)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// System: apply the tick's stimulus batch.
pub fn apply_stimuli(
    clock: Res<WorldClock>,
    index: Res<RegionIndex>,
    mut queue: ResMut<StimulusQueue>,
    mut pools: ResMut<GlobalResources>,
    mut culture: ResMut<CultureState>,
    mut tick_events: ResMut<TickEvents>,
    mut query: Query<(&AgentId, &Personality, &Region, &mut Ideology, &mut Alive)>,
) {
    let items = queue.drain();
    if items.is_empty() {
        return;
    }
    let mut rng = stream_rng(clock.seed, clock.tick, RngStream::Stimulus);

    for stimulus in items {
        tick_events.emit(
            EventType::Stimulus,
            EventSubtype::Applied,
            Vec::new(),
            EventPayload::Stimulus {
                category: stimulus.category,
                impact: stimulus.impact,
            },
        );

        match stimulus.category {
            StimulusCategory::News => {
                shift_ideology(&mut query, &stimulus, |ideology, delta| {
                    ideology.shift(0.0, delta, 0.0, 0.0);
                });
            }
            StimulusCategory::Weather => {
                shift_ideology(&mut query, &stimulus, |ideology, delta| {
                    ideology.shift(delta * 0.5, 0.0, 0.0, delta * 0.5);
                });
                apply_pool_change(&mut pools, ResourceKind::Grain, stimulus.impact);
            }
            StimulusCategory::EconomicShock => {
                shift_ideology(&mut query, &stimulus, |ideology, delta| {
                    ideology.shift(0.0, 0.0, delta * 0.5, 0.0);
                });
                for kind in ResourceKind::all() {
                    apply_pool_change(&mut pools, *kind, stimulus.impact);
                }
            }
            StimulusCategory::Sentiment => {
                let cap = stimulus_constants::SENTIMENT_CAP;
                culture.sentiment_modifier =
                    (culture.sentiment_modifier + stimulus.impact * cap).clamp(-cap, cap);
            }
            StimulusCategory::Cataclysm => {
                apply_cataclysm(
                    &stimulus,
                    &index,
                    &mut rng,
                    &mut pools,
                    &mut tick_events,
                    &mut query,
                );
            }
        }
    }
}

/// Shifts ideology for every targeted active agent, damped by the agent's
/// stability trait.
fn shift_ideology(
    query: &mut Query<(&AgentId, &Personality, &Region, &mut Ideology, &mut Alive)>,
    stimulus: &Stimulus,
    apply: impl Fn(&mut Ideology, f32),
) {
    for (_, personality, region, mut ideology, alive) in query.iter_mut() {
        if !alive.is_alive() {
            continue;
        }
        if let Some(target) = &stimulus.target_region {
            if &region.0 != target {
                continue;
            }
        }
        let delta =
            stimulus.impact * stimulus_constants::IDEOLOGY_SCALE * (1.0 - personality.stability);
        apply(&mut ideology, delta);
    }
}

/// Positive impact injects into the pool, negative drains it.
fn apply_pool_change(pools: &mut GlobalResources, kind: ResourceKind, impact: f32) {
    let units = (impact.abs() * stimulus_constants::RESOURCE_SCALE) as u64;
    if impact >= 0.0 {
        pools.inject(kind, units);
    } else {
        pools.drain(kind, units);
    }
}

/// Deactivates a deterministic sample of a region's residents.
fn apply_cataclysm(
    stimulus: &Stimulus,
    index: &RegionIndex,
    rng: &mut rand::rngs::SmallRng,
    pools: &mut GlobalResources,
    tick_events: &mut TickEvents,
    query: &mut Query<(&AgentId, &Personality, &Region, &mut Ideology, &mut Alive)>,
) {
    for kind in ResourceKind::all() {
        apply_pool_change(pools, *kind, stimulus.impact);
    }
    if stimulus.impact > stimulus_constants::CASUALTY_IMPACT_FLOOR {
        return;
    }
    let Some(target) = &stimulus.target_region else {
        return;
    };
    let residents = index.residents(target);
    if residents.is_empty() {
        return;
    }
    let casualties = ((residents.len() as f32
        * stimulus.impact.abs()
        * stimulus_constants::CASUALTY_FRACTION)
        .ceil() as usize)
        .min(residents.len());

    // Sample victim ids from the sorted resident list.
    let mut victims: Vec<String> = Vec::with_capacity(casualties);
    let mut remaining: Vec<&String> = residents.iter().collect();
    for _ in 0..casualties {
        if remaining.is_empty() {
            break;
        }
        let pick = rng.gen_range(0..remaining.len());
        victims.push(remaining.remove(pick).clone());
    }

    victims.sort();
    let mut deactivated: Vec<String> = Vec::with_capacity(victims.len());
    for (agent_id, _, _, _, mut alive) in query.iter_mut() {
        if victims.contains(&agent_id.0) && alive.is_alive() {
            alive.0 = false;
            deactivated.push(agent_id.0.clone());
        }
    }
    deactivated.sort();
    for agent_id in deactivated {
        tick_events.emit(
            EventType::Lifecycle,
            EventSubtype::Deactivated,
            vec![agent_id.clone()],
            EventPayload::Stimulus {
                category: stimulus.category,
                impact: stimulus.impact,
            },
        );
        tracing::info!("agent {} deactivated by cataclysm in {}", agent_id, target);
    }
}
