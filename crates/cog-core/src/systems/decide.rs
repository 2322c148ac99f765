//! Decide Phase
//!
//! Each active agent perceives its surroundings (a pure read of memory,
//! culture, and neighbor state) and proposes one action for the tick.
//! Agents are iterated in sorted id order, each with its own RNG lane, so
//! the proposal list is reproducible and skipping one agent cannot shift
//! another's draws. A perception failure skips only that agent.

use bevy_ecs::prelude::*;
use rand::rngs::SmallRng;
use rand::Rng;

use cog_events::{EventPayload, EventSubtype, EventType, ResourceKind};

use crate::components::agent::{
    AgentId, Alive, Ideology, Inventory, Lexicon, Personality, Region, TrustLedger,
};
use crate::components::culture::{ArtifactStatus, CultureState, NormTopic};
use crate::components::world::{adjacent_regions, WorldClock};
use crate::config::Config;
use crate::error::AgentFault;
use crate::events::TickEvents;
use crate::memory::{EdgeKind, MemoryStore};
use crate::rng::{lane_rng, RngStream};
use crate::setup::concepts::myth_summary;
use crate::systems::action::{ActionQueue, CultureBallot, ProposedAction, TradeOffer};
use crate::systems::perception::VisibleNeighbors;

/// Base weights for action selection.
pub mod decide_weights {
    /// Myth proposal base weight.
    pub const PROPOSE_MYTH: f32 = 0.05;
    /// Myth reinforcement base weight.
    pub const SUPPORT_MYTH: f32 = 0.15;
    /// Norm proposal base weight.
    pub const PROPOSE_NORM: f32 = 0.04;
    /// Norm reinforcement base weight.
    pub const SUPPORT_NORM: f32 = 0.10;
    /// Migration base weight.
    pub const MIGRATE: f32 = 0.03;
    /// Idle base weight.
    pub const IDLE: f32 = 0.50;
    /// Tick window consulted for recent negotiation failures.
    pub const FAILURE_WINDOW: u64 = 10;
}

/// What an agent perceives before deciding.
#[derive(Debug, Clone)]
pub struct Situation {
    pub scarcest: ResourceKind,
    pub scarcity: f32,
    pub most_stocked: ResourceKind,
    pub most_stocked_quantity: u32,
    pub best_partner: Option<(String, f32)>,
    pub belonging: f32,
    pub supportable_myth: Option<String>,
    pub supportable_norm: Option<String>,
    pub proposable_topic: Option<NormTopic>,
    pub recent_failures: u32,
}

/// Pure read of visible state; never mutates anything.
#[allow(clippy::too_many_arguments)]
pub fn perceive(
    agent_id: &AgentId,
    trust: &TrustLedger,
    inventory: &Inventory,
    lexicon: &Lexicon,
    visible: &VisibleNeighbors,
    culture: &CultureState,
    store: &MemoryStore,
    current_tick: u64,
) -> Result<Situation, AgentFault> {
    if lexicon.is_empty() {
        // An agent without a lexicon cannot form a situation; treat the
        // state as poisoned and let the scheduler skip this tick.
        return Err(AgentFault::new(agent_id.0.clone(), "lexicon is empty"));
    }

    let mut scarcest = ResourceKind::Grain;
    let mut best_scarcity = f32::MIN;
    let mut most_stocked = ResourceKind::Grain;
    let mut best_stock = 0u32;
    for kind in ResourceKind::all() {
        let scarcity = inventory.scarcity(*kind);
        if scarcity > best_scarcity {
            best_scarcity = scarcity;
            scarcest = *kind;
        }
        let stock = inventory.quantity(*kind);
        if stock > best_stock {
            best_stock = stock;
            most_stocked = *kind;
        }
    }

    // Open rivals are not approached, whatever the trust scalar says.
    let rivals: std::collections::BTreeSet<&str> = store
        .query_relationships(&agent_id.0)
        .filter(|(_, kind, edge)| *kind == EdgeKind::Rivalry && edge.weight > 0.5)
        .map(|(to, _, _)| to)
        .collect();

    let mut best_partner: Option<(String, f32)> = None;
    let mut trust_sum = 0.0;
    for neighbor in &visible.agents {
        let value = trust.get(neighbor);
        trust_sum += value;
        if rivals.contains(neighbor.as_str()) {
            continue;
        }
        let better = match &best_partner {
            None => true,
            Some((_, best)) => value > *best,
        };
        if better {
            best_partner = Some((neighbor.clone(), value));
        }
    }
    let belonging = if visible.agents.is_empty() {
        0.0
    } else {
        trust_sum / visible.agents.len() as f32
    };

    let supportable_myth = culture
        .myths()
        .find(|m| m.status != ArtifactStatus::Forgotten && m.believers.contains(&agent_id.0))
        .map(|m| m.id.clone());
    let supportable_norm = culture
        .norms()
        .find(|n| n.status != ArtifactStatus::Forgotten && n.adherents.contains(&agent_id.0))
        .map(|n| n.id.clone());
    let proposable_topic = NormTopic::all()
        .iter()
        .find(|topic| culture.active_norm_for_topic(**topic).is_none())
        .copied();

    let recent_failures = store
        .query_recent_events(&agent_id.0, decide_weights::FAILURE_WINDOW, current_tick)
        .iter()
        .filter(|e| e.subtype == EventSubtype::NegotiationFailed)
        .count() as u32;

    Ok(Situation {
        scarcest,
        scarcity: best_scarcity,
        most_stocked,
        most_stocked_quantity: best_stock,
        best_partner,
        belonging,
        supportable_myth,
        supportable_norm,
        proposable_topic,
        recent_failures,
    })
}

/// Deterministic choice from (agent state, situation, RNG lane).
pub fn choose_action(
    personality: &Personality,
    ideology: &Ideology,
    region: &Region,
    situation: &Situation,
    config: &Config,
    rng: &mut SmallRng,
) -> ProposedAction {
    // Candidate list with weights; order is fixed so the cumulative draw
    // is reproducible.
    let mut candidates: Vec<(f32, ProposedAction)> = Vec::new();

    if let Some((partner, partner_trust)) = &situation.best_partner {
        if situation.most_stocked_quantity > 0 && situation.most_stocked != situation.scarcest {
            let discouragement = 1.0 / (1.0 + situation.recent_failures as f32);
            let weight = config.economy.trade_propensity
                * (0.5 + personality.extraversion)
                * (0.5 + situation.scarcity)
                * (1.0 + partner_trust.max(0.0))
                * discouragement;
            let give_quantity = rng
                .gen_range(1..=2)
                .min(situation.most_stocked_quantity);
            let want_quantity = rng.gen_range(1..=3);
            candidates.push((
                weight,
                ProposedAction::Negotiate {
                    counterparty: partner.clone(),
                    offer: TradeOffer {
                        give_kind: situation.most_stocked,
                        give_quantity,
                        want_kind: situation.scarcest,
                        want_quantity,
                    },
                },
            ));
        }
    }

    let mysticism = 0.5 + 0.5 * ideology.mysticism;
    candidates.push((
        decide_weights::PROPOSE_MYTH * mysticism * (0.5 + personality.openness),
        ProposedAction::Vote {
            ballot: CultureBallot::ProposeMyth {
                summary: myth_summary(rng),
            },
        },
    ));

    if let Some(myth_id) = &situation.supportable_myth {
        candidates.push((
            decide_weights::SUPPORT_MYTH * mysticism,
            ProposedAction::Vote {
                ballot: CultureBallot::SupportMyth {
                    myth_id: myth_id.clone(),
                },
            },
        ));
    }

    if let Some(topic) = situation.proposable_topic {
        let traditionalism = 0.5 + 0.5 * ideology.tradition;
        candidates.push((
            decide_weights::PROPOSE_NORM * traditionalism * (0.5 + personality.conscientiousness),
            ProposedAction::Vote {
                ballot: CultureBallot::ProposeNorm { topic },
            },
        ));
    }

    if let Some(norm_id) = &situation.supportable_norm {
        candidates.push((
            decide_weights::SUPPORT_NORM * (0.5 + 0.5 * ideology.tradition),
            ProposedAction::Vote {
                ballot: CultureBallot::SupportNorm {
                    norm_id: norm_id.clone(),
                },
            },
        ));
    }

    let adjacent = adjacent_regions(&region.0);
    if !adjacent.is_empty() {
        let restlessness = (1.0 - situation.belonging).max(0.0);
        let weight = decide_weights::MIGRATE * (0.5 + personality.openness) * restlessness;
        let target = adjacent[rng.gen_range(0..adjacent.len())];
        candidates.push((
            weight,
            ProposedAction::Migrate {
                to_region: target.to_string(),
            },
        ));
    }

    candidates.push((decide_weights::IDLE, ProposedAction::Idle));

    weighted_select(candidates, rng)
}

/// Cumulative weighted selection; falls back to the last candidate.
fn weighted_select(
    candidates: Vec<(f32, ProposedAction)>,
    rng: &mut SmallRng,
) -> ProposedAction {
    let total: f32 = candidates.iter().map(|(w, _)| w.max(0.0)).sum();
    if total <= 0.0 {
        return ProposedAction::Idle;
    }
    let roll: f32 = rng.gen::<f32>() * total;
    let mut cumulative = 0.0;
    let count = candidates.len();
    for (index, (weight, action)) in candidates.into_iter().enumerate() {
        cumulative += weight.max(0.0);
        if roll < cumulative || index == count - 1 {
            return action;
        }
    }
    ProposedAction::Idle
}

/// System: collect one proposed action per active agent.
pub fn decide_actions(
    clock: Res<WorldClock>,
    config: Res<Config>,
    culture: Res<CultureState>,
    store: Res<MemoryStore>,
    mut actions: ResMut<ActionQueue>,
    mut tick_events: ResMut<TickEvents>,
    query: Query<(
        &AgentId,
        &Personality,
        &Ideology,
        &TrustLedger,
        &Inventory,
        &Lexicon,
        &Region,
        &VisibleNeighbors,
        &Alive,
    )>,
) {
    let mut agents: Vec<_> = query
        .iter()
        .filter(|(_, _, _, _, _, _, _, _, alive)| alive.is_alive())
        .collect();
    agents.sort_by(|a, b| a.0.cmp(b.0));

    for (lane, (agent_id, personality, ideology, trust, inventory, lexicon, region, visible, _)) in
        agents.into_iter().enumerate()
    {
        let mut rng = lane_rng(clock.seed, clock.tick, RngStream::Decide, lane as u64);
        match perceive(
            agent_id, trust, inventory, lexicon, visible, &culture, &store, clock.tick,
        ) {
            Ok(situation) => {
                let action =
                    choose_action(personality, ideology, region, &situation, &config, &mut rng);
                actions.push(agent_id.0.clone(), action);
            }
            Err(fault) => {
                tracing::warn!("{}", fault);
                tick_events.emit(
                    EventType::Diagnostic,
                    EventSubtype::AgentFault,
                    vec![fault.agent_id.clone()],
                    EventPayload::Diagnostic {
                        reason: fault.reason.clone(),
                    },
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn test_situation() -> Situation {
        Situation {
            scarcest: ResourceKind::Relic,
            scarcity: 0.9,
            most_stocked: ResourceKind::Grain,
            most_stocked_quantity: 12,
            best_partner: Some(("agent_0002".to_string(), 0.4)),
            belonging: 0.2,
            supportable_myth: None,
            supportable_norm: None,
            proposable_topic: Some(NormTopic::ShareSurplus),
            recent_failures: 0,
        }
    }

    #[test]
    fn choice_is_deterministic_for_identical_inputs() {
        let personality = Personality::default();
        let ideology = Ideology::default();
        let region = Region("amber_vale".to_string());
        let situation = test_situation();
        let config = Config::default();

        let a = choose_action(
            &personality,
            &ideology,
            &region,
            &situation,
            &config,
            &mut SmallRng::seed_from_u64(7),
        );
        let b = choose_action(
            &personality,
            &ideology,
            &region,
            &situation,
            &config,
            &mut SmallRng::seed_from_u64(7),
        );
        assert_eq!(a, b);
    }

    #[test]
    fn destitute_agents_never_propose_trades() {
        let personality = Personality::default();
        let ideology = Ideology::default();
        let region = Region("amber_vale".to_string());
        let mut situation = test_situation();
        situation.most_stocked_quantity = 0;
        let config = Config::default();

        for seed in 0..50 {
            let action = choose_action(
                &personality,
                &ideology,
                &region,
                &situation,
                &config,
                &mut SmallRng::seed_from_u64(seed),
            );
            assert!(!matches!(action, ProposedAction::Negotiate { .. }));
        }
    }

    #[test]
    fn weighted_select_ignores_zero_weights() {
        let mut rng = SmallRng::seed_from_u64(3);
        for _ in 0..20 {
            let picked = weighted_select(
                vec![
                    (0.0, ProposedAction::Migrate {
                        to_region: "cinder_reach".to_string(),
                    }),
                    (1.0, ProposedAction::Idle),
                ],
                &mut rng,
            );
            assert_eq!(picked, ProposedAction::Idle);
        }
    }
}
