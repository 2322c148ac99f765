//! Cultural Evolution Engine
//!
//! The culture commit phase: applies the tick's ballots, holds periodic
//! norm referenda, advances the myth lifecycle state machine, spreads
//! artifacts by contagion, and applies soft penalties for norm breaches.
//!
//! Myth lifecycle: `proposed -> {contested, canonical}`, and only
//! contested or canonical myths can be forgotten; a proposal that misses
//! its support window is contested first, never dropped straight to
//! forgotten.

use bevy_ecs::prelude::*;
use rand::Rng;
use std::collections::BTreeMap;

use cog_events::snapshot::CultureChange;
use cog_events::{EventPayload, EventSubtype, EventType, ResourceKind};

use crate::components::agent::{AgentId, Alive, Ideology, Inventory, TrustLedger};
use crate::components::culture::{ArtifactStatus, CultureState, Myth, Norm, NormTopic};
use crate::components::world::{GlobalResources, WorldClock};
use crate::config::Config;
use crate::events::TickEvents;
use crate::memory::{EdgeKind, MemoryStore};
use crate::rng::{lane_rng, RngStream};
use crate::systems::market::EconomyTally;

/// Structural limits for the culture engine.
pub mod culture_constants {
    /// Cap on concurrently active (non-forgotten) myths.
    pub const MAX_ACTIVE_MYTHS: usize = 12;
    /// Cosine similarity above which a proposal counts as a retelling.
    pub const DUPLICATE_SIMILARITY: f32 = 0.9;
}

/// Resource: culture transitions recorded for the tick result.
#[derive(Resource, Debug, Default)]
pub struct CultureChanges {
    changes: Vec<CultureChange>,
}

impl CultureChanges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, artifact_id: &str, artifact: &str, change: &str) {
        self.changes.push(CultureChange {
            artifact_id: artifact_id.to_string(),
            artifact: artifact.to_string(),
            change: change.to_string(),
        });
    }

    pub fn drain(&mut self) -> Vec<CultureChange> {
        std::mem::take(&mut self.changes)
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Threshold/sigmoid adoption curve for cultural contagion.
pub fn adoption_probability(trusted_holders: u32, steepness: f32, midpoint: f32) -> f32 {
    1.0 / (1.0 + (-steepness * (trusted_holders as f32 - midpoint)).exp())
}

/// System: the culture commit phase.
#[allow(clippy::too_many_arguments)]
pub fn evolve_culture(
    clock: Res<WorldClock>,
    config: Res<Config>,
    mut culture: ResMut<CultureState>,
    mut store: ResMut<MemoryStore>,
    mut actions: ResMut<crate::systems::action::ActionQueue>,
    mut tally: ResMut<EconomyTally>,
    mut pools: ResMut<GlobalResources>,
    mut changes: ResMut<CultureChanges>,
    mut tick_events: ResMut<TickEvents>,
    mut query: Query<(
        &AgentId,
        &Ideology,
        &mut TrustLedger,
        &mut Inventory,
        &Alive,
    )>,
) {
    apply_ballots(
        &clock,
        &mut culture,
        &mut store,
        &mut actions,
        &mut changes,
        &mut tick_events,
    );

    if clock.tick > 0 && clock.tick % config.culture.referendum_interval == 0 {
        hold_referenda(
            &clock,
            &config,
            &mut culture,
            &mut changes,
            &mut tick_events,
            &query,
        );
    }

    advance_myth_lifecycle(&clock, &config, &mut culture, &mut changes, &mut tick_events);

    spread_by_contagion(&clock, &config, &mut culture, &mut tick_events, &query);

    apply_norm_penalties(
        &clock,
        &config,
        &mut culture,
        &mut store,
        &mut tally,
        &mut pools,
        &mut tick_events,
        &mut query,
    );
}

/// Applies the tick's culture ballots in queued (agent id) order.
fn apply_ballots(
    clock: &WorldClock,
    culture: &mut CultureState,
    store: &mut MemoryStore,
    actions: &mut crate::systems::action::ActionQueue,
    changes: &mut CultureChanges,
    tick_events: &mut TickEvents,
) {
    use crate::systems::action::CultureBallot;

    for (agent_id, ballot) in actions.take_ballots() {
        match ballot {
            CultureBallot::ProposeMyth { summary } => {
                // A near-duplicate of a living myth reinforces it instead
                // of fragmenting support across retellings.
                let similar = store
                    .semantic_search(&summary, 1)
                    .into_iter()
                    .next()
                    .filter(|(id, score)| {
                        id.starts_with("myth_") && *score > culture_constants::DUPLICATE_SIMILARITY
                    });
                if let Some((existing_id, _)) = similar {
                    if let Some(myth) = culture.myth_mut(&existing_id) {
                        if myth.status != ArtifactStatus::Forgotten {
                            myth.reinforce(&agent_id, clock.tick);
                            let support = myth.support();
                            tick_events.emit(
                                EventType::Myth,
                                EventSubtype::Reinforced,
                                vec![agent_id.clone()],
                                EventPayload::Culture {
                                    artifact_id: existing_id,
                                    support,
                                },
                            );
                            continue;
                        }
                    }
                }
                let active = culture
                    .myths()
                    .filter(|m| m.status != ArtifactStatus::Forgotten)
                    .count();
                if active >= culture_constants::MAX_ACTIVE_MYTHS {
                    continue;
                }
                let myth_id = culture.next_myth_id();
                let myth = Myth::new(myth_id.clone(), agent_id.clone(), summary.clone(), clock.tick);
                store.semantic.upsert(myth_id.clone(), summary);
                tick_events.emit(
                    EventType::Myth,
                    EventSubtype::Proposed,
                    vec![agent_id.clone()],
                    EventPayload::Culture {
                        artifact_id: myth_id.clone(),
                        support: myth.support(),
                    },
                );
                changes.record(&myth_id, "myth", "proposed");
                culture.insert_myth(myth);
            }
            CultureBallot::SupportMyth { myth_id } => {
                if let Some(myth) = culture.myth_mut(&myth_id) {
                    if myth.status != ArtifactStatus::Forgotten {
                        myth.reinforce(&agent_id, clock.tick);
                        let support = myth.support();
                        tick_events.emit(
                            EventType::Myth,
                            EventSubtype::Reinforced,
                            vec![agent_id.clone()],
                            EventPayload::Culture {
                                artifact_id: myth_id.clone(),
                                support,
                            },
                        );
                    }
                }
            }
            CultureBallot::ProposeNorm { topic } => {
                if culture.active_norm_for_topic(topic).is_some() {
                    continue;
                }
                let norm_id = culture.next_norm_id();
                let norm = Norm::new(norm_id.clone(), topic, &agent_id, clock.tick);
                tick_events.emit(
                    EventType::Norm,
                    EventSubtype::Proposed,
                    vec![agent_id.clone()],
                    EventPayload::Culture {
                        artifact_id: norm_id.clone(),
                        support: norm.adherents.len() as u32,
                    },
                );
                changes.record(&norm_id, "norm", "proposed");
                culture.insert_norm(norm);
            }
            CultureBallot::SupportNorm { norm_id } => {
                if let Some(norm) = culture.norm_mut(&norm_id) {
                    if norm.status != ArtifactStatus::Forgotten {
                        norm.reinforce(&agent_id, clock.tick);
                        let support = norm.adherents.len() as u32;
                        tick_events.emit(
                            EventType::Norm,
                            EventSubtype::Reinforced,
                            vec![agent_id.clone()],
                            EventPayload::Culture {
                                artifact_id: norm_id.clone(),
                                support,
                            },
                        );
                    }
                }
            }
        }
    }
}

/// Ideology-weighted referenda over proposed norms.
fn hold_referenda(
    clock: &WorldClock,
    config: &Config,
    culture: &mut CultureState,
    changes: &mut CultureChanges,
    tick_events: &mut TickEvents,
    query: &Query<(&AgentId, &Ideology, &mut TrustLedger, &mut Inventory, &Alive)>,
) {
    // Voter roll: (id, ideology) for every active agent, sorted.
    let mut voters: Vec<(String, Ideology)> = query
        .iter()
        .filter(|(_, _, _, _, alive)| alive.is_alive())
        .map(|(id, ideology, _, _, _)| (id.0.clone(), ideology.clone()))
        .collect();
    voters.sort_by(|a, b| a.0.cmp(&b.0));
    let active_count = voters.len();
    if active_count == 0 {
        return;
    }

    let proposed: Vec<String> = culture
        .norms()
        .filter(|n| n.status == ArtifactStatus::Proposed)
        .map(|n| n.id.clone())
        .collect();

    for norm_id in proposed {
        let topic = match culture.norm(&norm_id) {
            Some(norm) => norm.topic,
            None => continue,
        };
        let appeal = topic.appeal();
        let mut support_weight = 0.0f32;
        let mut participants = 0usize;
        let mut supporters: Vec<String> = Vec::new();
        for (voter_id, ideology) in &voters {
            let weight = ideology.alignment(&appeal);
            if weight.abs() < config.culture.min_conviction {
                continue;
            }
            participants += 1;
            support_weight += weight;
            if weight > 0.0 {
                supporters.push(voter_id.clone());
            }
        }

        let quorum_met =
            participants as f32 / active_count as f32 >= config.culture.norm_quorum;
        let referendum_event = tick_events.emit(
            EventType::Norm,
            EventSubtype::ReferendumHeld,
            Vec::new(),
            EventPayload::Culture {
                artifact_id: norm_id.clone(),
                support: participants as u32,
            },
        );

        let Some(norm) = culture.norm_mut(&norm_id) else {
            continue;
        };
        norm.support_weight = support_weight;
        if quorum_met && support_weight > 0.0 {
            norm.status = ArtifactStatus::Canonical;
            norm.last_reinforced_tick = clock.tick;
            for supporter in supporters {
                norm.adherents.insert(supporter);
            }
            tick_events.emit_with_causes(
                EventType::Norm,
                EventSubtype::Adopted,
                Vec::new(),
                EventPayload::Culture {
                    artifact_id: norm_id.clone(),
                    support: norm.adherents.len() as u32,
                },
                vec![referendum_event],
            );
            changes.record(&norm_id, "norm", "adopted");
            tracing::info!("norm {} adopted with weight {:.2}", norm_id, support_weight);
        } else {
            tick_events.emit_with_causes(
                EventType::Norm,
                EventSubtype::ReferendumFailed,
                Vec::new(),
                EventPayload::Culture {
                    artifact_id: norm_id.clone(),
                    support: participants as u32,
                },
                vec![referendum_event],
            );
        }
    }
}

/// Advances every myth and norm through its lifecycle.
fn advance_myth_lifecycle(
    clock: &WorldClock,
    config: &Config,
    culture: &mut CultureState,
    changes: &mut CultureChanges,
    tick_events: &mut TickEvents,
) {
    let mut transitions: Vec<(String, &'static str, ArtifactStatus, u32)> = Vec::new();

    for myth in culture.myths_mut() {
        match myth.status {
            ArtifactStatus::Proposed => {
                if myth.support() >= config.culture.myth_support_threshold {
                    myth.status = ArtifactStatus::Canonical;
                    transitions.push((
                        myth.id.clone(),
                        "canonized",
                        ArtifactStatus::Canonical,
                        myth.support(),
                    ));
                } else if clock.tick.saturating_sub(myth.window_start_tick)
                    > config.culture.myth_window
                {
                    myth.status = ArtifactStatus::Contested;
                    myth.window_start_tick = clock.tick;
                    transitions.push((
                        myth.id.clone(),
                        "contested",
                        ArtifactStatus::Contested,
                        myth.support(),
                    ));
                }
            }
            ArtifactStatus::Contested => {
                if myth.support() >= config.culture.myth_support_threshold {
                    myth.status = ArtifactStatus::Canonical;
                    transitions.push((
                        myth.id.clone(),
                        "canonized",
                        ArtifactStatus::Canonical,
                        myth.support(),
                    ));
                } else if clock.tick.saturating_sub(myth.last_reinforced_tick)
                    > config.culture.myth_retention
                {
                    myth.status = ArtifactStatus::Forgotten;
                    transitions.push((
                        myth.id.clone(),
                        "forgotten",
                        ArtifactStatus::Forgotten,
                        myth.support(),
                    ));
                }
            }
            ArtifactStatus::Canonical => {
                if clock.tick.saturating_sub(myth.last_reinforced_tick)
                    > config.culture.myth_retention
                {
                    myth.status = ArtifactStatus::Forgotten;
                    transitions.push((
                        myth.id.clone(),
                        "forgotten",
                        ArtifactStatus::Forgotten,
                        myth.support(),
                    ));
                }
            }
            ArtifactStatus::Forgotten => {}
        }
    }

    for norm in culture.norms_mut() {
        if norm.status == ArtifactStatus::Canonical
            && clock.tick.saturating_sub(norm.last_reinforced_tick) > config.culture.norm_retention
        {
            norm.status = ArtifactStatus::Forgotten;
            transitions.push((
                norm.id.clone(),
                "lapsed",
                ArtifactStatus::Forgotten,
                norm.adherents.len() as u32,
            ));
        }
    }

    for (artifact_id, change, status, support) in transitions {
        let is_norm = artifact_id.starts_with("norm_");
        let (event_type, subtype) = match (is_norm, status) {
            (true, _) => (EventType::Norm, EventSubtype::Lapsed),
            (false, ArtifactStatus::Canonical) => (EventType::Myth, EventSubtype::Canonized),
            (false, ArtifactStatus::Contested) => (EventType::Myth, EventSubtype::Contested),
            (false, _) => (EventType::Myth, EventSubtype::Forgotten),
        };
        tick_events.emit(
            event_type,
            subtype,
            Vec::new(),
            EventPayload::Culture {
                artifact_id: artifact_id.clone(),
                support,
            },
        );
        changes.record(&artifact_id, if is_norm { "norm" } else { "myth" }, change);
    }
}

/// Contagion-curve adoption of myths and norms.
fn spread_by_contagion(
    clock: &WorldClock,
    config: &Config,
    culture: &mut CultureState,
    tick_events: &mut TickEvents,
    query: &Query<(&AgentId, &Ideology, &mut TrustLedger, &mut Inventory, &Alive)>,
) {
    // Read-only pass over agents, sorted for lane stability.
    let mut agents: Vec<(String, Vec<(String, f32)>)> = query
        .iter()
        .filter(|(_, _, _, _, alive)| alive.is_alive())
        .map(|(id, _, trust, _, _)| {
            (
                id.0.clone(),
                trust
                    .trusted_peers(config.culture.contagion_trust_threshold)
                    .map(|(peer, value)| (peer.clone(), value))
                    .collect(),
            )
        })
        .collect();
    agents.sort_by(|a, b| a.0.cmp(&b.0));

    let myth_ids: Vec<String> = culture
        .myths()
        .filter(|m| m.status != ArtifactStatus::Forgotten)
        .map(|m| m.id.clone())
        .collect();
    let norm_ids: Vec<String> = culture
        .adopted_norms()
        .map(|n| n.id.clone())
        .collect();

    for (lane, (agent_id, trusted)) in agents.iter().enumerate() {
        let mut rng = lane_rng(clock.seed, clock.tick, RngStream::Culture, lane as u64);

        for myth_id in &myth_ids {
            let Some(myth) = culture.myth(myth_id) else {
                continue;
            };
            let holds = myth.believers.contains(agent_id);
            let trusted_holders = trusted
                .iter()
                .filter(|(peer, _)| myth.believers.contains(peer))
                .count() as u32;
            if holds || trusted_holders == 0 {
                continue;
            }
            let probability = adoption_probability(
                trusted_holders,
                config.culture.adoption_steepness,
                config.culture.adoption_midpoint,
            );
            if rng.gen::<f32>() < probability {
                let Some(myth) = culture.myth_mut(myth_id) else {
                    continue;
                };
                myth.reinforce(agent_id, clock.tick);
                tick_events.emit(
                    EventType::Myth,
                    EventSubtype::Reinforced,
                    vec![agent_id.clone()],
                    EventPayload::Culture {
                        artifact_id: myth_id.clone(),
                        support: myth.support(),
                    },
                );
            }
        }

        for norm_id in &norm_ids {
            let Some(norm) = culture.norm(norm_id) else {
                continue;
            };
            let holds = norm.adherents.contains(agent_id);
            let trusted_holders = trusted
                .iter()
                .filter(|(peer, _)| norm.adherents.contains(peer))
                .count() as u32;
            if holds || trusted_holders == 0 {
                continue;
            }
            let probability = adoption_probability(
                trusted_holders,
                config.culture.adoption_steepness,
                config.culture.adoption_midpoint,
            );
            if rng.gen::<f32>() < probability {
                if let Some(norm) = culture.norm_mut(norm_id) {
                    norm.reinforce(agent_id, clock.tick);
                }
            }
        }
    }
}

/// Soft penalties for acting against adopted norms this tick.
#[allow(clippy::too_many_arguments)]
fn apply_norm_penalties(
    clock: &WorldClock,
    config: &Config,
    culture: &mut CultureState,
    store: &mut MemoryStore,
    tally: &mut EconomyTally,
    pools: &mut GlobalResources,
    tick_events: &mut TickEvents,
    query: &mut Query<(&AgentId, &Ideology, &mut TrustLedger, &mut Inventory, &Alive)>,
) {
    let norms: Vec<(String, NormTopic, Vec<String>)> = culture
        .adopted_norms()
        .map(|n| {
            (
                n.id.clone(),
                n.topic,
                n.adherents.iter().cloned().collect(),
            )
        })
        .collect();
    if norms.is_empty() {
        return;
    }

    let mut parties: BTreeMap<String, (Mut<TrustLedger>, Mut<Inventory>)> = query
        .iter_mut()
        .filter(|(_, _, _, _, alive)| alive.is_alive())
        .map(|(id, _, trust, inventory, _)| (id.0.clone(), (trust, inventory)))
        .collect();

    for (norm_id, topic, adherents) in norms {
        let mut violators: Vec<String> = match topic {
            NormTopic::ShareSurplus => parties
                .iter()
                .filter(|(_, (_, inventory))| {
                    inventory.total() > config.culture.surplus_threshold
                })
                .map(|(id, _)| id.clone())
                .collect(),
            NormTopic::HonorDeals => tally.expired_initiators.clone(),
            NormTopic::ShunOutsiders => tally.cross_region_traders.clone(),
        };
        violators.sort();
        violators.dedup();

        for violator in violators {
            if !parties.contains_key(&violator) {
                continue;
            }

            // Resource fine drains to the world pool.
            let mut fine = BTreeMap::new();
            if let Some((_, inventory)) = parties.get_mut(&violator) {
                let fined = config
                    .culture
                    .norm_fine
                    .min(inventory.quantity(ResourceKind::Grain));
                if fined > 0 {
                    inventory.remove(ResourceKind::Grain, fined);
                    pools.inject(ResourceKind::Grain, fined as u64);
                    fine.insert(ResourceKind::Grain, fined);
                }
            }

            // Adherents lose trust in the violator.
            for adherent in &adherents {
                if adherent == &violator {
                    continue;
                }
                if let Some((ledger, _)) = parties.get_mut(adherent) {
                    ledger.apply_outcome(&violator, -config.culture.norm_trust_cost);
                    let value = ledger.get(&violator);
                    store.relationships.set_weight(
                        adherent,
                        &violator,
                        EdgeKind::Trust,
                        value,
                        clock.tick,
                    );
                }
            }

            tick_events.emit(
                EventType::Norm,
                EventSubtype::PenaltyApplied,
                vec![violator.clone()],
                EventPayload::NormPenalty {
                    norm_id: norm_id.clone(),
                    fine,
                    trust_cost: config.culture.norm_trust_cost,
                },
            );
            tick_events.emit(
                EventType::Betrayal,
                EventSubtype::NormBreach,
                vec![violator.clone()],
                EventPayload::Culture {
                    artifact_id: norm_id.clone(),
                    support: adherents.len() as u32,
                },
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adoption_curve_is_s_shaped() {
        let low = adoption_probability(0, 1.2, 2.0);
        let mid = adoption_probability(2, 1.2, 2.0);
        let high = adoption_probability(6, 1.2, 2.0);
        assert!(low < mid && mid < high);
        assert!((mid - 0.5).abs() < 1e-6);
        assert!(high > 0.95);
    }

    #[test]
    fn changes_drain_empties_the_buffer() {
        let mut changes = CultureChanges::new();
        changes.record("myth_0000", "myth", "proposed");
        assert_eq!(changes.drain().len(), 1);
        assert!(changes.is_empty());
    }
}
