//! Trust System
//!
//! Applies queued trust updates from resolved interactions, mirrors the
//! resulting scalars into the relationship graph, and derives alliance
//! and rivalry edges from threshold crossings. This is the social commit
//! phase: it runs after the economy and before culture, so a trade this
//! tick can sway a norm vote but not the other way around.

use bevy_ecs::prelude::*;
use std::collections::BTreeMap;

use cog_events::{EventPayload, EventSubtype, EventType};

use crate::components::agent::{AgentId, Alive, TrustLedger};
use crate::components::world::WorldClock;
use crate::config::Config;
use crate::events::TickEvents;
use crate::memory::{EdgeKind, MemoryStore};

/// The resolved-interaction outcomes that move trust.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrustOutcome {
    /// A completed cooperative exchange.
    Cooperation,
    /// A deliberate betrayal of an expectation.
    Defection,
    /// A failed but non-malicious interaction (expired session).
    MinorFriction,
}

impl TrustOutcome {
    /// Signed magnitude before diminishing-returns scaling.
    fn signed_magnitude(&self, base_delta: f32) -> f32 {
        match self {
            TrustOutcome::Cooperation => base_delta,
            TrustOutcome::Defection => -3.0 * base_delta,
            TrustOutcome::MinorFriction => -0.5 * base_delta,
        }
    }
}

/// One pending directed trust change.
#[derive(Debug, Clone)]
pub struct TrustUpdate {
    /// Whose ledger changes.
    pub agent: String,
    /// Toward whom.
    pub peer: String,
    pub outcome: TrustOutcome,
    /// Event that caused the change, for causal linking.
    pub cause: Option<String>,
}

/// Resource: trust updates awaiting the social commit phase.
#[derive(Resource, Debug, Default)]
pub struct TrustUpdateQueue {
    updates: Vec<TrustUpdate>,
}

impl TrustUpdateQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, update: TrustUpdate) {
        self.updates.push(update);
    }

    pub fn drain(&mut self) -> Vec<TrustUpdate> {
        std::mem::take(&mut self.updates)
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }
}

/// System: drain the queue, update ledgers, mirror edges.
pub fn process_trust_updates(
    clock: Res<WorldClock>,
    config: Res<Config>,
    mut queue: ResMut<TrustUpdateQueue>,
    mut store: ResMut<MemoryStore>,
    mut tick_events: ResMut<TickEvents>,
    mut query: Query<(&AgentId, &mut TrustLedger, &Alive)>,
) {
    let updates = queue.drain();
    if updates.is_empty() {
        return;
    }

    let mut ledgers: BTreeMap<String, Mut<TrustLedger>> = query
        .iter_mut()
        .filter(|(_, _, alive)| alive.is_alive())
        .map(|(id, ledger, _)| (id.0.clone(), ledger))
        .collect();

    for update in updates {
        let magnitude = update.outcome.signed_magnitude(config.trust.base_delta);
        let Some(ledger) = ledgers.get_mut(&update.agent) else {
            continue;
        };
        let applied = ledger.apply_outcome(&update.peer, magnitude);
        let new_value = ledger.get(&update.peer);

        // The trust edge mirrors the ledger scalar.
        store
            .relationships
            .set_weight(&update.agent, &update.peer, EdgeKind::Trust, new_value, clock.tick);

        if update.outcome == TrustOutcome::Defection {
            // Rivalry weight records intensity, not direction.
            store.relationships.set_weight(
                &update.agent,
                &update.peer,
                EdgeKind::Rivalry,
                new_value.min(0.0).abs().max(0.1),
                clock.tick,
            );
            tick_events.emit_with_causes(
                EventType::Betrayal,
                EventSubtype::Defection,
                vec![update.agent.clone(), update.peer.clone()],
                EventPayload::TrustShift {
                    from: update.agent.clone(),
                    to: update.peer.clone(),
                    delta: applied,
                },
                update.cause.iter().cloned().collect(),
            );
            continue;
        }

        if new_value <= config.trust.rivalry_threshold {
            store.relationships.set_weight(
                &update.agent,
                &update.peer,
                EdgeKind::Rivalry,
                new_value.abs(),
                clock.tick,
            );
        }

        // Alliance forms when both directions clear the threshold.
        if new_value >= config.trust.alliance_threshold {
            let reciprocal = ledgers
                .get(&update.peer)
                .map(|peer_ledger| peer_ledger.get(&update.agent))
                .unwrap_or(0.0);
            if reciprocal >= config.trust.alliance_threshold {
                let weight = (new_value + reciprocal) / 2.0;
                let already_allied = store
                    .relationships
                    .weight(&update.agent, &update.peer, EdgeKind::Alliance)
                    >= config.trust.alliance_threshold;
                store.relationships.set_weight(
                    &update.agent,
                    &update.peer,
                    EdgeKind::Alliance,
                    weight,
                    clock.tick,
                );
                store.relationships.set_weight(
                    &update.peer,
                    &update.agent,
                    EdgeKind::Alliance,
                    weight,
                    clock.tick,
                );
                let subtype = if already_allied {
                    EventSubtype::Strengthened
                } else {
                    EventSubtype::Formed
                };
                // Strengthening is only worth recording for real gains.
                if !already_allied || applied >= 0.05 {
                    tick_events.emit_with_causes(
                        EventType::Alliance,
                        subtype,
                        vec![update.agent.clone(), update.peer.clone()],
                        EventPayload::TrustShift {
                            from: update.agent.clone(),
                            to: update.peer.clone(),
                            delta: applied,
                        },
                        update.cause.iter().cloned().collect(),
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_magnitudes_are_signed() {
        assert!(TrustOutcome::Cooperation.signed_magnitude(0.1) > 0.0);
        assert!(TrustOutcome::Defection.signed_magnitude(0.1) < 0.0);
        assert!(TrustOutcome::MinorFriction.signed_magnitude(0.1) < 0.0);
    }
}
