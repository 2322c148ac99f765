//! Negotiation Engine
//!
//! Bilateral alternating-offer sessions between agents. A session lives
//! for exactly one tick: it either ends in an accepted trade (both legs
//! settled atomically), an outright rejection, or a forced expiry at the
//! round limit. Unmatched supply and demand falls through to the double
//! auction.
//!
//! Valuations are denominated in grain, the numeraire commodity; an
//! agent's unit value for a kind rises with its own scarcity of that
//! kind, and trust toward the proposer lowers the acceptance threshold.

use bevy_ecs::prelude::*;
use std::collections::BTreeMap;

use cog_events::{EventPayload, EventSubtype, EventType, ResourceKind};

use crate::components::agent::{AgentId, Alive, Inventory, Region, TrustLedger};
use crate::components::world::WorldClock;
use crate::config::Config;
use crate::events::TickEvents;
use crate::systems::action::{ActionQueue, TradeOffer};
use crate::systems::market::{EconomyTally, MarketBook, Order};
use crate::systems::trust::{TrustOutcome, TrustUpdate, TrustUpdateQueue};

/// Baseline grain-denominated prices per unit.
pub fn base_price(kind: ResourceKind) -> f32 {
    match kind {
        ResourceKind::Grain => 1.0,
        ResourceKind::Ore => 3.0,
        ResourceKind::Cloth => 2.5,
        ResourceKind::Relic => 6.0,
    }
}

/// An agent's subjective unit value for a kind, in grain.
pub fn unit_value(inventory: &Inventory, kind: ResourceKind, scarcity_weight: f32) -> f32 {
    base_price(kind) * (1.0 + scarcity_weight * inventory.scarcity(kind))
}

/// Session resolution states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Accepted,
    Rejected,
    Expired,
}

/// The record of one resolved session.
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub status: SessionStatus,
    pub final_offer: TradeOffer,
    pub rounds: u32,
}

/// One side's view of the table, captured before the protocol runs.
struct PartyView {
    give_value: f32,
    want_value: f32,
    trust_toward_other: f32,
}

/// Runs the alternating-offer protocol to completion.
///
/// The initiator proposes `offer`; each round the receiving side accepts
/// when the offer clears its reservation (trust-discounted), otherwise it
/// concedes quantity toward the other side. Quantities only shrink, so
/// the protocol either converges, collapses to a rejection, or hits the
/// round limit and expires.
pub fn run_protocol(
    offer: TradeOffer,
    initiator_inventory: &Inventory,
    responder_inventory: &Inventory,
    initiator_trust_toward_responder: f32,
    responder_trust_toward_initiator: f32,
    config: &Config,
) -> SessionOutcome {
    let economy = &config.economy;
    let initiator = PartyView {
        give_value: unit_value(initiator_inventory, offer.give_kind, economy.scarcity_weight),
        want_value: unit_value(initiator_inventory, offer.want_kind, economy.scarcity_weight),
        trust_toward_other: initiator_trust_toward_responder,
    };
    let responder = PartyView {
        give_value: unit_value(responder_inventory, offer.give_kind, economy.scarcity_weight),
        want_value: unit_value(responder_inventory, offer.want_kind, economy.scarcity_weight),
        trust_toward_other: responder_trust_toward_initiator,
    };

    let mut current = offer;
    for round in 1..=economy.negotiation_round_limit {
        let responder_turn = round % 2 == 1;
        if responder_turn {
            // Responder pays want_quantity of want_kind, receives
            // give_quantity of give_kind.
            let receive = responder.give_value * current.give_quantity as f32;
            let pay = responder.want_value * current.want_quantity as f32;
            let threshold =
                pay * (1.0 - economy.trust_discount * responder.trust_toward_other.max(0.0));
            if receive >= threshold {
                return SessionOutcome {
                    status: SessionStatus::Accepted,
                    final_offer: current,
                    rounds: round,
                };
            }
            // Counter: pay less.
            let concession = concede(current.want_quantity, economy.concession_rate);
            if concession == 0 {
                return SessionOutcome {
                    status: SessionStatus::Rejected,
                    final_offer: current,
                    rounds: round,
                };
            }
            current.want_quantity = concession;
        } else {
            let receive = initiator.want_value * current.want_quantity as f32;
            let pay = initiator.give_value * current.give_quantity as f32;
            let threshold =
                pay * (1.0 - economy.trust_discount * initiator.trust_toward_other.max(0.0));
            if receive >= threshold {
                return SessionOutcome {
                    status: SessionStatus::Accepted,
                    final_offer: current,
                    rounds: round,
                };
            }
            let concession = concede(current.give_quantity, economy.concession_rate);
            if concession == 0 {
                return SessionOutcome {
                    status: SessionStatus::Rejected,
                    final_offer: current,
                    rounds: round,
                };
            }
            current.give_quantity = concession;
        }
    }

    SessionOutcome {
        status: SessionStatus::Expired,
        final_offer: current,
        rounds: config.economy.negotiation_round_limit,
    }
}

/// Shrinks a quantity by the concession rate, at least one unit.
fn concede(quantity: u32, rate: f32) -> u32 {
    let step = ((quantity as f32 * rate).ceil() as u32).max(1);
    quantity.saturating_sub(step)
}

/// System: resolve all negotiation proposals for the tick.
pub fn resolve_negotiations(
    clock: Res<WorldClock>,
    config: Res<Config>,
    mut actions: ResMut<ActionQueue>,
    mut book: ResMut<MarketBook>,
    mut tally: ResMut<EconomyTally>,
    mut trust_queue: ResMut<TrustUpdateQueue>,
    mut tick_events: ResMut<TickEvents>,
    mut query: Query<(&AgentId, &mut Inventory, &TrustLedger, &Region, &Alive)>,
) {
    let sessions = actions.take_negotiations();
    if sessions.is_empty() {
        return;
    }

    // Index the parties; Mut handles stay valid for the whole system.
    let mut parties: BTreeMap<String, (Mut<Inventory>, &TrustLedger, &Region)> = query
        .iter_mut()
        .filter(|(_, _, _, _, alive)| alive.is_alive())
        .map(|(id, inventory, trust, region, _)| (id.0.clone(), (inventory, trust, region)))
        .collect();

    for (index, (initiator_id, responder_id, offer)) in sessions.into_iter().enumerate() {
        let session_id = format!("neg_{}_{:03}", clock.tick, index);

        if initiator_id == responder_id || !parties.contains_key(&responder_id) {
            tally.failed_sessions += 1;
            tick_events.emit(
                EventType::Negotiation,
                EventSubtype::Rejected,
                vec![initiator_id.clone()],
                EventPayload::Negotiation {
                    session_id,
                    initiator: initiator_id.clone(),
                    counterparty: responder_id.clone(),
                    rounds: 0,
                },
            );
            continue;
        }

        let outcome = {
            let (initiator_inv, initiator_trust, _) = &parties[&initiator_id];
            let (responder_inv, responder_trust, _) = &parties[&responder_id];
            run_protocol(
                offer,
                initiator_inv,
                responder_inv,
                initiator_trust.get(&responder_id),
                responder_trust.get(&initiator_id),
                &config,
            )
        };

        match outcome.status {
            SessionStatus::Accepted => settle_accepted(
                &session_id,
                &initiator_id,
                &responder_id,
                &outcome,
                &mut parties,
                &mut tally,
                &mut trust_queue,
                &mut tick_events,
            ),
            SessionStatus::Rejected => {
                tally.failed_sessions += 1;
                tick_events.emit(
                    EventType::Negotiation,
                    EventSubtype::Rejected,
                    vec![initiator_id.clone(), responder_id.clone()],
                    EventPayload::Negotiation {
                        session_id,
                        initiator: initiator_id.clone(),
                        counterparty: responder_id.clone(),
                        rounds: outcome.rounds,
                    },
                );
                push_fallback_orders(&initiator_id, &offer, &parties, &config, &mut book);
            }
            SessionStatus::Expired => {
                tally.expired_sessions += 1;
                tally.expired_initiators.push(initiator_id.clone());
                let failed_event = tick_events.emit(
                    EventType::Negotiation,
                    EventSubtype::NegotiationFailed,
                    vec![initiator_id.clone(), responder_id.clone()],
                    EventPayload::Negotiation {
                        session_id,
                        initiator: initiator_id.clone(),
                        counterparty: responder_id.clone(),
                        rounds: outcome.rounds,
                    },
                );
                trust_queue.push(TrustUpdate {
                    agent: initiator_id.clone(),
                    peer: responder_id.clone(),
                    outcome: TrustOutcome::MinorFriction,
                    cause: Some(failed_event.clone()),
                });
                trust_queue.push(TrustUpdate {
                    agent: responder_id.clone(),
                    peer: initiator_id.clone(),
                    outcome: TrustOutcome::MinorFriction,
                    cause: Some(failed_event),
                });
                push_fallback_orders(&initiator_id, &offer, &parties, &config, &mut book);
            }
        }
    }
}

/// Applies both legs of an accepted trade atomically and records the
/// side effects.
#[allow(clippy::too_many_arguments)]
fn settle_accepted(
    session_id: &str,
    initiator_id: &str,
    responder_id: &str,
    outcome: &SessionOutcome,
    parties: &mut BTreeMap<String, (Mut<Inventory>, &TrustLedger, &Region)>,
    tally: &mut EconomyTally,
    trust_queue: &mut TrustUpdateQueue,
    tick_events: &mut TickEvents,
) {
    let terms = outcome.final_offer;

    // Validate both legs before touching either inventory. A party that
    // accepted terms it can no longer cover (stock drained by an earlier
    // session this tick) has reneged on the deal.
    let initiator_can_pay =
        parties[initiator_id].0.quantity(terms.give_kind) >= terms.give_quantity;
    let responder_can_pay =
        parties[responder_id].0.quantity(terms.want_kind) >= terms.want_quantity;
    if !initiator_can_pay || !responder_can_pay {
        tally.failed_sessions += 1;
        let rejected_event = tick_events.emit(
            EventType::Negotiation,
            EventSubtype::Rejected,
            vec![initiator_id.to_string(), responder_id.to_string()],
            EventPayload::Negotiation {
                session_id: session_id.to_string(),
                initiator: initiator_id.to_string(),
                counterparty: responder_id.to_string(),
                rounds: outcome.rounds,
            },
        );
        let (victim, defector) = if initiator_can_pay {
            (initiator_id, responder_id)
        } else {
            (responder_id, initiator_id)
        };
        trust_queue.push(TrustUpdate {
            agent: victim.to_string(),
            peer: defector.to_string(),
            outcome: TrustOutcome::Defection,
            cause: Some(rejected_event),
        });
        return;
    }

    if let Some((initiator_inv, _, _)) = parties.get_mut(initiator_id) {
        initiator_inv.remove(terms.give_kind, terms.give_quantity);
        initiator_inv.add(terms.want_kind, terms.want_quantity);
    }
    if let Some((responder_inv, _, _)) = parties.get_mut(responder_id) {
        responder_inv.remove(terms.want_kind, terms.want_quantity);
        responder_inv.add(terms.give_kind, terms.give_quantity);
    }

    let accepted_event = tick_events.emit(
        EventType::Negotiation,
        EventSubtype::Accepted,
        vec![initiator_id.to_string(), responder_id.to_string()],
        EventPayload::Negotiation {
            session_id: session_id.to_string(),
            initiator: initiator_id.to_string(),
            counterparty: responder_id.to_string(),
            rounds: outcome.rounds,
        },
    );
    tick_events.emit_with_causes(
        EventType::Trade,
        EventSubtype::Bilateral,
        vec![initiator_id.to_string(), responder_id.to_string()],
        EventPayload::Trade {
            seller: initiator_id.to_string(),
            buyer: responder_id.to_string(),
            resource: terms.give_kind,
            quantity: terms.give_quantity,
            price: None,
        },
        vec![accepted_event.clone()],
    );
    tick_events.emit_with_causes(
        EventType::Trade,
        EventSubtype::Bilateral,
        vec![initiator_id.to_string(), responder_id.to_string()],
        EventPayload::Trade {
            seller: responder_id.to_string(),
            buyer: initiator_id.to_string(),
            resource: terms.want_kind,
            quantity: terms.want_quantity,
            price: None,
        },
        vec![accepted_event.clone()],
    );

    trust_queue.push(TrustUpdate {
        agent: initiator_id.to_string(),
        peer: responder_id.to_string(),
        outcome: TrustOutcome::Cooperation,
        cause: Some(accepted_event.clone()),
    });
    trust_queue.push(TrustUpdate {
        agent: responder_id.to_string(),
        peer: initiator_id.to_string(),
        outcome: TrustOutcome::Cooperation,
        cause: Some(accepted_event),
    });

    tally.trades_executed += 1;
    tally.record_volume(terms.give_kind, terms.give_quantity);
    tally.record_volume(terms.want_kind, terms.want_quantity);

    let initiator_region = &parties[initiator_id].2 .0;
    let responder_region = &parties[responder_id].2 .0;
    if initiator_region != responder_region {
        tally.cross_region_traders.push(initiator_id.to_string());
        tally.cross_region_traders.push(responder_id.to_string());
    }
}

/// Pools an unresolved initiator's supply and demand into the auction.
fn push_fallback_orders(
    initiator_id: &str,
    offer: &TradeOffer,
    parties: &BTreeMap<String, (Mut<Inventory>, &TrustLedger, &Region)>,
    config: &Config,
    book: &mut MarketBook,
) {
    let Some((inventory, _, _)) = parties.get(initiator_id) else {
        return;
    };
    let scarcity_weight = config.economy.scarcity_weight;
    // Grain is the numeraire and never auctioned directly.
    if offer.give_kind != ResourceKind::Grain {
        let limit = unit_value(inventory, offer.give_kind, scarcity_weight).ceil() as u32;
        book.push_ask(Order {
            agent: initiator_id.to_string(),
            kind: offer.give_kind,
            quantity: offer.give_quantity,
            limit_price: limit.max(1),
        });
    }
    if offer.want_kind != ResourceKind::Grain {
        let limit = unit_value(inventory, offer.want_kind, scarcity_weight).floor() as u32;
        book.push_bid(Order {
            agent: initiator_id.to_string(),
            kind: offer.want_kind,
            quantity: offer.want_quantity,
            limit_price: limit.max(1),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rich_inventory() -> Inventory {
        let mut inv = Inventory::new();
        inv.add(ResourceKind::Grain, 50);
        inv.add(ResourceKind::Ore, 50);
        inv.add(ResourceKind::Cloth, 50);
        inv.add(ResourceKind::Relic, 50);
        inv
    }

    #[test]
    fn generous_offer_is_accepted_in_round_one() {
        let initiator = rich_inventory();
        let mut responder = Inventory::new();
        responder.add(ResourceKind::Grain, 40);
        // Offering 5 ore for 1 grain is far above any grain holder's
        // reservation.
        let offer = TradeOffer {
            give_kind: ResourceKind::Ore,
            give_quantity: 5,
            want_kind: ResourceKind::Grain,
            want_quantity: 1,
        };
        let outcome = run_protocol(offer, &initiator, &responder, 0.0, 0.0, &Config::default());
        assert_eq!(outcome.status, SessionStatus::Accepted);
        assert_eq!(outcome.rounds, 1);
    }

    #[test]
    fn incompatible_reservations_expire_at_the_round_limit() {
        // Responder is drowning in ore and starved of relics; asking for
        // its scarce relics in exchange for more ore cannot clear.
        let mut initiator = Inventory::new();
        initiator.add(ResourceKind::Ore, 80);
        let mut responder = Inventory::new();
        responder.add(ResourceKind::Ore, 80);
        let offer = TradeOffer {
            give_kind: ResourceKind::Ore,
            give_quantity: 1,
            want_kind: ResourceKind::Relic,
            want_quantity: 30,
        };
        let config = Config::default();
        let outcome = run_protocol(offer, &initiator, &responder, 0.0, 0.0, &config);
        assert!(matches!(
            outcome.status,
            SessionStatus::Expired | SessionStatus::Rejected
        ));
        assert!(outcome.rounds <= config.economy.negotiation_round_limit);
    }

    #[test]
    fn trust_lowers_the_acceptance_threshold() {
        let mut initiator = Inventory::new();
        initiator.add(ResourceKind::Cloth, 20);
        let mut responder = Inventory::new();
        responder.add(ResourceKind::Grain, 20);
        // A marginal offer: 2 cloth for 5 grain.
        let offer = TradeOffer {
            give_kind: ResourceKind::Cloth,
            give_quantity: 2,
            want_kind: ResourceKind::Grain,
            want_quantity: 5,
        };
        let config = Config::default();
        let cold = run_protocol(offer, &initiator, &responder, 0.0, 0.0, &config);
        let warm = run_protocol(offer, &initiator, &responder, 0.0, 1.0, &config);
        // With full trust the responder accepts at least as early.
        assert!(warm.rounds <= cold.rounds);
    }

    #[test]
    fn protocol_never_exceeds_the_round_limit() {
        let initiator = rich_inventory();
        let responder = rich_inventory();
        let offer = TradeOffer {
            give_kind: ResourceKind::Ore,
            give_quantity: 3,
            want_kind: ResourceKind::Relic,
            want_quantity: 200,
        };
        let config = Config::default();
        let outcome = run_protocol(offer, &initiator, &responder, 0.5, 0.5, &config);
        assert!(outcome.rounds <= config.economy.negotiation_round_limit);
    }
}
