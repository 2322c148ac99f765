//! Market Clearing
//!
//! Double-auction fallback for supply and demand that bilateral
//! negotiation left unmatched. Bids are sorted descending, asks
//! ascending, and matched until they no longer cross; the clearing price
//! is the midpoint of the last crossed pair. Settlement moves the traded
//! kind against grain, the numeraire. All ties break on agent id so the
//! result is independent of submission order.

use bevy_ecs::prelude::*;
use std::collections::BTreeMap;

use cog_events::snapshot::EconomySummary;
use cog_events::{EventPayload, EventSubtype, EventType, ResourceKind};

use crate::components::agent::{AgentId, Alive, Inventory};
use crate::config::Config;
use crate::events::TickEvents;

/// A resting order on one side of the book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub agent: String,
    pub kind: ResourceKind,
    pub quantity: u32,
    /// Grain per unit.
    pub limit_price: u32,
}

/// Resource: the tick-scoped order book.
///
/// Orders never survive a tick; the book is cleared after the auction.
#[derive(Resource, Debug, Default)]
pub struct MarketBook {
    bids: Vec<Order>,
    asks: Vec<Order>,
}

impl MarketBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_bid(&mut self, order: Order) {
        self.bids.push(order);
    }

    pub fn push_ask(&mut self, order: Order) {
        self.asks.push(order);
    }

    pub fn bid_count(&self) -> usize {
        self.bids.len()
    }

    pub fn ask_count(&self) -> usize {
        self.asks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    pub fn clear(&mut self) {
        self.bids.clear();
        self.asks.clear();
    }
}

/// Resource: per-tick economy totals, reset at the start of each tick.
#[derive(Resource, Debug, Default)]
pub struct EconomyTally {
    pub trades_executed: u32,
    pub failed_sessions: u32,
    pub expired_sessions: u32,
    pub volume: BTreeMap<ResourceKind, u32>,
    pub clearing_prices: BTreeMap<ResourceKind, f32>,
    /// Initiators whose sessions force-expired this tick (norm input).
    pub expired_initiators: Vec<String>,
    /// Agents who traded across region lines this tick (norm input).
    pub cross_region_traders: Vec<String>,
}

impl EconomyTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_volume(&mut self, kind: ResourceKind, quantity: u32) {
        *self.volume.entry(kind).or_insert(0) += quantity;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn to_summary(&self) -> EconomySummary {
        EconomySummary {
            trades_executed: self.trades_executed,
            failed_sessions: self.failed_sessions,
            expired_sessions: self.expired_sessions,
            volume: self.volume.clone(),
            clearing_prices: self.clearing_prices.clone(),
        }
    }
}

/// One matched (buyer, seller) pair before settlement.
#[derive(Debug, Clone, PartialEq, Eq)]
struct MatchedPair {
    buyer: String,
    seller: String,
    kind: ResourceKind,
    quantity: u32,
}

/// Matches sorted bids against sorted asks for one kind.
///
/// Returns the matched pairs and the clearing price (midpoint of the last
/// crossed pair). Pure so it can be exercised directly in tests.
fn match_orders(mut bids: Vec<Order>, mut asks: Vec<Order>) -> (Vec<MatchedPair>, Option<f32>) {
    // Bids: highest price first, agent id breaks ties.
    bids.sort_by(|a, b| {
        b.limit_price
            .cmp(&a.limit_price)
            .then_with(|| a.agent.cmp(&b.agent))
    });
    // Asks: lowest price first, agent id breaks ties.
    asks.sort_by(|a, b| {
        a.limit_price
            .cmp(&b.limit_price)
            .then_with(|| a.agent.cmp(&b.agent))
    });

    let mut pairs = Vec::new();
    let mut last_cross: Option<(u32, u32)> = None;
    let mut bid_index = 0;
    let mut ask_index = 0;
    while bid_index < bids.len() && ask_index < asks.len() {
        let bid = &bids[bid_index];
        let ask = &asks[ask_index];
        if bid.limit_price < ask.limit_price {
            break;
        }
        let quantity = bid.quantity.min(ask.quantity);
        if quantity > 0 && bid.agent != ask.agent {
            pairs.push(MatchedPair {
                buyer: bid.agent.clone(),
                seller: ask.agent.clone(),
                kind: bid.kind,
                quantity,
            });
            last_cross = Some((bid.limit_price, ask.limit_price));
        }
        // min() guarantees at least one side empties, so the loop
        // always makes progress (self-crossed orders burn down too).
        let bid_exhausted = bid.quantity <= quantity;
        let ask_exhausted = ask.quantity <= quantity;
        bids[bid_index].quantity -= quantity;
        asks[ask_index].quantity -= quantity;
        if bid_exhausted {
            bid_index += 1;
        }
        if ask_exhausted {
            ask_index += 1;
        }
    }

    let clearing = last_cross.map(|(bid, ask)| (bid + ask) as f32 / 2.0);
    (pairs, clearing)
}

/// System: run the double auction and settle fills.
pub fn clear_market(
    config: Res<Config>,
    mut book: ResMut<MarketBook>,
    mut tally: ResMut<EconomyTally>,
    mut tick_events: ResMut<TickEvents>,
    mut query: Query<(&AgentId, &mut Inventory, &Alive)>,
) {
    if book.is_empty() {
        return;
    }

    truncate_overflow(&mut book, config.economy.max_book_orders, &mut tick_events);

    let mut inventories: BTreeMap<String, Mut<Inventory>> = query
        .iter_mut()
        .filter(|(_, _, alive)| alive.is_alive())
        .map(|(id, inventory, _)| (id.0.clone(), inventory))
        .collect();

    // Grain is the numeraire; every other kind clears against it.
    for kind in ResourceKind::all() {
        if *kind == ResourceKind::Grain {
            continue;
        }
        let bids: Vec<Order> = book.bids.iter().filter(|o| o.kind == *kind).cloned().collect();
        let asks: Vec<Order> = book.asks.iter().filter(|o| o.kind == *kind).cloned().collect();
        if bids.is_empty() && asks.is_empty() {
            continue;
        }

        let two_sided = !bids.is_empty() && !asks.is_empty();
        let (pairs, clearing) = match_orders(bids, asks);
        let Some(clearing_price) = clearing else {
            if two_sided {
                tick_events.emit(
                    EventType::Market,
                    EventSubtype::NoCross,
                    Vec::new(),
                    EventPayload::MarketClear {
                        resource: *kind,
                        clearing_price: 0.0,
                        volume: 0,
                        matched_orders: 0,
                    },
                );
            }
            continue;
        };

        let mut settled_volume = 0u32;
        let mut settled_orders = 0u32;
        for pair in &pairs {
            let settled = settle_fill(pair, clearing_price, &mut inventories);
            if settled > 0 {
                settled_volume += settled;
                settled_orders += 1;
                tick_events.emit(
                    EventType::Trade,
                    EventSubtype::MarketFill,
                    vec![pair.buyer.clone(), pair.seller.clone()],
                    EventPayload::Trade {
                        seller: pair.seller.clone(),
                        buyer: pair.buyer.clone(),
                        resource: *kind,
                        quantity: settled,
                        price: Some(clearing_price.round() as u32),
                    },
                );
                tally.record_volume(*kind, settled);
            }
        }

        if settled_volume > 0 {
            tally.clearing_prices.insert(*kind, clearing_price);
        }
        tick_events.emit(
            EventType::Market,
            EventSubtype::Cleared,
            Vec::new(),
            EventPayload::MarketClear {
                resource: *kind,
                clearing_price,
                volume: settled_volume,
                matched_orders: settled_orders,
            },
        );
    }

    // Order books are tick-scoped; nothing carries over unresolved.
    book.clear();
}

/// Applies one fill atomically: goods against grain, both legs or neither.
/// Quantity is reduced to what the seller holds and the buyer can pay
/// for; returns the units actually settled.
fn settle_fill(
    pair: &MatchedPair,
    clearing_price: f32,
    inventories: &mut BTreeMap<String, Mut<Inventory>>,
) -> u32 {
    if !inventories.contains_key(&pair.buyer) || !inventories.contains_key(&pair.seller) {
        return 0;
    }

    let seller_stock = inventories[&pair.seller].quantity(pair.kind);
    let buyer_grain = inventories[&pair.buyer].quantity(ResourceKind::Grain);

    let mut quantity = pair.quantity.min(seller_stock);
    let mut cost = grain_cost(quantity, clearing_price);
    while quantity > 0 && cost > buyer_grain {
        quantity -= 1;
        cost = grain_cost(quantity, clearing_price);
    }
    if quantity == 0 {
        return 0;
    }

    if let Some(seller) = inventories.get_mut(&pair.seller) {
        seller.remove(pair.kind, quantity);
        seller.add(ResourceKind::Grain, cost);
    }
    if let Some(buyer) = inventories.get_mut(&pair.buyer) {
        buyer.remove(ResourceKind::Grain, cost);
        buyer.add(pair.kind, quantity);
    }
    quantity
}

fn grain_cost(quantity: u32, clearing_price: f32) -> u32 {
    (quantity as f32 * clearing_price).round() as u32
}

/// Caps the book at the configured size, keeping the most competitive
/// orders. Truncation is recorded, not an error.
fn truncate_overflow(book: &mut MarketBook, max_orders: usize, tick_events: &mut TickEvents) {
    let mut dropped = 0usize;
    if book.bids.len() > max_orders {
        book.bids.sort_by(|a, b| {
            b.limit_price
                .cmp(&a.limit_price)
                .then_with(|| a.agent.cmp(&b.agent))
        });
        dropped += book.bids.len() - max_orders;
        book.bids.truncate(max_orders);
    }
    if book.asks.len() > max_orders {
        book.asks.sort_by(|a, b| {
            a.limit_price
                .cmp(&b.limit_price)
                .then_with(|| a.agent.cmp(&b.agent))
        });
        dropped += book.asks.len() - max_orders;
        book.asks.truncate(max_orders);
    }
    if dropped > 0 {
        tracing::warn!("order book overflow, dropped {} orders", dropped);
        tick_events.emit(
            EventType::Market,
            EventSubtype::BookTruncated,
            Vec::new(),
            EventPayload::Diagnostic {
                reason: format!("order book overflow, dropped {} orders", dropped),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(agent: &str, kind: ResourceKind, quantity: u32, limit: u32) -> Order {
        Order {
            agent: agent.to_string(),
            kind,
            quantity,
            limit_price: limit,
        }
    }

    #[test]
    fn clearing_price_is_the_midpoint_of_the_last_cross() {
        let bids = vec![
            order("agent_0001", ResourceKind::Ore, 2, 6),
            order("agent_0002", ResourceKind::Ore, 1, 4),
        ];
        let asks = vec![
            order("agent_0003", ResourceKind::Ore, 2, 2),
            order("agent_0004", ResourceKind::Ore, 1, 4),
        ];
        let (pairs, clearing) = match_orders(bids, asks);
        // Matches: 6-bid x 2-ask (2 units), then 4-bid x 4-ask (1 unit).
        assert_eq!(pairs.len(), 2);
        assert_eq!(clearing, Some(4.0));
    }

    #[test]
    fn matching_is_independent_of_submission_order() {
        let bids = vec![
            order("agent_0002", ResourceKind::Cloth, 3, 5),
            order("agent_0001", ResourceKind::Cloth, 3, 5),
            order("agent_0003", ResourceKind::Cloth, 2, 4),
        ];
        let asks = vec![
            order("agent_0005", ResourceKind::Cloth, 4, 3),
            order("agent_0004", ResourceKind::Cloth, 4, 3),
        ];
        let mut shuffled_bids = bids.clone();
        shuffled_bids.reverse();
        let mut shuffled_asks = asks.clone();
        shuffled_asks.reverse();

        let (pairs_a, clearing_a) = match_orders(bids, asks);
        let (pairs_b, clearing_b) = match_orders(shuffled_bids, shuffled_asks);
        assert_eq!(pairs_a, pairs_b);
        assert_eq!(clearing_a, clearing_b);
    }

    #[test]
    fn no_cross_yields_no_clearing_price() {
        let bids = vec![order("agent_0001", ResourceKind::Relic, 1, 2)];
        let asks = vec![order("agent_0002", ResourceKind::Relic, 1, 9)];
        let (pairs, clearing) = match_orders(bids, asks);
        assert!(pairs.is_empty());
        assert_eq!(clearing, None);
    }

    #[test]
    fn self_crossed_orders_never_trade() {
        let bids = vec![order("agent_0001", ResourceKind::Ore, 2, 5)];
        let asks = vec![order("agent_0001", ResourceKind::Ore, 2, 1)];
        let (pairs, _) = match_orders(bids, asks);
        assert!(pairs.is_empty());
    }
}
