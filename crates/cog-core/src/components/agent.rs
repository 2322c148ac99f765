//! Agent Components
//!
//! Per-agent state: personality, ideology, trust ledger, inventory,
//! lexicon, region, liveness.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use cog_events::ResourceKind;

/// Marker component identifying an entity as an agent.
#[derive(Component, Debug, Clone, Default)]
pub struct Agent;

/// Unique identifier for an agent.
///
/// Zero-padded (`agent_0042`) so lexicographic order equals numeric order;
/// this is the canonical iteration key everywhere in the engine.
#[derive(Component, Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(pub String);

/// Human-readable name for an agent.
#[derive(Component, Debug, Clone, Serialize, Deserialize)]
pub struct AgentName(pub String);

/// Agent personality traits, fixed at creation.
/// All values are 0.0 to 1.0.
#[derive(Component, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Personality {
    /// Appetite for novel terms, myths, and distant trade partners.
    pub openness: f32,
    /// Reliability in negotiations; raises concession discipline.
    pub conscientiousness: f32,
    /// Frequency of voluntary interaction.
    pub extraversion: f32,
    /// Willingness to accept marginal offers.
    pub agreeableness: f32,
    /// Resistance to stimulus-driven ideology swings.
    pub stability: f32,
}

impl Default for Personality {
    fn default() -> Self {
        Self {
            openness: 0.5,
            conscientiousness: 0.5,
            extraversion: 0.5,
            agreeableness: 0.5,
            stability: 0.5,
        }
    }
}

impl Personality {
    pub fn new(
        openness: f32,
        conscientiousness: f32,
        extraversion: f32,
        agreeableness: f32,
        stability: f32,
    ) -> Self {
        Self {
            openness: openness.clamp(0.0, 1.0),
            conscientiousness: conscientiousness.clamp(0.0, 1.0),
            extraversion: extraversion.clamp(0.0, 1.0),
            agreeableness: agreeableness.clamp(0.0, 1.0),
            stability: stability.clamp(0.0, 1.0),
        }
    }
}

/// Mutable ideology axes, each in [-1, 1].
#[derive(Component, Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Ideology {
    /// Reverence for established myths and norms.
    pub tradition: f32,
    /// Posture toward strangers and cross-region exchange.
    pub openness_axis: f32,
    /// Deference to high-status agents.
    pub hierarchy: f32,
    /// Receptivity to myth proposals.
    pub mysticism: f32,
}

impl Ideology {
    pub fn new(tradition: f32, openness_axis: f32, hierarchy: f32, mysticism: f32) -> Self {
        Self {
            tradition: tradition.clamp(-1.0, 1.0),
            openness_axis: openness_axis.clamp(-1.0, 1.0),
            hierarchy: hierarchy.clamp(-1.0, 1.0),
            mysticism: mysticism.clamp(-1.0, 1.0),
        }
    }

    /// Shifts each axis by a bounded delta, clamping to [-1, 1].
    pub fn shift(&mut self, tradition: f32, openness_axis: f32, hierarchy: f32, mysticism: f32) {
        self.tradition = (self.tradition + tradition).clamp(-1.0, 1.0);
        self.openness_axis = (self.openness_axis + openness_axis).clamp(-1.0, 1.0);
        self.hierarchy = (self.hierarchy + hierarchy).clamp(-1.0, 1.0);
        self.mysticism = (self.mysticism + mysticism).clamp(-1.0, 1.0);
    }

    /// Dot product against another axis vector, for vote weighting.
    pub fn alignment(&self, other: &Ideology) -> f32 {
        self.tradition * other.tradition
            + self.openness_axis * other.openness_axis
            + self.hierarchy * other.hierarchy
            + self.mysticism * other.mysticism
    }
}

/// Trust toward peers, each scalar in [-1, 1].
///
/// Updated only by resolved interaction outcomes; deltas shrink as trust
/// approaches either extreme so values saturate instead of overflowing.
#[derive(Component, Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrustLedger {
    entries: BTreeMap<String, f32>,
}

impl TrustLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trust toward a peer; unknown peers are neutral.
    pub fn get(&self, peer: &str) -> f32 {
        self.entries.get(peer).copied().unwrap_or(0.0)
    }

    /// Applies a signed interaction outcome and returns the delta actually
    /// applied after diminishing-returns scaling.
    pub fn apply_outcome(&mut self, peer: &str, signed_magnitude: f32) -> f32 {
        let current = self.get(peer);
        let delta = signed_magnitude * (1.0 - current.abs());
        let updated = (current + delta).clamp(-1.0, 1.0);
        self.entries.insert(peer.to_string(), updated);
        updated - current
    }

    /// Sets trust directly (restore path only).
    pub fn set(&mut self, peer: impl Into<String>, value: f32) {
        self.entries.insert(peer.into(), value.clamp(-1.0, 1.0));
    }

    /// Peers with trust at or above the threshold, in id order.
    pub fn trusted_peers(&self, threshold: f32) -> impl Iterator<Item = (&String, f32)> {
        self.entries
            .iter()
            .filter(move |(_, v)| **v >= threshold)
            .map(|(k, v)| (k, *v))
    }

    /// All entries in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, f32)> {
        self.entries.iter().map(|(k, v)| (k, *v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resource holdings; quantities are non-negative by construction.
#[derive(Component, Debug, Clone, Default, Serialize, Deserialize)]
pub struct Inventory {
    items: BTreeMap<ResourceKind, u32>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grants the same starting quantity of every resource kind.
    pub fn uniform(quantity: u32) -> Self {
        let mut items = BTreeMap::new();
        for kind in ResourceKind::all() {
            items.insert(*kind, quantity);
        }
        Self { items }
    }

    pub fn quantity(&self, kind: ResourceKind) -> u32 {
        self.items.get(&kind).copied().unwrap_or(0)
    }

    pub fn add(&mut self, kind: ResourceKind, quantity: u32) {
        *self.items.entry(kind).or_insert(0) += quantity;
    }

    /// Removes quantity if available; returns false (and changes nothing)
    /// on insufficient stock.
    pub fn remove(&mut self, kind: ResourceKind, quantity: u32) -> bool {
        match self.items.get_mut(&kind) {
            Some(held) if *held >= quantity => {
                *held -= quantity;
                true
            }
            _ => false,
        }
    }

    /// Total units across all kinds.
    pub fn total(&self) -> u32 {
        self.items.values().sum()
    }

    /// Scarcity signal in (0, 1]; 1 when the agent holds none of the kind.
    pub fn scarcity(&self, kind: ResourceKind) -> f32 {
        1.0 / (1.0 + self.quantity(kind) as f32)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ResourceKind, u32)> + '_ {
        self.items.iter().map(|(k, v)| (*k, *v))
    }
}

/// One concept's current term plus the terms it displaced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LexiconEntry {
    pub term: String,
    /// (displaced term, tick it was dropped), oldest first.
    pub history: Vec<(String, u64)>,
}

impl LexiconEntry {
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            history: Vec::new(),
        }
    }
}

/// Concept -> preferred term mapping with drift history.
#[derive(Component, Debug, Clone, Default, Serialize, Deserialize)]
pub struct Lexicon {
    entries: BTreeMap<String, LexiconEntry>,
}

impl Lexicon {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, concept: impl Into<String>, term: impl Into<String>) {
        self.entries
            .insert(concept.into(), LexiconEntry::new(term));
    }

    /// Installs a full entry including history (restore path only).
    pub fn insert_entry(&mut self, concept: impl Into<String>, entry: LexiconEntry) {
        self.entries.insert(concept.into(), entry);
    }

    pub fn term_for(&self, concept: &str) -> Option<&str> {
        self.entries.get(concept).map(|e| e.term.as_str())
    }

    /// Adopts a new term for a concept, pushing the displaced term into
    /// history. Returns the displaced term, or None if the concept was
    /// unknown or the term unchanged.
    pub fn adopt(
        &mut self,
        concept: &str,
        term: impl Into<String>,
        tick: u64,
        max_history: usize,
    ) -> Option<String> {
        let term = term.into();
        let entry = self.entries.get_mut(concept)?;
        if entry.term == term {
            return None;
        }
        let displaced = std::mem::replace(&mut entry.term, term);
        entry.history.push((displaced.clone(), tick));
        if entry.history.len() > max_history {
            entry.history.remove(0);
        }
        Some(displaced)
    }

    /// Concepts in sorted order.
    pub fn concepts(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &LexiconEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The region an agent currently inhabits; co-residents are its neighbors.
#[derive(Component, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region(pub String);

/// Whether the agent is active.
///
/// Deactivated agents stay spawned for historical queries and are skipped
/// by every engine phase.
#[derive(Component, Debug, Clone, Serialize, Deserialize)]
pub struct Alive(pub bool);

impl Alive {
    pub fn new() -> Self {
        Self(true)
    }

    pub fn is_alive(&self) -> bool {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trust_deltas_diminish_near_saturation() {
        let mut ledger = TrustLedger::new();
        let first = ledger.apply_outcome("agent_0002", 0.5);
        assert!((first - 0.5).abs() < 1e-6);
        // Second application from 0.5: delta = 0.5 * (1 - 0.5) = 0.25.
        let second = ledger.apply_outcome("agent_0002", 0.5);
        assert!((second - 0.25).abs() < 1e-6);
        assert!(ledger.get("agent_0002") <= 1.0);
    }

    #[test]
    fn trust_never_leaves_bounds() {
        let mut ledger = TrustLedger::new();
        for _ in 0..100 {
            ledger.apply_outcome("agent_0003", 0.9);
        }
        assert!(ledger.get("agent_0003") <= 1.0);
        for _ in 0..200 {
            ledger.apply_outcome("agent_0003", -0.9);
        }
        assert!(ledger.get("agent_0003") >= -1.0);
    }

    #[test]
    fn inventory_remove_is_all_or_nothing() {
        let mut inv = Inventory::uniform(5);
        assert!(!inv.remove(ResourceKind::Ore, 6));
        assert_eq!(inv.quantity(ResourceKind::Ore), 5);
        assert!(inv.remove(ResourceKind::Ore, 5));
        assert_eq!(inv.quantity(ResourceKind::Ore), 0);
    }

    #[test]
    fn lexicon_adoption_tracks_history() {
        let mut lex = Lexicon::new();
        lex.insert("water", "mer");
        assert_eq!(lex.adopt("water", "mer", 4, 8), None);
        let displaced = lex.adopt("water", "vash", 5, 8);
        assert_eq!(displaced.as_deref(), Some("mer"));
        assert_eq!(lex.term_for("water"), Some("vash"));
    }

    #[test]
    fn ideology_shift_clamps() {
        let mut ideology = Ideology::default();
        ideology.shift(2.0, -2.0, 0.5, 0.0);
        assert_eq!(ideology.tradition, 1.0);
        assert_eq!(ideology.openness_axis, -1.0);
        assert_eq!(ideology.hierarchy, 0.5);
    }
}
