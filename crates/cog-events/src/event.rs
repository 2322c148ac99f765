//! Event Types
//!
//! The episodic event schema. Events are immutable once emitted, ordered by
//! (tick, sequence), and form an append-only log. Causal links reference the
//! event IDs an event responds to (a trade caused by a negotiation, a grudge
//! caused by a betrayal).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::resource::ResourceKind;
use crate::stimulus::StimulusCategory;
use crate::timestamp::SimTimestamp;

/// Primary event type categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Negotiation,
    Trade,
    Market,
    Alliance,
    Betrayal,
    Myth,
    Norm,
    Language,
    Migration,
    Stimulus,
    Lifecycle,
    Diagnostic,
}

impl EventType {
    /// Returns the valid subtypes for this event type.
    pub fn valid_subtypes(&self) -> &'static [EventSubtype] {
        use EventSubtype::*;
        match self {
            EventType::Negotiation => &[Accepted, Rejected, NegotiationFailed],
            EventType::Trade => &[Bilateral, MarketFill],
            EventType::Market => &[Cleared, NoCross, BookTruncated],
            EventType::Alliance => &[Formed, Strengthened],
            EventType::Betrayal => &[Defection, NormBreach],
            EventType::Myth => &[Proposed, Reinforced, Contested, Canonized, Forgotten],
            EventType::Norm => &[
                Proposed,
                Reinforced,
                ReferendumHeld,
                Adopted,
                ReferendumFailed,
                Lapsed,
                PenaltyApplied,
            ],
            EventType::Language => &[TermAdopted, TermCoined],
            EventType::Migration => &[Moved],
            EventType::Stimulus => &[Applied],
            EventType::Lifecycle => &[Born, Deactivated],
            EventType::Diagnostic => &[AgentFault],
        }
    }

    /// Checks that a subtype belongs to this event type.
    pub fn is_valid_subtype(&self, subtype: EventSubtype) -> bool {
        self.valid_subtypes().contains(&subtype)
    }
}

/// Event subtypes across all categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSubtype {
    // Negotiation
    Accepted,
    Rejected,
    NegotiationFailed,
    // Trade
    Bilateral,
    MarketFill,
    // Market
    Cleared,
    NoCross,
    BookTruncated,
    // Alliance
    Formed,
    Strengthened,
    // Betrayal
    Defection,
    NormBreach,
    // Myth / Norm lifecycle
    Proposed,
    Reinforced,
    Contested,
    Canonized,
    Forgotten,
    ReferendumHeld,
    Adopted,
    ReferendumFailed,
    Lapsed,
    PenaltyApplied,
    // Language
    TermAdopted,
    TermCoined,
    // Migration
    Moved,
    // Stimulus
    Applied,
    // Lifecycle
    Born,
    Deactivated,
    // Diagnostic
    AgentFault,
}

/// Structured payload attached to an event, varying by category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventPayload {
    /// No additional data beyond type, subtype, and actors.
    None,
    /// A resolved exchange leg. Barter legs carry no price; market fills
    /// record the rounded clearing price.
    Trade {
        seller: String,
        buyer: String,
        resource: ResourceKind,
        quantity: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        price: Option<u32>,
    },
    /// The outcome of a negotiation session.
    Negotiation {
        session_id: String,
        initiator: String,
        counterparty: String,
        rounds: u32,
    },
    /// A market clearing for one resource kind.
    MarketClear {
        resource: ResourceKind,
        clearing_price: f32,
        volume: u32,
        matched_orders: u32,
    },
    /// A change involving a culture artifact.
    Culture {
        artifact_id: String,
        support: u32,
    },
    /// A soft penalty for acting against an adopted norm.
    NormPenalty {
        norm_id: String,
        fine: BTreeMap<ResourceKind, u32>,
        trust_cost: f32,
    },
    /// A lexicon change for one concept.
    Language {
        concept: String,
        term: String,
        previous: Option<String>,
        source: Option<String>,
    },
    /// An agent moving between regions.
    Migration {
        from_region: String,
        to_region: String,
    },
    /// An environmental stimulus reaching the engine.
    Stimulus {
        category: StimulusCategory,
        impact: f32,
    },
    /// A directed trust adjustment between two agents.
    TrustShift {
        from: String,
        to: String,
        delta: f32,
    },
    /// A contained per-agent failure (fail-soft path).
    Diagnostic {
        reason: String,
    },
}

/// An immutable episodic event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Unique, monotonically assigned identifier.
    pub event_id: String,
    /// When the event was committed.
    pub timestamp: SimTimestamp,
    /// Primary category.
    pub event_type: EventType,
    /// Category-specific subtype.
    pub subtype: EventSubtype,
    /// Participating agent IDs, sorted ascending.
    pub actors: Vec<String>,
    /// Structured payload.
    pub payload: EventPayload,
    /// Event IDs this event causally responds to.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub causes: Vec<String>,
}

impl Event {
    /// Creates an event, sorting the actor list into canonical order.
    pub fn new(
        event_id: impl Into<String>,
        timestamp: SimTimestamp,
        event_type: EventType,
        subtype: EventSubtype,
        mut actors: Vec<String>,
        payload: EventPayload,
    ) -> Self {
        actors.sort();
        Self {
            event_id: event_id.into(),
            timestamp,
            event_type,
            subtype,
            actors,
            payload,
            causes: Vec::new(),
        }
    }

    /// Attaches causal links to prior events.
    pub fn with_causes(mut self, causes: Vec<String>) -> Self {
        self.causes = causes;
        self
    }

    /// Whether the given agent participated in this event.
    pub fn involves(&self, agent_id: &str) -> bool {
        self.actors.iter().any(|a| a == agent_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actors_are_sorted_on_construction() {
        let event = Event::new(
            "evt_00000001",
            SimTimestamp::new(3, 0),
            EventType::Trade,
            EventSubtype::Bilateral,
            vec!["agent_0009".to_string(), "agent_0002".to_string()],
            EventPayload::None,
        );
        assert_eq!(event.actors, vec!["agent_0002", "agent_0009"]);
        assert!(event.involves("agent_0009"));
        assert!(!event.involves("agent_0001"));
    }

    #[test]
    fn subtype_validity_matches_category() {
        assert!(EventType::Negotiation.is_valid_subtype(EventSubtype::NegotiationFailed));
        assert!(!EventType::Trade.is_valid_subtype(EventSubtype::Canonized));
        assert!(EventType::Myth.is_valid_subtype(EventSubtype::Forgotten));
    }

    #[test]
    fn serializes_with_snake_case_tags() {
        let event = Event::new(
            "evt_00000002",
            SimTimestamp::new(1, 4),
            EventType::Stimulus,
            EventSubtype::Applied,
            Vec::new(),
            EventPayload::Stimulus {
                category: StimulusCategory::Weather,
                impact: -0.25,
            },
        );
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event_type\":\"stimulus\""));
        assert!(json.contains("\"subtype\":\"applied\""));
        assert!(json.contains("\"category\":\"weather\""));
    }
}
