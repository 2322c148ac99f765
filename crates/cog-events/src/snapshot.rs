//! Snapshot Types
//!
//! Serialization structs for world snapshots and per-tick results.
//!
//! A snapshot is a full, versioned capture of simulation state at a tick
//! boundary: every agent, every relationship edge, the culture artifact
//! table, the episodic log cursor, and the metadata needed to verify
//! integrity and resume deterministically (seed, tick, content hash).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::event::Event;
use crate::resource::ResourceKind;

/// Bumped whenever the snapshot layout changes incompatibly.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// Snapshot metadata, written alongside the body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMeta {
    /// Identifier such as `snap_000002`.
    pub snapshot_id: String,
    /// Caller-supplied label ("periodic", "before_experiment", ...).
    pub label: String,
    /// Tick the snapshot was taken at.
    pub tick: u64,
    /// Global seed; together with `tick` this pins all RNG substreams.
    pub seed: u64,
    /// Layout version for forward compatibility.
    pub format_version: u32,
    /// 64-bit content hash over the canonical serialized body.
    pub content_hash: u64,
}

/// Five-trait personality, fixed at agent creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalitySnapshot {
    pub openness: f32,
    pub conscientiousness: f32,
    pub extraversion: f32,
    pub agreeableness: f32,
    pub stability: f32,
}

/// Four-axis mutable ideology, each axis in [-1, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdeologySnapshot {
    pub tradition: f32,
    pub openness_axis: f32,
    pub hierarchy: f32,
    pub mysticism: f32,
}

/// One concept's lexicon entry: the current term plus displaced terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LexiconEntrySnapshot {
    pub term: String,
    /// Prior terms with the tick each was displaced, oldest first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<(String, u64)>,
}

/// Full per-agent state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub agent_id: String,
    pub name: String,
    pub personality: PersonalitySnapshot,
    pub ideology: IdeologySnapshot,
    /// Peer ID -> trust scalar in [-1, 1].
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub trust: BTreeMap<String, f32>,
    /// Resource kind -> non-negative quantity.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub inventory: BTreeMap<ResourceKind, u32>,
    /// Concept -> current term and drift history.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub lexicon: BTreeMap<String, LexiconEntrySnapshot>,
    pub region: String,
    pub alive: bool,
}

/// A directed relationship edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipSnapshot {
    pub from: String,
    pub to: String,
    /// "trust", "alliance", "rivalry", or "kinship".
    pub kind: String,
    pub weight: f32,
    pub last_updated_tick: u64,
}

/// A myth artifact and its lifecycle position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MythSnapshot {
    pub myth_id: String,
    pub originators: Vec<String>,
    pub summary: String,
    /// "proposed", "contested", "canonical", or "forgotten".
    pub status: String,
    pub support: u32,
    pub believers: Vec<String>,
    pub created_tick: u64,
    pub last_reinforced_tick: u64,
    pub window_start_tick: u64,
}

/// A norm artifact and its referendum state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormSnapshot {
    pub norm_id: String,
    /// Behavior the norm constrains, e.g. "share_surplus".
    pub topic: String,
    pub status: String,
    pub support_weight: f32,
    pub adherents: Vec<String>,
    pub created_tick: u64,
    pub last_reinforced_tick: u64,
}

/// Shared culture state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CultureSnapshot {
    #[serde(default)]
    pub myths: Vec<MythSnapshot>,
    #[serde(default)]
    pub norms: Vec<NormSnapshot>,
    /// Concept -> term -> number of agents currently using the term.
    #[serde(default)]
    pub term_distribution: BTreeMap<String, BTreeMap<String, u32>>,
    /// Distribution captured at initialization, the drift baseline.
    #[serde(default)]
    pub baseline_distribution: BTreeMap<String, BTreeMap<String, u32>>,
    /// Current population-level language divergence in [0, 1].
    #[serde(default)]
    pub divergence: f32,
    /// Residual sentiment stability modifier, decaying toward 0.
    #[serde(default)]
    pub sentiment_modifier: f32,
    /// Counter backing myth/norm ID assignment.
    #[serde(default)]
    pub next_artifact_id: u64,
}

/// The full world snapshot document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub meta: SnapshotMeta,
    /// Agents sorted by agent_id.
    pub agents: Vec<AgentSnapshot>,
    /// Edges sorted by (from, to, kind).
    pub relationships: Vec<RelationshipSnapshot>,
    pub culture: CultureSnapshot,
    /// Global resource pools (the environmental injection source).
    pub global_resources: BTreeMap<ResourceKind, u64>,
    /// Episodic log up to the snapshot tick.
    pub events: Vec<Event>,
    /// Next event counter, so resumed runs continue the ID sequence.
    pub next_event_counter: u64,
}

/// A single culture transition reported in a tick result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CultureChange {
    pub artifact_id: String,
    /// "myth" or "norm".
    pub artifact: String,
    /// Transition, e.g. "proposed", "canonized", "forgotten", "adopted".
    pub change: String,
}

/// Per-tick economy totals.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EconomySummary {
    pub trades_executed: u32,
    pub failed_sessions: u32,
    pub expired_sessions: u32,
    /// Units moved per resource kind (bilateral + market).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub volume: BTreeMap<ResourceKind, u32>,
    /// Clearing price per resource kind, where the auction crossed.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub clearing_prices: BTreeMap<ResourceKind, f32>,
}

/// What one `advance_tick` call produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickResult {
    pub tick: u64,
    pub events_emitted: u64,
    pub rejected_stimuli: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub culture_changes: Vec<CultureChange>,
    pub economy_summary: EconomySummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn economy_summary_defaults_are_empty() {
        let summary = EconomySummary::default();
        assert_eq!(summary.trades_executed, 0);
        assert!(summary.volume.is_empty());
        let json = serde_json::to_string(&summary).unwrap();
        assert!(!json.contains("volume"));
    }

    #[test]
    fn agent_snapshot_round_trips() {
        let agent = AgentSnapshot {
            agent_id: "agent_0001".to_string(),
            name: "Sable".to_string(),
            personality: PersonalitySnapshot {
                openness: 0.5,
                conscientiousness: 0.5,
                extraversion: 0.5,
                agreeableness: 0.5,
                stability: 0.5,
            },
            ideology: IdeologySnapshot {
                tradition: 0.0,
                openness_axis: 0.0,
                hierarchy: 0.0,
                mysticism: 0.0,
            },
            trust: BTreeMap::from([("agent_0002".to_string(), 0.25)]),
            inventory: BTreeMap::from([(ResourceKind::Grain, 12)]),
            lexicon: BTreeMap::new(),
            region: "amber_vale".to_string(),
            alive: true,
        };
        let json = serde_json::to_string(&agent).unwrap();
        let back: AgentSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, agent);
    }
}
