//! Culture Components
//!
//! Shared culture artifacts: myths, norms, the population term
//! distribution, and the language divergence metric.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::components::agent::Ideology;

/// Lifecycle status of a culture artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactStatus {
    Proposed,
    Contested,
    Canonical,
    Forgotten,
}

impl ArtifactStatus {
    pub fn name(&self) -> &'static str {
        match self {
            ArtifactStatus::Proposed => "proposed",
            ArtifactStatus::Contested => "contested",
            ArtifactStatus::Canonical => "canonical",
            ArtifactStatus::Forgotten => "forgotten",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "proposed" => Some(ArtifactStatus::Proposed),
            "contested" => Some(ArtifactStatus::Contested),
            "canonical" => Some(ArtifactStatus::Canonical),
            "forgotten" => Some(ArtifactStatus::Forgotten),
            _ => None,
        }
    }
}

/// A myth and its canonization state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Myth {
    pub id: String,
    pub originators: Vec<String>,
    pub summary: String,
    pub status: ArtifactStatus,
    /// Agents currently holding the myth, in id order.
    pub believers: BTreeSet<String>,
    pub created_tick: u64,
    pub last_reinforced_tick: u64,
    /// Start of the rolling canonization window.
    pub window_start_tick: u64,
}

impl Myth {
    pub fn new(
        id: impl Into<String>,
        originator: impl Into<String>,
        summary: impl Into<String>,
        tick: u64,
    ) -> Self {
        let originator = originator.into();
        let mut believers = BTreeSet::new();
        believers.insert(originator.clone());
        Self {
            id: id.into(),
            originators: vec![originator],
            summary: summary.into(),
            status: ArtifactStatus::Proposed,
            believers,
            created_tick: tick,
            last_reinforced_tick: tick,
            window_start_tick: tick,
        }
    }

    pub fn support(&self) -> u32 {
        self.believers.len() as u32
    }

    /// Registers a believer; returns true if the agent was new.
    pub fn reinforce(&mut self, agent_id: &str, tick: u64) -> bool {
        self.last_reinforced_tick = tick;
        self.believers.insert(agent_id.to_string())
    }
}

/// Behaviors a norm can constrain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormTopic {
    /// Hoarding beyond a surplus threshold is sanctioned.
    ShareSurplus,
    /// Letting a negotiation expire as initiator is sanctioned.
    HonorDeals,
    /// Trading outside one's own region is sanctioned.
    ShunOutsiders,
}

impl NormTopic {
    pub fn all() -> &'static [NormTopic] {
        &[
            NormTopic::ShareSurplus,
            NormTopic::HonorDeals,
            NormTopic::ShunOutsiders,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            NormTopic::ShareSurplus => "share_surplus",
            NormTopic::HonorDeals => "honor_deals",
            NormTopic::ShunOutsiders => "shun_outsiders",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "share_surplus" => Some(NormTopic::ShareSurplus),
            "honor_deals" => Some(NormTopic::HonorDeals),
            "shun_outsiders" => Some(NormTopic::ShunOutsiders),
            _ => None,
        }
    }

    /// The ideology direction this topic appeals to; vote weight is the
    /// voter's alignment with this vector.
    pub fn appeal(&self) -> Ideology {
        match self {
            NormTopic::ShareSurplus => Ideology::new(0.4, 0.3, -0.2, 0.1),
            NormTopic::HonorDeals => Ideology::new(0.5, 0.0, 0.3, 0.0),
            NormTopic::ShunOutsiders => Ideology::new(0.3, -0.6, 0.2, 0.1),
        }
    }
}

/// A norm and its referendum state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Norm {
    pub id: String,
    pub topic: NormTopic,
    pub status: ArtifactStatus,
    /// Net ideology-weighted support from the last referendum.
    pub support_weight: f32,
    /// Agents adhering to the norm, in id order.
    pub adherents: BTreeSet<String>,
    pub created_tick: u64,
    pub last_reinforced_tick: u64,
}

impl Norm {
    pub fn new(id: impl Into<String>, topic: NormTopic, proposer: &str, tick: u64) -> Self {
        let mut adherents = BTreeSet::new();
        adherents.insert(proposer.to_string());
        Self {
            id: id.into(),
            topic,
            status: ArtifactStatus::Proposed,
            support_weight: 0.0,
            adherents,
            created_tick: tick,
            last_reinforced_tick: tick,
        }
    }

    /// Registers an adherent; returns true if the agent was new.
    pub fn reinforce(&mut self, agent_id: &str, tick: u64) -> bool {
        self.last_reinforced_tick = tick;
        self.adherents.insert(agent_id.to_string())
    }
}

/// Resource: all shared culture state.
#[derive(Resource, Debug, Clone, Default)]
pub struct CultureState {
    myths: BTreeMap<String, Myth>,
    norms: BTreeMap<String, Norm>,
    /// Concept -> term -> count of active agents using the term.
    pub term_distribution: BTreeMap<String, BTreeMap<String, u32>>,
    /// Term distribution captured at initialization.
    pub baseline_distribution: BTreeMap<String, BTreeMap<String, u32>>,
    /// Current population divergence from the baseline, in [0, 1].
    pub divergence: f32,
    /// Transient stability modifier from sentiment stimuli, bounded.
    pub sentiment_modifier: f32,
    next_artifact_id: u64,
}

impl CultureState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_myth_id(&mut self) -> String {
        let id = format!("myth_{:04}", self.next_artifact_id);
        self.next_artifact_id += 1;
        id
    }

    pub fn next_norm_id(&mut self) -> String {
        let id = format!("norm_{:04}", self.next_artifact_id);
        self.next_artifact_id += 1;
        id
    }

    pub fn insert_myth(&mut self, myth: Myth) {
        self.myths.insert(myth.id.clone(), myth);
    }

    pub fn insert_norm(&mut self, norm: Norm) {
        self.norms.insert(norm.id.clone(), norm);
    }

    pub fn myth(&self, id: &str) -> Option<&Myth> {
        self.myths.get(id)
    }

    pub fn myth_mut(&mut self, id: &str) -> Option<&mut Myth> {
        self.myths.get_mut(id)
    }

    pub fn norm(&self, id: &str) -> Option<&Norm> {
        self.norms.get(id)
    }

    pub fn norm_mut(&mut self, id: &str) -> Option<&mut Norm> {
        self.norms.get_mut(id)
    }

    /// Myths in id order.
    pub fn myths(&self) -> impl Iterator<Item = &Myth> {
        self.myths.values()
    }

    pub fn myths_mut(&mut self) -> impl Iterator<Item = &mut Myth> {
        self.myths.values_mut()
    }

    /// Norms in id order.
    pub fn norms(&self) -> impl Iterator<Item = &Norm> {
        self.norms.values()
    }

    pub fn norms_mut(&mut self) -> impl Iterator<Item = &mut Norm> {
        self.norms.values_mut()
    }

    /// An existing non-forgotten norm on the topic, if any.
    pub fn active_norm_for_topic(&self, topic: NormTopic) -> Option<&Norm> {
        self.norms
            .values()
            .find(|n| n.topic == topic && n.status != ArtifactStatus::Forgotten)
    }

    /// Adopted (canonical) norms in id order.
    pub fn adopted_norms(&self) -> impl Iterator<Item = &Norm> {
        self.norms
            .values()
            .filter(|n| n.status == ArtifactStatus::Canonical)
    }

    pub fn restore_counter(&mut self, next_artifact_id: u64) {
        self.next_artifact_id = next_artifact_id;
    }

    pub fn artifact_counter(&self) -> u64 {
        self.next_artifact_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn myth_reinforcement_counts_unique_believers() {
        let mut myth = Myth::new("myth_0000", "agent_0001", "the sky split", 3);
        assert_eq!(myth.support(), 1);
        assert!(myth.reinforce("agent_0002", 5));
        assert!(!myth.reinforce("agent_0002", 6));
        assert_eq!(myth.support(), 2);
        assert_eq!(myth.last_reinforced_tick, 6);
    }

    #[test]
    fn artifact_ids_are_sequential() {
        let mut culture = CultureState::new();
        assert_eq!(culture.next_myth_id(), "myth_0000");
        assert_eq!(culture.next_norm_id(), "norm_0001");
        assert_eq!(culture.artifact_counter(), 2);
    }

    #[test]
    fn status_names_round_trip() {
        for status in [
            ArtifactStatus::Proposed,
            ArtifactStatus::Contested,
            ArtifactStatus::Canonical,
            ArtifactStatus::Forgotten,
        ] {
            assert_eq!(ArtifactStatus::from_name(status.name()), Some(status));
        }
    }
}
