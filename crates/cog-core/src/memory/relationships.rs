//! Relationship Graph
//!
//! Directed social edges between agents. Edges are created by interaction
//! outcomes, never deleted; absent reinforcement their weights decay
//! toward neutral. Writing an edge ensures the reverse edge exists, so
//! edge existence is symmetric while weights stay asymmetric.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Relationship edge kinds.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    Trust,
    Alliance,
    Rivalry,
    Kinship,
}

impl EdgeKind {
    pub fn all() -> &'static [EdgeKind] {
        &[
            EdgeKind::Trust,
            EdgeKind::Alliance,
            EdgeKind::Rivalry,
            EdgeKind::Kinship,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            EdgeKind::Trust => "trust",
            EdgeKind::Alliance => "alliance",
            EdgeKind::Rivalry => "rivalry",
            EdgeKind::Kinship => "kinship",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "trust" => Some(EdgeKind::Trust),
            "alliance" => Some(EdgeKind::Alliance),
            "rivalry" => Some(EdgeKind::Rivalry),
            "kinship" => Some(EdgeKind::Kinship),
            _ => None,
        }
    }
}

/// A directed edge's payload.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelationshipEdge {
    pub weight: f32,
    pub last_updated_tick: u64,
}

/// Graph of directed edges keyed by (from, to, kind).
#[derive(Debug, Clone, Default)]
pub struct RelationshipGraph {
    edges: BTreeMap<(String, String, EdgeKind), RelationshipEdge>,
}

impl RelationshipGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the weight of an edge, creating it (and its neutral reverse)
    /// if absent. Weights are clamped to [-1, 1].
    pub fn set_weight(&mut self, from: &str, to: &str, kind: EdgeKind, weight: f32, tick: u64) {
        let key = (from.to_string(), to.to_string(), kind);
        self.edges.insert(
            key,
            RelationshipEdge {
                weight: weight.clamp(-1.0, 1.0),
                last_updated_tick: tick,
            },
        );
        let reverse = (to.to_string(), from.to_string(), kind);
        self.edges.entry(reverse).or_insert(RelationshipEdge {
            weight: 0.0,
            last_updated_tick: tick,
        });
    }

    /// Adds a bounded delta to an edge weight (creating the pair if
    /// absent) and stamps the update tick.
    pub fn adjust(&mut self, from: &str, to: &str, kind: EdgeKind, delta: f32, tick: u64) {
        let current = self.weight(from, to, kind);
        self.set_weight(from, to, kind, current + delta, tick);
    }

    pub fn get(&self, from: &str, to: &str, kind: EdgeKind) -> Option<&RelationshipEdge> {
        self.edges
            .get(&(from.to_string(), to.to_string(), kind))
    }

    pub fn weight(&self, from: &str, to: &str, kind: EdgeKind) -> f32 {
        self.get(from, to, kind).map(|e| e.weight).unwrap_or(0.0)
    }

    /// All outgoing edges of an agent, in (to, kind) order.
    pub fn edges_from<'a>(
        &'a self,
        agent_id: &'a str,
    ) -> impl Iterator<Item = (&'a str, EdgeKind, &'a RelationshipEdge)> {
        self.edges
            .range(
                (
                    agent_id.to_string(),
                    String::new(),
                    EdgeKind::Trust,
                )..,
            )
            .take_while(move |((from, _, _), _)| from.as_str() == agent_id)
            .map(|((_, to, kind), edge)| (to.as_str(), *kind, edge))
    }

    /// All edges in (from, to, kind) order.
    pub fn iter(
        &self,
    ) -> impl Iterator<Item = (&str, &str, EdgeKind, &RelationshipEdge)> {
        self.edges
            .iter()
            .map(|((from, to, kind), edge)| (from.as_str(), to.as_str(), *kind, edge))
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Moves every weight toward 0 by `rate` of its magnitude. Decay never
    /// flips a sign and does not count as an update for staleness.
    pub fn decay_toward_neutral(&mut self, rate: f32) {
        for edge in self.edges.values_mut() {
            edge.weight -= edge.weight * rate;
            if edge.weight.abs() < 1e-4 {
                edge.weight = 0.0;
            }
        }
    }

    /// Replaces all edges (restore path only).
    pub fn replace(&mut self, edges: BTreeMap<(String, String, EdgeKind), RelationshipEdge>) {
        self.edges = edges;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writing_an_edge_creates_the_reverse() {
        let mut graph = RelationshipGraph::new();
        graph.set_weight("agent_0001", "agent_0002", EdgeKind::Trust, 0.5, 3);
        assert_eq!(graph.weight("agent_0001", "agent_0002", EdgeKind::Trust), 0.5);
        assert!(graph.get("agent_0002", "agent_0001", EdgeKind::Trust).is_some());
        assert_eq!(graph.weight("agent_0002", "agent_0001", EdgeKind::Trust), 0.0);
    }

    #[test]
    fn weights_are_clamped() {
        let mut graph = RelationshipGraph::new();
        graph.set_weight("agent_0001", "agent_0002", EdgeKind::Rivalry, -3.0, 1);
        assert_eq!(
            graph.weight("agent_0001", "agent_0002", EdgeKind::Rivalry),
            -1.0
        );
    }

    #[test]
    fn decay_moves_toward_zero_without_sign_flip() {
        let mut graph = RelationshipGraph::new();
        graph.set_weight("agent_0001", "agent_0002", EdgeKind::Trust, 0.8, 1);
        graph.set_weight("agent_0003", "agent_0004", EdgeKind::Rivalry, -0.8, 1);
        for _ in 0..50 {
            graph.decay_toward_neutral(0.1);
        }
        let positive = graph.weight("agent_0001", "agent_0002", EdgeKind::Trust);
        let negative = graph.weight("agent_0003", "agent_0004", EdgeKind::Rivalry);
        assert!(positive >= 0.0 && positive < 0.01);
        assert!(negative <= 0.0 && negative > -0.01);
    }

    #[test]
    fn edges_from_is_scoped_to_one_agent() {
        let mut graph = RelationshipGraph::new();
        graph.set_weight("agent_0001", "agent_0002", EdgeKind::Trust, 0.1, 1);
        graph.set_weight("agent_0001", "agent_0003", EdgeKind::Kinship, 0.9, 1);
        graph.set_weight("agent_0002", "agent_0003", EdgeKind::Trust, 0.2, 1);
        let from_one: Vec<_> = graph.edges_from("agent_0001").collect();
        assert_eq!(from_one.len(), 2);
        assert!(from_one.iter().all(|(to, _, _)| *to != "agent_0001"));
    }
}
