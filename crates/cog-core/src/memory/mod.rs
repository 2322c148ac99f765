//! Memory Store
//!
//! The durable substrate for episodic, semantic, and social state. Other
//! engine phases read it through the query methods and write through the
//! commit path; snapshot/restore serializes all three sub-stores together
//! so they stay versioned as one unit.

pub mod episodic;
pub mod relationships;
pub mod semantic;

use bevy_ecs::prelude::*;
use std::collections::BTreeMap;

use cog_events::Event;

pub use episodic::EpisodicLog;
pub use relationships::{EdgeKind, RelationshipEdge, RelationshipGraph};
pub use semantic::{cosine, embed, SemanticIndex, EMBED_DIM};

/// Resource: the shared memory store.
#[derive(Resource, Debug, Clone, Default)]
pub struct MemoryStore {
    pub episodic: EpisodicLog,
    pub relationships: RelationshipGraph,
    pub semantic: SemanticIndex,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commits a tick's event batch, append-only.
    pub fn write_events(&mut self, batch: Vec<Event>) {
        self.episodic.append_batch(batch);
    }

    /// All relationship edges leaving the agent, in (to, kind) order.
    pub fn query_relationships<'a>(
        &'a self,
        agent_id: &'a str,
    ) -> impl Iterator<Item = (&'a str, EdgeKind, &'a RelationshipEdge)> {
        self.relationships.edges_from(agent_id)
    }

    /// Events involving the agent within the trailing window.
    pub fn query_recent_events(
        &self,
        agent_id: &str,
        window: u64,
        current_tick: u64,
    ) -> Vec<&Event> {
        self.episodic.recent_for(agent_id, window, current_tick)
    }

    /// K nearest indexed artifacts to a text query.
    pub fn semantic_search(&self, query: &str, k: usize) -> Vec<(String, f32)> {
        self.semantic.search_text(query, k)
    }

    /// Serializable view of the relationship edges, sorted.
    pub fn edge_table(&self) -> Vec<(String, String, EdgeKind, RelationshipEdge)> {
        self.relationships
            .iter()
            .map(|(from, to, kind, edge)| (from.to_string(), to.to_string(), kind, *edge))
            .collect()
    }

    /// Rebuilds the store from restored parts.
    pub fn restore_from(
        &mut self,
        events: Vec<Event>,
        edges: BTreeMap<(String, String, EdgeKind), RelationshipEdge>,
        semantic_entries: Vec<(String, String)>,
    ) {
        self.episodic.replace(events);
        self.relationships.replace(edges);
        self.semantic.replace(semantic_entries);
    }
}
