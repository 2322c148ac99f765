//! State Views
//!
//! Read-only projections of world state for visualization and external
//! consumers. Views reuse the snapshot structs but never mutate anything
//! and can be filtered down to a region or an explicit agent set.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

use cog_events::snapshot::{AgentSnapshot, MythSnapshot, NormSnapshot, RelationshipSnapshot};

use crate::components::culture::CultureState;
use crate::components::world::WorldClock;
use crate::memory::MemoryStore;
use crate::snapshot::{collect_agents, collect_culture, collect_relationships};

/// Filters narrowing a state view.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ViewFilters {
    /// Restrict agents to one region.
    pub region: Option<String>,
    /// Restrict agents to an explicit id set.
    pub agent_ids: Option<Vec<String>>,
    /// Drop deactivated agents from the view.
    pub active_only: bool,
    /// Include the relationship edge table.
    pub include_relationships: bool,
    /// Include culture artifacts.
    pub include_culture: bool,
}

impl ViewFilters {
    /// Everything, including historical (deactivated) agents.
    pub fn everything() -> Self {
        Self {
            region: None,
            agent_ids: None,
            active_only: false,
            include_relationships: true,
            include_culture: true,
        }
    }

    fn keeps(&self, agent: &AgentSnapshot) -> bool {
        if self.active_only && !agent.alive {
            return false;
        }
        if let Some(region) = &self.region {
            if &agent.region != region {
                return false;
            }
        }
        if let Some(ids) = &self.agent_ids {
            if !ids.contains(&agent.agent_id) {
                return false;
            }
        }
        true
    }
}

/// A read-only projection of the world.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateView {
    pub tick: u64,
    pub divergence: f32,
    pub agents: Vec<AgentSnapshot>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relationships: Vec<RelationshipSnapshot>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub myths: Vec<MythSnapshot>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub norms: Vec<NormSnapshot>,
}

/// Builds a filtered view of the current world state.
pub fn build_state_view(world: &mut World, filters: &ViewFilters) -> StateView {
    let agents: Vec<AgentSnapshot> = collect_agents(world)
        .into_iter()
        .filter(|agent| filters.keeps(agent))
        .collect();

    let tick = world.resource::<WorldClock>().tick;
    let culture_state = world.resource::<CultureState>();
    let divergence = culture_state.divergence;

    let (myths, norms) = if filters.include_culture {
        let culture = collect_culture(culture_state);
        (culture.myths, culture.norms)
    } else {
        (Vec::new(), Vec::new())
    };

    let relationships = if filters.include_relationships {
        let kept: std::collections::BTreeSet<&String> =
            agents.iter().map(|a| &a.agent_id).collect();
        collect_relationships(world.resource::<MemoryStore>())
            .into_iter()
            .filter(|edge| kept.contains(&edge.from) && kept.contains(&edge.to))
            .collect()
    } else {
        Vec::new()
    };

    StateView {
        tick,
        divergence,
        agents,
        relationships,
        myths,
        norms,
    }
}
