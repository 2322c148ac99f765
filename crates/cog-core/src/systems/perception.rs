//! Perception System
//!
//! Rebuilds each agent's awareness of co-resident neighbors at the start
//! of every tick. Perception is a pure read of world state; it writes only
//! the derived index and per-agent visibility lists.

use bevy_ecs::prelude::*;
use std::collections::BTreeMap;

use crate::components::agent::{AgentId, Alive, Region};

/// Component tracking which agents an agent can perceive.
#[derive(Component, Debug, Clone, Default)]
pub struct VisibleNeighbors {
    /// Agent IDs sharing the region, sorted, excluding self.
    pub agents: Vec<String>,
}

impl VisibleNeighbors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn can_see(&self, agent_id: &str) -> bool {
        self.agents.iter().any(|id| id == agent_id)
    }

    pub fn count(&self) -> usize {
        self.agents.len()
    }

    pub fn is_alone(&self) -> bool {
        self.agents.is_empty()
    }
}

/// Resource tracking active agents by region for efficient lookups.
#[derive(Resource, Debug, Default)]
pub struct RegionIndex {
    regions: BTreeMap<String, Vec<String>>,
}

impl RegionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Active agents resident in a region, sorted by id.
    pub fn residents(&self, region: &str) -> &[String] {
        self.regions
            .get(region)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn count_in(&self, region: &str) -> usize {
        self.residents(region).len()
    }

    /// Total active agents across all regions.
    pub fn active_count(&self) -> usize {
        self.regions.values().map(|v| v.len()).sum()
    }

    pub fn clear(&mut self) {
        self.regions.clear();
    }

    pub fn add(&mut self, region: impl Into<String>, agent_id: impl Into<String>) {
        self.regions
            .entry(region.into())
            .or_default()
            .push(agent_id.into());
    }

    fn sort(&mut self) {
        for residents in self.regions.values_mut() {
            residents.sort();
        }
    }
}

/// System: rebuild the region index from current positions.
pub fn rebuild_region_index(
    mut index: ResMut<RegionIndex>,
    query: Query<(&AgentId, &Region, &Alive)>,
) {
    index.clear();
    for (agent_id, region, alive) in query.iter() {
        if alive.is_alive() {
            index.add(region.0.clone(), agent_id.0.clone());
        }
    }
    index.sort();
}

/// System: refresh each agent's visible-neighbor list.
pub fn update_visible_neighbors(
    index: Res<RegionIndex>,
    mut query: Query<(&AgentId, &Region, &Alive, &mut VisibleNeighbors)>,
) {
    for (agent_id, region, alive, mut visible) in query.iter_mut() {
        visible.agents.clear();
        if !alive.is_alive() {
            continue;
        }
        visible.agents.extend(
            index
                .residents(&region.0)
                .iter()
                .filter(|id| *id != &agent_id.0)
                .cloned(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn residents_are_sorted() {
        let mut index = RegionIndex::new();
        index.add("amber_vale", "agent_0009");
        index.add("amber_vale", "agent_0001");
        index.sort();
        assert_eq!(index.residents("amber_vale"), ["agent_0001", "agent_0009"]);
        assert!(index.residents("missing").is_empty());
    }
}
