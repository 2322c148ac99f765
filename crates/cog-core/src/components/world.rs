//! World Resources
//!
//! The world clock, the region map, and the global resource pools.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use cog_events::ResourceKind;

/// Region identifiers in canonical order, arranged in a ring.
pub const REGIONS: &[&str] = &["amber_vale", "cinder_reach", "glass_shoals", "hollow_crown"];

/// Regions adjacent to the given one (ring topology).
pub fn adjacent_regions(region: &str) -> Vec<&'static str> {
    let Some(index) = REGIONS.iter().position(|r| *r == region) else {
        return Vec::new();
    };
    let len = REGIONS.len();
    let mut out = vec![REGIONS[(index + len - 1) % len], REGIONS[(index + 1) % len]];
    out.sort();
    out.dedup();
    out
}

/// Resource: the simulation clock and seed.
///
/// Owned by the scheduler; engines read it but only `advance` moves it.
#[derive(Resource, Debug, Clone, Serialize, Deserialize)]
pub struct WorldClock {
    pub tick: u64,
    pub seed: u64,
}

impl WorldClock {
    pub fn new(seed: u64) -> Self {
        Self { tick: 0, seed }
    }

    pub fn advance(&mut self) {
        self.tick += 1;
    }
}

/// Resource: world-level resource pools.
///
/// The only source and sink of resources outside agent-to-agent trade;
/// environmental stimuli inject into or drain from these pools.
#[derive(Resource, Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalResources {
    pools: BTreeMap<ResourceKind, u64>,
}

impl GlobalResources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn uniform(quantity: u64) -> Self {
        let mut pools = BTreeMap::new();
        for kind in ResourceKind::all() {
            pools.insert(*kind, quantity);
        }
        Self { pools }
    }

    pub fn quantity(&self, kind: ResourceKind) -> u64 {
        self.pools.get(&kind).copied().unwrap_or(0)
    }

    pub fn inject(&mut self, kind: ResourceKind, quantity: u64) {
        *self.pools.entry(kind).or_insert(0) += quantity;
    }

    /// Drains up to `quantity`, returning what was actually removed.
    pub fn drain(&mut self, kind: ResourceKind, quantity: u64) -> u64 {
        let pool = self.pools.entry(kind).or_insert(0);
        let taken = quantity.min(*pool);
        *pool -= taken;
        taken
    }

    pub fn iter(&self) -> impl Iterator<Item = (ResourceKind, u64)> + '_ {
        self.pools.iter().map(|(k, v)| (*k, *v))
    }

    pub fn as_map(&self) -> BTreeMap<ResourceKind, u64> {
        self.pools.clone()
    }

    pub fn set_all(&mut self, pools: BTreeMap<ResourceKind, u64>) {
        self.pools = pools;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_adjacency_is_symmetric() {
        for region in REGIONS {
            for neighbor in adjacent_regions(region) {
                assert!(
                    adjacent_regions(neighbor).contains(region),
                    "{} -> {} not symmetric",
                    region,
                    neighbor
                );
            }
        }
    }

    #[test]
    fn drain_never_goes_negative() {
        let mut pools = GlobalResources::uniform(5);
        assert_eq!(pools.drain(ResourceKind::Grain, 8), 5);
        assert_eq!(pools.quantity(ResourceKind::Grain), 0);
    }
}
