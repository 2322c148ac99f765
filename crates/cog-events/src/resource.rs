//! Resource Kinds
//!
//! The tradeable resource vocabulary shared by inventories, market orders,
//! and event payloads.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A kind of tradeable resource.
///
/// Quantities are always non-negative integers; resources enter the world
/// only through environmental injection and are conserved by trade.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Grain,
    Ore,
    Cloth,
    Relic,
}

impl ResourceKind {
    /// All resource kinds in canonical order.
    pub fn all() -> &'static [ResourceKind] {
        &[
            ResourceKind::Grain,
            ResourceKind::Ore,
            ResourceKind::Cloth,
            ResourceKind::Relic,
        ]
    }

    /// Stable string name, matching the serialized form.
    pub fn name(&self) -> &'static str {
        match self {
            ResourceKind::Grain => "grain",
            ResourceKind::Ore => "ore",
            ResourceKind::Cloth => "cloth",
            ResourceKind::Relic => "relic",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "grain" => Ok(ResourceKind::Grain),
            "ore" => Ok(ResourceKind::Ore),
            "cloth" => Ok(ResourceKind::Cloth),
            "relic" => Ok(ResourceKind::Relic),
            other => Err(format!("unknown resource kind: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_name() {
        for kind in ResourceKind::all() {
            assert_eq!(kind.name().parse::<ResourceKind>().unwrap(), *kind);
        }
    }

    #[test]
    fn canonical_order_is_stable() {
        let mut sorted = ResourceKind::all().to_vec();
        sorted.sort();
        assert_eq!(sorted.as_slice(), ResourceKind::all());
    }
}
