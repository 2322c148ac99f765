//! Decay
//!
//! End-of-tick relaxation: relationship edges drift toward neutral and
//! the transient sentiment modifier fades. Culture retention windows are
//! handled by the culture engine itself.

use bevy_ecs::prelude::*;

use crate::components::culture::CultureState;
use crate::config::Config;
use crate::memory::MemoryStore;

/// Per-tick multiplier applied to the sentiment modifier.
pub const SENTIMENT_DECAY: f32 = 0.9;

/// System: apply per-tick decay.
pub fn decay_relationships(
    config: Res<Config>,
    mut store: ResMut<MemoryStore>,
    mut culture: ResMut<CultureState>,
) {
    store
        .relationships
        .decay_toward_neutral(config.trust.edge_decay_rate);
    culture.sentiment_modifier *= SENTIMENT_DECAY;
    if culture.sentiment_modifier.abs() < 1e-4 {
        culture.sentiment_modifier = 0.0;
    }
}
