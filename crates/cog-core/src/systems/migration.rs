//! Migration
//!
//! Applies the tick's migrate proposals after the culture commit. Only
//! moves to adjacent regions are honored; anything else is dropped
//! quietly (the proposal was stale by commit time).

use bevy_ecs::prelude::*;

use cog_events::{EventPayload, EventSubtype, EventType};

use crate::components::agent::{AgentId, Alive, Region};
use crate::components::world::adjacent_regions;
use crate::events::TickEvents;
use crate::systems::action::ActionQueue;

/// System: move agents between regions.
pub fn apply_migrations(
    mut actions: ResMut<ActionQueue>,
    mut tick_events: ResMut<TickEvents>,
    mut query: Query<(&AgentId, &mut Region, &Alive)>,
) {
    let migrations = actions.take_migrations();
    // The tick is over for the action queue; drop leftover idles.
    actions.clear();
    if migrations.is_empty() {
        return;
    }

    for (agent_id, to_region) in migrations {
        for (candidate_id, mut region, alive) in query.iter_mut() {
            if candidate_id.0 != agent_id || !alive.is_alive() {
                continue;
            }
            if !adjacent_regions(&region.0).contains(&to_region.as_str()) {
                break;
            }
            let from_region = region.0.clone();
            region.0 = to_region.clone();
            tick_events.emit(
                EventType::Migration,
                EventSubtype::Moved,
                vec![agent_id.clone()],
                EventPayload::Migration {
                    from_region,
                    to_region: to_region.clone(),
                },
            );
            break;
        }
    }
}
