//! Memory Commit
//!
//! Drains the tick's event queue into the episodic log as one ordered
//! batch. Runs last so every phase's events land in a single commit.

use bevy_ecs::prelude::*;

use crate::events::TickEvents;
use crate::memory::MemoryStore;

/// System: commit the tick's events to the memory store.
pub fn commit_memory(mut tick_events: ResMut<TickEvents>, mut store: ResMut<MemoryStore>) {
    let batch = tick_events.drain();
    if batch.is_empty() {
        return;
    }
    store.write_events(batch);
}
