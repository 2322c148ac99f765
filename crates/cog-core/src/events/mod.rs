//! Event Emission
//!
//! The per-tick event queue and the JSONL event logger. Systems emit
//! events into `TickEvents` during the tick; the memory-commit phase
//! drains the queue into the episodic log as one ordered batch.

pub mod logger;

use bevy_ecs::prelude::*;

use cog_events::{Event, EventPayload, EventSubtype, EventType, SimTimestamp};
use cog_events::timestamp::format_event_id;

pub use logger::EventLogger;

/// Resource: events generated during the current tick.
///
/// Owns the global event counter so IDs stay monotone across ticks and
/// survive snapshot/restore.
#[derive(Resource, Debug, Default)]
pub struct TickEvents {
    current_tick: u64,
    sequence: u64,
    next_event_id: u64,
    events: Vec<Event>,
}

impl TickEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets the per-tick sequence at the start of a tick.
    pub fn begin_tick(&mut self, tick: u64) {
        self.current_tick = tick;
        self.sequence = 0;
    }

    /// Emits an event, assigning its ID and (tick, sequence) timestamp.
    /// Returns the assigned event ID for causal linking.
    pub fn emit(
        &mut self,
        event_type: EventType,
        subtype: EventSubtype,
        actors: Vec<String>,
        payload: EventPayload,
    ) -> String {
        self.emit_with_causes(event_type, subtype, actors, payload, Vec::new())
    }

    /// Emits an event with causal links to prior events.
    pub fn emit_with_causes(
        &mut self,
        event_type: EventType,
        subtype: EventSubtype,
        actors: Vec<String>,
        payload: EventPayload,
        causes: Vec<String>,
    ) -> String {
        debug_assert!(event_type.is_valid_subtype(subtype));
        let event_id = format_event_id(self.next_event_id);
        self.next_event_id += 1;
        let event = Event::new(
            event_id.clone(),
            SimTimestamp::new(self.current_tick, self.sequence),
            event_type,
            subtype,
            actors,
            payload,
        )
        .with_causes(causes);
        self.sequence += 1;
        self.events.push(event);
        event_id
    }

    /// Drains the tick's events for the memory commit.
    pub fn drain(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// The global counter, persisted in snapshots.
    pub fn counter(&self) -> u64 {
        self.next_event_id
    }

    /// Restores the global counter (restore path only).
    pub fn set_counter(&mut self, counter: u64) {
        self.next_event_id = counter;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_monotone_across_ticks() {
        let mut queue = TickEvents::new();
        queue.begin_tick(1);
        let first = queue.emit(
            EventType::Migration,
            EventSubtype::Moved,
            vec!["agent_0001".to_string()],
            EventPayload::None,
        );
        queue.drain();
        queue.begin_tick(2);
        let second = queue.emit(
            EventType::Migration,
            EventSubtype::Moved,
            vec!["agent_0001".to_string()],
            EventPayload::None,
        );
        assert_eq!(first, "evt_00000000");
        assert_eq!(second, "evt_00000001");
    }

    #[test]
    fn sequence_resets_each_tick() {
        let mut queue = TickEvents::new();
        queue.begin_tick(4);
        queue.emit(
            EventType::Lifecycle,
            EventSubtype::Born,
            vec!["agent_0001".to_string()],
            EventPayload::None,
        );
        queue.emit(
            EventType::Lifecycle,
            EventSubtype::Born,
            vec!["agent_0002".to_string()],
            EventPayload::None,
        );
        let events = queue.drain();
        assert_eq!(events[0].timestamp.sequence, 0);
        assert_eq!(events[1].timestamp.sequence, 1);
        queue.begin_tick(5);
        queue.emit(
            EventType::Lifecycle,
            EventSubtype::Born,
            vec!["agent_0003".to_string()],
            EventPayload::None,
        );
        assert_eq!(queue.events()[0].timestamp.sequence, 0);
    }
}
