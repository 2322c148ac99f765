//! Episodic Event Log
//!
//! Append-only store of committed events, ordered by (tick, sequence).

use cog_events::Event;

/// The append-only episodic log.
#[derive(Debug, Clone, Default)]
pub struct EpisodicLog {
    events: Vec<Event>,
}

impl EpisodicLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a tick's committed batch. The batch must already be in
    /// (tick, sequence) order; appending an event older than the current
    /// tail is a logic error and is dropped with a warning.
    pub fn append_batch(&mut self, batch: Vec<Event>) {
        for event in batch {
            if let Some(tail) = self.events.last() {
                if event.timestamp < tail.timestamp {
                    tracing::warn!(
                        "dropping out-of-order event {} at {}",
                        event.event_id,
                        event.timestamp
                    );
                    continue;
                }
            }
            self.events.push(event);
        }
    }

    /// All committed events in order.
    pub fn all(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events within the trailing tick window that involve the agent.
    pub fn recent_for(&self, agent_id: &str, window: u64, current_tick: u64) -> Vec<&Event> {
        let floor = current_tick.saturating_sub(window);
        self.events
            .iter()
            .rev()
            .take_while(|e| e.timestamp.tick >= floor)
            .filter(|e| e.involves(agent_id))
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect()
    }

    /// Events committed at exactly the given tick.
    pub fn events_at(&self, tick: u64) -> &[Event] {
        let start = self
            .events
            .partition_point(|e| e.timestamp.tick < tick);
        let end = self
            .events
            .partition_point(|e| e.timestamp.tick <= tick);
        &self.events[start..end]
    }

    /// Replaces the log wholesale (restore path only).
    pub fn replace(&mut self, events: Vec<Event>) {
        self.events = events;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cog_events::{EventPayload, EventSubtype, EventType, SimTimestamp};

    fn event(id: &str, tick: u64, seq: u64, actor: &str) -> Event {
        Event::new(
            id,
            SimTimestamp::new(tick, seq),
            EventType::Trade,
            EventSubtype::Bilateral,
            vec![actor.to_string()],
            EventPayload::None,
        )
    }

    #[test]
    fn recent_window_filters_by_participant_and_tick() {
        let mut log = EpisodicLog::new();
        log.append_batch(vec![
            event("evt_00000001", 1, 0, "agent_0001"),
            event("evt_00000002", 5, 0, "agent_0002"),
            event("evt_00000003", 9, 0, "agent_0001"),
        ]);
        let recent = log.recent_for("agent_0001", 5, 10);
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].event_id, "evt_00000003");
    }

    #[test]
    fn out_of_order_appends_are_dropped() {
        let mut log = EpisodicLog::new();
        log.append_batch(vec![event("evt_00000002", 5, 0, "agent_0001")]);
        log.append_batch(vec![event("evt_00000001", 4, 0, "agent_0001")]);
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn events_at_selects_one_tick() {
        let mut log = EpisodicLog::new();
        log.append_batch(vec![
            event("evt_00000001", 1, 0, "agent_0001"),
            event("evt_00000002", 2, 0, "agent_0001"),
            event("evt_00000003", 2, 1, "agent_0002"),
            event("evt_00000004", 3, 0, "agent_0001"),
        ]);
        assert_eq!(log.events_at(2).len(), 2);
        assert!(log.events_at(7).is_empty());
    }
}
