//! Shared data types for the Cognisphere simulation engine.
//!
//! This crate holds the schema that crosses the engine boundary: simulation
//! timestamps, the episodic event format, stimulus items, snapshot
//! serialization structs, and per-tick result summaries. It contains no
//! engine logic so that external consumers (an API layer, a visualization
//! front end) can depend on it without pulling in the engine.

pub mod event;
pub mod resource;
pub mod snapshot;
pub mod stimulus;
pub mod timestamp;

pub use event::{Event, EventPayload, EventSubtype, EventType};
pub use resource::ResourceKind;
pub use snapshot::{
    AgentSnapshot, CultureChange, CultureSnapshot, EconomySummary, MythSnapshot, NormSnapshot,
    RelationshipSnapshot, SnapshotMeta, TickResult, WorldSnapshot, SNAPSHOT_FORMAT_VERSION,
};
pub use stimulus::{Stimulus, StimulusCategory, StimulusError, StimulusSchedule, MAX_ABS_IMPACT};
pub use timestamp::SimTimestamp;
