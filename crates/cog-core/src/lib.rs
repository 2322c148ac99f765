//! Cognisphere Simulation Engine
//!
//! A deterministic, tick-driven simulation of cognitive agents whose
//! interactions produce emergent language drift, culture (myths and
//! norms), a negotiation-and-market economy, and social structure.
//!
//! The engine is exposed through [`Simulation`]: initialize a world from
//! a [`Config`], drive it with `advance_tick`, inspect it through state
//! views, and rewind it through snapshots. Two runs with the same seed
//! and stimulus sequence produce bit-identical state and event logs.

pub mod components;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod memory;
pub mod rng;
pub mod setup;
pub mod snapshot;
pub mod systems;
pub mod view;

pub use config::{Config, ConfigError};
pub use engine::Simulation;
pub use error::{AgentFault, CoreError};
pub use snapshot::{load_snapshot_from_file, write_snapshot_to_dir, SnapshotHandle};
pub use view::{StateView, ViewFilters};
