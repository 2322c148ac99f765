//! ECS components and world-level resources.

pub mod agent;
pub mod culture;
pub mod world;

pub use agent::{
    Agent, AgentId, AgentName, Alive, Ideology, Inventory, Lexicon, LexiconEntry, Personality,
    Region, TrustLedger,
};
pub use culture::{ArtifactStatus, CultureState, Myth, Norm, NormTopic};
pub use world::{adjacent_regions, GlobalResources, WorldClock, REGIONS};
