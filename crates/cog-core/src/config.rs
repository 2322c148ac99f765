//! Configuration System
//!
//! Loads tuning parameters from cognisphere.toml for easy adjustment
//! without recompiling. Every behavioral constant the engine uses lives
//! here with a documented default; validation happens once at the
//! boundary, before a world is built.

use bevy_ecs::prelude::Resource;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Default tuning file path.
pub const DEFAULT_CONFIG_PATH: &str = "cognisphere.toml";

/// Top-level configuration structure.
///
/// Inserted into the world as a resource so every system reads the same
/// tuning values.
#[derive(Resource, Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub simulation: SimulationSettings,
    pub economy: EconomySettings,
    pub trust: TrustSettings,
    pub culture: CultureSettings,
    pub language: LanguageSettings,
}

/// World-level parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    /// Number of agents spawned at initialization.
    pub agent_count: usize,
    /// Global RNG seed.
    pub seed: u64,
    /// Ticks between automatic snapshots (0 disables them).
    pub snapshot_interval: u64,
    /// Units of each resource granted per agent at spawn.
    pub starting_inventory: u32,
    /// Units of each resource seeded into the global pool.
    pub initial_global_pool: u64,
}

/// Negotiation and market parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EconomySettings {
    /// Maximum alternating-offer rounds before a session force-expires.
    pub negotiation_round_limit: u32,
    /// Fraction of the value gap conceded per counter-offer.
    pub concession_rate: f32,
    /// How strongly scarcity raises an agent's unit valuation.
    pub scarcity_weight: f32,
    /// How strongly positive trust lowers the acceptance threshold.
    pub trust_discount: f32,
    /// Order book capacity per side; overflow is truncated with an event.
    pub max_book_orders: usize,
    /// Base probability that an agent seeks a trade on a given tick.
    pub trade_propensity: f32,
}

/// Trust dynamics parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrustSettings {
    /// Base magnitude of a trust change from one resolved interaction.
    pub base_delta: f32,
    /// Per-tick decay of relationship edge weights toward neutral.
    pub edge_decay_rate: f32,
    /// Mutual trust level at which an alliance edge forms.
    pub alliance_threshold: f32,
    /// Trust level below which a rivalry edge forms.
    pub rivalry_threshold: f32,
}

/// Myth and norm parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CultureSettings {
    /// Believers required inside the window for canonization.
    pub myth_support_threshold: u32,
    /// Rolling window (ticks) for canonization support.
    pub myth_window: u64,
    /// Ticks without reinforcement before a myth is forgotten.
    pub myth_retention: u64,
    /// Ticks without reinforcement before an adopted norm lapses.
    pub norm_retention: u64,
    /// Ticks between norm referenda.
    pub referendum_interval: u64,
    /// Fraction of active agents that must vote for a referendum to bind.
    pub norm_quorum: f32,
    /// Minimum ideology alignment magnitude to count as casting a vote.
    pub min_conviction: f32,
    /// Sigmoid steepness of the contagion adoption curve.
    pub adoption_steepness: f32,
    /// Trusted-neighbor count at the adoption curve midpoint.
    pub adoption_midpoint: f32,
    /// Trust above which a neighbor counts toward contagion.
    pub contagion_trust_threshold: f32,
    /// Inventory total above which the share-surplus norm is breached.
    pub surplus_threshold: u32,
    /// Resource units fined for a norm breach.
    pub norm_fine: u32,
    /// Trust cost paid toward each adherent on a norm breach.
    pub norm_trust_cost: f32,
}

/// Lexicon drift parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LanguageSettings {
    /// Probability that an agent considers its lexicon at all on a tick.
    pub attempt_rate: f32,
    /// Probability scale of adopting a neighbor's term (cultural
    /// mirroring).
    pub mirroring_rate: f32,
    /// Probability of spontaneously coining a new term per concept-tick.
    pub drift_rate: f32,
    /// Norm stability floor for regions with no adopted norms.
    pub base_stability: f32,
    /// Cap on retained per-concept term history entries.
    pub max_term_history: usize,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            agent_count: 100,
            seed: 42,
            snapshot_interval: 20,
            starting_inventory: 10,
            initial_global_pool: 500,
        }
    }
}

impl Default for EconomySettings {
    fn default() -> Self {
        Self {
            negotiation_round_limit: 5,
            concession_rate: 0.25,
            scarcity_weight: 1.5,
            trust_discount: 0.2,
            max_book_orders: 256,
            trade_propensity: 0.15,
        }
    }
}

impl Default for TrustSettings {
    fn default() -> Self {
        Self {
            base_delta: 0.1,
            edge_decay_rate: 0.01,
            alliance_threshold: 0.6,
            rivalry_threshold: -0.4,
        }
    }
}

impl Default for CultureSettings {
    fn default() -> Self {
        Self {
            myth_support_threshold: 5,
            myth_window: 40,
            myth_retention: 60,
            norm_retention: 80,
            referendum_interval: 25,
            norm_quorum: 0.5,
            min_conviction: 0.05,
            adoption_steepness: 1.2,
            adoption_midpoint: 2.0,
            contagion_trust_threshold: 0.2,
            surplus_threshold: 60,
            norm_fine: 1,
            norm_trust_cost: 0.05,
        }
    }
}

impl Default for LanguageSettings {
    fn default() -> Self {
        Self {
            attempt_rate: 0.1,
            mirroring_rate: 0.70,
            drift_rate: 0.01,
            base_stability: 0.2,
            max_term_history: 16,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            simulation: SimulationSettings::default(),
            economy: EconomySettings::default(),
            trust: TrustSettings::default(),
            culture: CultureSettings::default(),
            language: LanguageSettings::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io(e.to_string()))?;
        let config: Config =
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the default path, or fall back to defaults.
    pub fn load_or_default() -> Self {
        if Path::new(DEFAULT_CONFIG_PATH).exists() {
            match Self::load(DEFAULT_CONFIG_PATH) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("could not load {}: {}", DEFAULT_CONFIG_PATH, e);
                }
            }
        }
        Self::default()
    }

    /// Validates ranges before a world is built from this config.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn unit(name: &str, value: f32) -> Result<(), ConfigError> {
            if !(0.0..=1.0).contains(&value) || !value.is_finite() {
                return Err(ConfigError::OutOfRange(format!(
                    "{} must be in [0, 1], got {}",
                    name, value
                )));
            }
            Ok(())
        }

        if self.simulation.agent_count == 0 {
            return Err(ConfigError::OutOfRange(
                "simulation.agent_count must be at least 1".to_string(),
            ));
        }
        if self.economy.negotiation_round_limit == 0 {
            return Err(ConfigError::OutOfRange(
                "economy.negotiation_round_limit must be at least 1".to_string(),
            ));
        }
        if self.economy.max_book_orders == 0 {
            return Err(ConfigError::OutOfRange(
                "economy.max_book_orders must be at least 1".to_string(),
            ));
        }
        if self.culture.myth_window == 0 || self.culture.myth_retention == 0 {
            return Err(ConfigError::OutOfRange(
                "culture windows must be at least 1 tick".to_string(),
            ));
        }
        if self.culture.referendum_interval == 0 {
            return Err(ConfigError::OutOfRange(
                "culture.referendum_interval must be at least 1".to_string(),
            ));
        }
        unit("economy.concession_rate", self.economy.concession_rate)?;
        unit("economy.trust_discount", self.economy.trust_discount)?;
        unit("economy.trade_propensity", self.economy.trade_propensity)?;
        unit("trust.base_delta", self.trust.base_delta)?;
        unit("trust.edge_decay_rate", self.trust.edge_decay_rate)?;
        unit("culture.norm_quorum", self.culture.norm_quorum)?;
        unit("language.attempt_rate", self.language.attempt_rate)?;
        unit("language.mirroring_rate", self.language.mirroring_rate)?;
        unit("language.drift_rate", self.language.drift_rate)?;
        unit("language.base_stability", self.language.base_stability)?;
        Ok(())
    }

    /// Applies command-line overrides that callers commonly supply.
    pub fn with_overrides(
        mut self,
        seed: Option<u64>,
        agent_count: Option<usize>,
        snapshot_interval: Option<u64>,
    ) -> Self {
        if let Some(seed) = seed {
            self.simulation.seed = seed;
        }
        if let Some(count) = agent_count {
            self.simulation.agent_count = count;
        }
        if let Some(interval) = snapshot_interval {
            self.simulation.snapshot_interval = interval;
        }
        self
    }
}

/// Configuration error type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("out of range: {0}")]
    OutOfRange(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.simulation.seed, 42);
        assert!((config.language.mirroring_rate - 0.70).abs() < f32::EPSILON);
        assert!((config.language.drift_rate - 0.01).abs() < f32::EPSILON);
    }

    #[test]
    fn zero_agents_is_rejected() {
        let mut config = Config::default();
        config.simulation.agent_count = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange(_))
        ));
    }

    #[test]
    fn out_of_unit_rate_is_rejected() {
        let mut config = Config::default();
        config.language.mirroring_rate = 1.3;
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [simulation]
            agent_count = 10
            seed = 7
            "#,
        )
        .unwrap();
        assert_eq!(config.simulation.agent_count, 10);
        assert_eq!(config.simulation.seed, 7);
        assert_eq!(config.economy.negotiation_round_limit, 5);
    }
}
