//! Stimulus Types
//!
//! Environmental stimuli are the only external input to a running
//! simulation. Each item carries a category tag and a bounded numeric
//! impact; everything else about the outside world (feeds, weather data,
//! sentiment pipelines) is a collaborator's concern. Malformed items are
//! rejected at this boundary and never reach the engine.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Largest magnitude an impact score may carry.
pub const MAX_ABS_IMPACT: f32 = 1.0;

/// Category tag of an environmental stimulus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StimulusCategory {
    /// External news; shifts out-group posture.
    News,
    /// Weather swings; shifts tradition/mysticism and grain injection.
    Weather,
    /// Price or supply shocks; injects or drains global resources.
    EconomicShock,
    /// Ambient mood; shifts stability of norms.
    Sentiment,
    /// Catastrophe; may deactivate agents in a region.
    Cataclysm,
}

impl StimulusCategory {
    /// Stable string name, matching the serialized form.
    pub fn name(&self) -> &'static str {
        match self {
            StimulusCategory::News => "news",
            StimulusCategory::Weather => "weather",
            StimulusCategory::EconomicShock => "economic_shock",
            StimulusCategory::Sentiment => "sentiment",
            StimulusCategory::Cataclysm => "cataclysm",
        }
    }
}

impl fmt::Display for StimulusCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single environmental stimulus item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stimulus {
    /// Category tag.
    pub category: StimulusCategory,
    /// Impact score in [-MAX_ABS_IMPACT, MAX_ABS_IMPACT].
    pub impact: f32,
    /// Restrict the stimulus to one region; None applies world-wide.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_region: Option<String>,
}

impl Stimulus {
    /// Creates a world-wide stimulus.
    pub fn new(category: StimulusCategory, impact: f32) -> Self {
        Self {
            category,
            impact,
            target_region: None,
        }
    }

    /// Restricts the stimulus to a region.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.target_region = Some(region.into());
        self
    }

    /// Validates the item at the engine boundary.
    pub fn validate(&self) -> Result<(), StimulusError> {
        if !self.impact.is_finite() {
            return Err(StimulusError::NonFiniteImpact);
        }
        if self.impact.abs() > MAX_ABS_IMPACT {
            return Err(StimulusError::ImpactOutOfRange(self.impact));
        }
        if let Some(region) = &self.target_region {
            if region.is_empty() {
                return Err(StimulusError::EmptyRegion);
            }
        }
        Ok(())
    }
}

/// Rejection reasons for malformed stimuli.
#[derive(Debug, Clone, PartialEq)]
pub enum StimulusError {
    NonFiniteImpact,
    ImpactOutOfRange(f32),
    EmptyRegion,
}

impl fmt::Display for StimulusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StimulusError::NonFiniteImpact => write!(f, "impact is not a finite number"),
            StimulusError::ImpactOutOfRange(v) => {
                write!(f, "impact {} outside [-{}, {}]", v, MAX_ABS_IMPACT, MAX_ABS_IMPACT)
            }
            StimulusError::EmptyRegion => write!(f, "target region is empty"),
        }
    }
}

impl std::error::Error for StimulusError {}

/// A tick-keyed stimulus schedule, loadable from a JSON file.
///
/// Keys are tick numbers encoded as strings (JSON object keys); values are
/// the stimulus batches to inject at those ticks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StimulusSchedule {
    #[serde(flatten)]
    entries: BTreeMap<String, Vec<Stimulus>>,
}

impl StimulusSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a batch for a tick.
    pub fn insert(&mut self, tick: u64, batch: Vec<Stimulus>) {
        self.entries.insert(tick.to_string(), batch);
    }

    /// Returns the batch scheduled for a tick, if any.
    pub fn batch_for(&self, tick: u64) -> &[Stimulus] {
        self.entries
            .get(&tick.to_string())
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Total number of scheduled items across all ticks.
    pub fn item_count(&self) -> usize {
        self.entries.values().map(|v| v.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_range_stimulus_passes_validation() {
        let stim = Stimulus::new(StimulusCategory::News, 0.4);
        assert!(stim.validate().is_ok());
    }

    #[test]
    fn out_of_range_impact_is_rejected() {
        let stim = Stimulus::new(StimulusCategory::Weather, 1.5);
        assert_eq!(
            stim.validate(),
            Err(StimulusError::ImpactOutOfRange(1.5))
        );
    }

    #[test]
    fn nan_impact_is_rejected() {
        let stim = Stimulus::new(StimulusCategory::Sentiment, f32::NAN);
        assert_eq!(stim.validate(), Err(StimulusError::NonFiniteImpact));
    }

    #[test]
    fn schedule_round_trips_through_json() {
        let mut schedule = StimulusSchedule::new();
        schedule.insert(5, vec![Stimulus::new(StimulusCategory::EconomicShock, -0.8)]);
        let json = serde_json::to_string(&schedule).unwrap();
        let back: StimulusSchedule = serde_json::from_str(&json).unwrap();
        assert_eq!(back.batch_for(5).len(), 1);
        assert!(back.batch_for(6).is_empty());
    }
}
