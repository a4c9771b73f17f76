//! Engine configuration
//!
//! Everything the engine needs beyond the scenario itself: status
//! tolerances for the tracker, impact thresholds for the results, playback
//! mode and event log size. All fields have defaults, so an empty JSON
//! object is a valid configuration.

use crate::core::time::PlaybackMode;
use crate::models::event::DEFAULT_EVENT_CAPACITY;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Tolerance {name} must be non-negative, got {value}")]
    NegativeTolerance { name: &'static str, value: f64 },

    #[error("Critical tolerance {critical} must be greater than delay tolerance {delay}")]
    ToleranceOrder { delay: f64, critical: f64 },

    #[error("High impact threshold {high} must be at least the medium threshold {medium}")]
    ThresholdOrder { medium: f64, high: f64 },

    #[error("Event log capacity must be positive")]
    ZeroEventCapacity,
}

/// Entity status tolerances, in percent over the expected time
///
/// An entity is `on_track` while actual ≤ expected, `delayed` while it is
/// at most `critical_tolerance_percent` over, and `critical` beyond that.
/// The stage the lead entity occupies is flagged `delayed` once the entity
/// is more than `delay_tolerance_percent` over.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    pub delay_tolerance_percent: f64,
    pub critical_tolerance_percent: f64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            delay_tolerance_percent: 20.0,
            critical_tolerance_percent: 50.0,
        }
    }
}

/// Thresholds on |improvement %| that decide a metric's impact level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultsConfig {
    pub high_impact_threshold_percent: f64,
    pub medium_impact_threshold_percent: f64,
}

impl Default for ResultsConfig {
    fn default() -> Self {
        Self {
            high_impact_threshold_percent: 25.0,
            medium_impact_threshold_percent: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub tracking: TrackingConfig,
    pub results: ResultsConfig,
    pub playback_mode: PlaybackMode,
    pub event_log_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tracking: TrackingConfig::default(),
            results: ResultsConfig::default(),
            playback_mode: PlaybackMode::Loop,
            event_log_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.tracking;
        if !(t.delay_tolerance_percent >= 0.0) {
            return Err(ConfigError::NegativeTolerance {
                name: "delay_tolerance_percent",
                value: t.delay_tolerance_percent,
            });
        }
        if !(t.critical_tolerance_percent >= 0.0) {
            return Err(ConfigError::NegativeTolerance {
                name: "critical_tolerance_percent",
                value: t.critical_tolerance_percent,
            });
        }
        if t.critical_tolerance_percent <= t.delay_tolerance_percent {
            return Err(ConfigError::ToleranceOrder {
                delay: t.delay_tolerance_percent,
                critical: t.critical_tolerance_percent,
            });
        }

        let r = &self.results;
        if r.high_impact_threshold_percent < r.medium_impact_threshold_percent {
            return Err(ConfigError::ThresholdOrder {
                medium: r.medium_impact_threshold_percent,
                high: r.high_impact_threshold_percent,
            });
        }

        if self.event_log_capacity == 0 {
            return Err(ConfigError::ZeroEventCapacity);
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self, crate::SimulationError> {
        let config: EngineConfig = serde_json::from_str(json)
            .map_err(|e| crate::SimulationError::Serialization(format!("Config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert_eq!(EngineConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config =
            EngineConfig::from_json_str(r#"{"tracking": {"critical_tolerance_percent": 80.0}}"#)
                .unwrap();
        assert_eq!(config.tracking.delay_tolerance_percent, 20.0);
        assert_eq!(config.tracking.critical_tolerance_percent, 80.0);
        assert_eq!(config.playback_mode, PlaybackMode::Loop);
    }

    #[test]
    fn test_playback_mode_from_json() {
        let config = EngineConfig::from_json_str(r#"{"playback_mode": "stop_at_end"}"#).unwrap();
        assert_eq!(config.playback_mode, PlaybackMode::StopAtEnd);
    }

    #[test]
    fn test_tolerance_order_enforced() {
        let mut config = EngineConfig::default();
        config.tracking.critical_tolerance_percent = 10.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ToleranceOrder { .. })
        ));
    }
}
