// src/config.rs
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::drivers::calibration::{DEFAULT_ADC_RESOLUTION, DEFAULT_VREF};
use crate::drivers::AcquisitionError;
use crate::types::GestureDefinition;

/// Fixed timing and calibration parameters shared by every session of a run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Seconds per repetition window.
    pub duration_per_repetition: f64,
    pub repetitions: u32,
    pub reference_voltage: f64,
    pub adc_resolution: u32,
    /// Minimum seconds between live plot refreshes.
    pub refresh_interval: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            duration_per_repetition: 3.0,
            repetitions: 15,
            reference_voltage: DEFAULT_VREF,
            adc_resolution: DEFAULT_ADC_RESOLUTION,
            refresh_interval: 0.05,
        }
    }
}

impl SessionConfig {
    pub fn total_duration(&self) -> f64 {
        self.duration_per_repetition * self.repetitions as f64
    }

    pub fn validate(&self) -> Result<(), AcquisitionError> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(self.duration_per_repetition) {
            return Err(invalid(format!(
                "duration_per_repetition must be > 0, got {}",
                self.duration_per_repetition
            )));
        }
        if self.repetitions == 0 {
            return Err(invalid("repetitions must be > 0".into()));
        }
        if !self.total_duration().is_finite() {
            return Err(invalid(format!(
                "{} repetitions of {}s overflow the recording window",
                self.repetitions, self.duration_per_repetition
            )));
        }
        if !positive(self.reference_voltage) {
            return Err(invalid(format!(
                "reference_voltage must be > 0, got {}",
                self.reference_voltage
            )));
        }
        if self.adc_resolution == 0 {
            return Err(invalid("adc_resolution must be > 0".into()));
        }
        if !(self.refresh_interval.is_finite() && self.refresh_interval >= 0.0) {
            return Err(invalid(format!(
                "refresh_interval must be >= 0, got {}",
                self.refresh_interval
            )));
        }
        Ok(())
    }
}

/// Session parameters plus the ordered gesture catalog.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    #[serde(flatten)]
    pub session: SessionConfig,
    pub gestures: Vec<GestureDefinition>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            gestures: default_gestures(),
        }
    }
}

impl RunConfig {
    /// Reads a JSON file; missing fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self, AcquisitionError> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, AcquisitionError> {
        let config: RunConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AcquisitionError> {
        self.session.validate()?;
        if self.gestures.is_empty() {
            return Err(invalid("gesture catalog is empty".into()));
        }
        let mut seen = HashSet::new();
        for gesture in &self.gestures {
            if !is_file_safe_key(&gesture.key) {
                return Err(invalid(format!(
                    "gesture key {:?} must be non-empty and use only letters, digits, '_' or '-'",
                    gesture.key
                )));
            }
            if !seen.insert(gesture.key.as_str()) {
                return Err(invalid(format!("duplicate gesture key {:?}", gesture.key)));
            }
        }
        Ok(())
    }
}

// 手势目录 (顺序即录制顺序)
pub fn default_gestures() -> Vec<GestureDefinition> {
    vec![
        GestureDefinition::new("rest", "Neutral / no message"),
        GestureDefinition::new("fist", "Yes / OK"),
        GestureDefinition::new("open", "No / Stop"),
        GestureDefinition::new("wrist_up", "Hello / Start speaking"),
        GestureDefinition::new("wrist_down", "Goodbye / End speaking"),
        GestureDefinition::new("strong_fist", "Urgent / Need help"),
    ]
}

/// Keys become file names, so keep them to a portable character set.
fn is_file_safe_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn invalid(message: String) -> AcquisitionError {
    AcquisitionError::InvalidConfig(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = RunConfig::default();
        config.validate().unwrap();
        assert_eq!(config.session.total_duration(), 45.0);
        assert_eq!(config.gestures.len(), 6);
        assert_eq!(config.gestures[0].key, "rest");
        assert_eq!(config.gestures[5].key, "strong_fist");
    }

    #[test]
    fn partial_json_keeps_defaults_and_order() {
        let config = RunConfig::from_json(
            r#"{
                "duration_per_repetition": 2.5,
                "gestures": [
                    {"key": "pinch", "description": "Pinch"},
                    {"key": "fist", "description": "Yes / OK"}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(config.session.duration_per_repetition, 2.5);
        assert_eq!(config.session.repetitions, 15);
        assert_eq!(config.session.total_duration(), 37.5);
        let keys: Vec<_> = config.gestures.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(keys, ["pinch", "fist"]);
    }

    #[test]
    fn rejects_bad_values() {
        let bad = [
            r#"{"duration_per_repetition": 0}"#,
            r#"{"repetitions": 0}"#,
            r#"{"duration_per_repetition": 1e308}"#,
            r#"{"duration_per_repetition": 1e300, "repetitions": 4000000000}"#,
            r#"{"reference_voltage": -3.3}"#,
            r#"{"adc_resolution": 0}"#,
            r#"{"refresh_interval": -0.1}"#,
            r#"{"gestures": []}"#,
            r#"{"gestures": [{"key": "../etc", "description": "x"}]}"#,
            r#"{"gestures": [{"key": "a", "description": "x"}, {"key": "a", "description": "y"}]}"#,
        ];
        for text in bad {
            assert!(
                matches!(RunConfig::from_json(text), Err(AcquisitionError::InvalidConfig(_))),
                "accepted {text}"
            );
        }
    }

    #[test]
    fn malformed_json_is_a_format_error() {
        assert!(matches!(
            RunConfig::from_json("{not json"),
            Err(AcquisitionError::ConfigFormat(_))
        ));
    }

    #[test]
    fn round_trips_through_json() {
        let config = RunConfig::default();
        let text = serde_json::to_string_pretty(&config).unwrap();
        assert_eq!(RunConfig::from_json(&text).unwrap(), config);
    }
}
