//! Detector configuration
//!
//! Tuning knobs for the detection pipeline, loadable from TOML.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::detector::threshold::{THRESHOLD_MAX, THRESHOLD_MIN};
use crate::error::DetectorError;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    #[serde(default)]
    pub learning: LearningConfig,

    #[serde(default)]
    pub window: WindowConfig,

    #[serde(default)]
    pub filter: FilterConfig,

    #[serde(default)]
    pub detection: DetectionConfig,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            learning: LearningConfig::default(),
            window: WindowConfig::default(),
            filter: FilterConfig::default(),
            detection: DetectionConfig::default(),
        }
    }
}

/// Learning phase configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningConfig {
    /// Duration of the self-learning phase in milliseconds
    pub duration_ms: u32,
    /// Minimum valid samples required before the baseline may be computed
    pub min_samples: usize,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            duration_ms: 60_000,
            min_samples: 30,
        }
    }
}

/// Sample buffer and feature window configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Capacity of the circular sample buffer
    pub buffer_capacity: usize,
    /// Number of recent samples used per feature extraction
    pub feature_window: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: 100,
            feature_window: 50,
        }
    }
}

/// Signal conditioning configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Exponential moving average coefficient, in (0, 1)
    pub alpha: f32,
    /// Z-score beyond which a raw sample is flagged as an outlier
    pub outlier_zscore: f32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            alpha: 0.2,
            outlier_zscore: 3.5,
        }
    }
}

/// Classification and cadence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Base anomaly score threshold before the per-baseline margin is added
    pub base_threshold: f32,
    /// Feature extraction / classification interval in milliseconds
    pub update_interval_ms: u32,
    /// Adaptive threshold update cadence, in classification cycles
    pub threshold_update_every: u32,
    /// Diagnostics snapshot cadence, in classification cycles
    pub diagnostics_every: u32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            base_threshold: 0.6,
            update_interval_ms: 100,
            threshold_update_every: 100,
            diagnostics_every: 100,
        }
    }
}

impl DetectorConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: DetectorConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Check invariants the pipeline relies on
    pub fn validate(&self) -> std::result::Result<(), DetectorError> {
        if !(self.filter.alpha > 0.0 && self.filter.alpha < 1.0) {
            return Err(DetectorError::InvalidConfig(format!(
                "filter alpha must be in (0, 1), got {}",
                self.filter.alpha
            )));
        }
        if self.window.buffer_capacity == 0 {
            return Err(DetectorError::InvalidConfig(
                "buffer capacity must be non-zero".to_string(),
            ));
        }
        if self.window.feature_window == 0 || self.window.feature_window > self.window.buffer_capacity
        {
            return Err(DetectorError::InvalidConfig(format!(
                "feature window ({}) must be non-zero and fit the buffer ({})",
                self.window.feature_window, self.window.buffer_capacity
            )));
        }
        if self.learning.min_samples < 2 {
            return Err(DetectorError::InvalidConfig(
                "at least 2 learning samples are required for a meaningful baseline".to_string(),
            ));
        }
        if self.detection.update_interval_ms == 0 {
            return Err(DetectorError::InvalidConfig(
                "update interval must be non-zero".to_string(),
            ));
        }
        if self.detection.threshold_update_every == 0 || self.detection.diagnostics_every == 0 {
            return Err(DetectorError::InvalidConfig(
                "periodic cadences must be non-zero".to_string(),
            ));
        }
        if !(THRESHOLD_MIN..=THRESHOLD_MAX).contains(&self.detection.base_threshold) {
            return Err(DetectorError::InvalidConfig(format!(
                "base threshold {} outside the [{}, {}] clamp band",
                self.detection.base_threshold, THRESHOLD_MIN, THRESHOLD_MAX
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = DetectorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.learning.duration_ms, 60_000);
        assert_eq!(config.learning.min_samples, 30);
        assert_eq!(config.window.buffer_capacity, 100);
        assert_eq!(config.window.feature_window, 50);
        assert_eq!(config.detection.base_threshold, 0.6);
    }

    #[test]
    fn test_invalid_alpha_rejected() {
        let mut config = DetectorConfig::default();
        config.filter.alpha = 1.5;
        assert!(config.validate().is_err());
        config.filter.alpha = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_window_must_fit_buffer() {
        let mut config = DetectorConfig::default();
        config.window.feature_window = 200;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_base_threshold_band() {
        let mut config = DetectorConfig::default();
        config.detection.base_threshold = 0.95;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_partial_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[learning]\nduration_ms = 5000\nmin_samples = 10\n\n[filter]\nalpha = 0.3\noutlier_zscore = 3.5"
        )
        .unwrap();

        let config = DetectorConfig::load(file.path()).unwrap();
        assert_eq!(config.learning.duration_ms, 5000);
        assert_eq!(config.learning.min_samples, 10);
        assert!((config.filter.alpha - 0.3).abs() < f32::EPSILON);
        // Unspecified sections fall back to defaults
        assert_eq!(config.window.buffer_capacity, 100);
    }
}
