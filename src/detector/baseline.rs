//! Learned baseline model
//!
//! Statistical summary of normal behavior, seeded once at the end of the
//! learning phase and nudged continuously by the threshold controller.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::features::FeatureVector;
use super::scorer::FeatureRanges;

/// Summary of normal behavior captured during learning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaselineModel {
    pub baseline_mean: f32,
    pub baseline_std: f32,
    pub baseline_rms: f32,
    /// Score cutoff above which a window is classified anomalous
    pub adaptive_threshold: f32,
    pub normal_count: u32,
    pub anomaly_count: u32,
    /// When the baseline was established
    pub created: DateTime<Utc>,
}

impl BaselineModel {
    /// Seed a model from the final learning-phase feature vector.
    /// The adaptive threshold is initialized separately by the controller.
    pub fn from_features(features: &FeatureVector) -> Self {
        Self {
            baseline_mean: features.mean,
            baseline_std: features.std_dev,
            baseline_rms: features.rms,
            adaptive_threshold: 0.0,
            normal_count: 0,
            anomaly_count: 0,
            created: Utc::now(),
        }
    }

    /// Record one classification outcome in the running counters
    pub fn record(&mut self, is_anomaly: bool) {
        if is_anomaly {
            self.anomaly_count += 1;
        } else {
            self.normal_count += 1;
        }
    }

    /// Total classifications since the baseline was established
    pub fn total_decisions(&self) -> u32 {
        self.normal_count + self.anomaly_count
    }
}

/// Flat persisted record: the baseline plus the scorer's calibrated ranges
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedModel {
    pub model: BaselineModel,
    pub ranges: FeatureRanges,
}

impl PersistedModel {
    /// Save to disk
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create model file: {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        bincode::serde::encode_into_std_write(self, &mut writer, bincode::config::standard())?;
        Ok(())
    }

    /// Load from disk
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open model file: {}", path.display()))?;
        let mut reader = BufReader::new(file);
        let record: Self =
            bincode::serde::decode_from_std_read(&mut reader, bincode::config::standard())?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_model() -> BaselineModel {
        let features = FeatureVector {
            mean: 25.0,
            std_dev: 0.5,
            min: 24.0,
            max: 26.0,
            rms: 25.005,
            trend: 0.01,
        };
        BaselineModel::from_features(&features)
    }

    #[test]
    fn test_seed_from_features() {
        let model = make_model();
        assert_eq!(model.baseline_mean, 25.0);
        assert_eq!(model.baseline_std, 0.5);
        assert_eq!(model.total_decisions(), 0);
    }

    #[test]
    fn test_record_counters() {
        let mut model = make_model();
        model.record(false);
        model.record(false);
        model.record(true);
        assert_eq!(model.normal_count, 2);
        assert_eq!(model.anomaly_count, 1);
        assert_eq!(model.total_decisions(), 3);
    }

    #[test]
    fn test_persistence_round_trip() {
        let mut model = make_model();
        model.adaptive_threshold = 0.675;
        let record = PersistedModel {
            model,
            ranges: FeatureRanges::default(),
        };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("baseline.bin");
        record.save(&path).unwrap();

        let loaded = PersistedModel::load(&path).unwrap();
        assert_eq!(loaded.model.baseline_mean, 25.0);
        assert_eq!(loaded.model.adaptive_threshold, 0.675);
        assert_eq!(loaded.ranges.mean, record.ranges.mean);
    }
}
