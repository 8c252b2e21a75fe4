//! Rule-based anomaly scoring
//!
//! Scores a feature vector against per-feature range bounds learned from the
//! baseline. Despite its ancestry this is a fixed set of range rules, not a
//! randomized tree ensemble; thresholds downstream are calibrated to it.

use serde::{Deserialize, Serialize};

use super::baseline::BaselineModel;
use super::features::FeatureVector;

/// Per-feature `[low, high]` bounds the rule checks run against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRanges {
    pub mean: [f32; 2],
    pub std_dev: [f32; 2],
    pub rms: [f32; 2],
    pub min: [f32; 2],
    pub max: [f32; 2],
    pub trend: [f32; 2],
}

impl Default for FeatureRanges {
    fn default() -> Self {
        // Wide safe defaults, recalibrated once from the learned baseline
        Self {
            mean: [-100.0, 100.0],
            std_dev: [0.0, 50.0],
            rms: [0.0, 100.0],
            min: [-100.0, 100.0],
            max: [-100.0, 100.0],
            trend: [-10.0, 10.0],
        }
    }
}

impl FeatureRanges {
    /// Recenter the scored bounds on the learned baseline. Runs once at the
    /// Learning → Operational transition.
    ///
    /// The std upper bound carries the 1.8x excess-variance multiplier; a
    /// small floor on the noise span keeps a flat baseline from producing a
    /// zero-width mean band.
    pub fn calibrate(&mut self, features: &FeatureVector) {
        let noise_span = features.std_dev.max(1e-3);
        self.mean = [features.mean - noise_span, features.mean + noise_span];
        self.std_dev = [features.std_dev * 0.5, features.std_dev * 1.8];
        self.rms = [features.rms * 0.5, features.rms * 1.5];
    }
}

/// Rule-based deviation scorer
///
/// Each firing rule adds a bounded term to an accumulator; the final score is
/// the accumulator divided by the number of rules that fired, so one severe
/// violation scores as strongly as several milder simultaneous ones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleScorer {
    /// Fixed penalty for an abnormally flat window
    pub stability_penalty: f32,
    /// Fixed penalty for a trend beyond the rapid-change cutoff
    pub trend_penalty: f32,
    /// Raw-unit slope above which a trend counts as a rapid change
    pub rapid_trend_cutoff: f32,
    /// Fraction of baseline RMS below which the window range reads as
    /// abnormally stable
    pub stable_range_factor: f32,
}

impl Default for RuleScorer {
    fn default() -> Self {
        Self {
            stability_penalty: 0.3,
            trend_penalty: 0.4,
            rapid_trend_cutoff: 5.0,
            stable_range_factor: 0.2,
        }
    }
}

impl RuleScorer {
    /// Score a feature vector in `[0, 1]`, stateless given its inputs
    pub fn score(
        &self,
        features: &FeatureVector,
        model: &BaselineModel,
        ranges: &FeatureRanges,
    ) -> f32 {
        let mut acc = 0.0f32;
        let mut violations = 0u32;

        // Mean outside its band, normalized by band width
        if features.mean < ranges.mean[0] || features.mean > ranges.mean[1] {
            let deviation = if features.mean < ranges.mean[0] {
                ranges.mean[0] - features.mean
            } else {
                features.mean - ranges.mean[1]
            };
            let width = (ranges.mean[1] - ranges.mean[0]).max(f32::EPSILON);
            acc += (deviation / width).min(1.0);
            violations += 1;
        }

        // Excess variance beyond the upper bound
        if features.std_dev > ranges.std_dev[1] {
            let width = (ranges.std_dev[1] - ranges.std_dev[0]).max(f32::EPSILON);
            acc += ((features.std_dev - ranges.std_dev[1]) / width).min(1.0);
            violations += 1;
        }

        // Excess signal energy beyond the RMS upper bound
        if features.rms > ranges.rms[1] {
            let width = (ranges.rms[1] - ranges.rms[0]).max(f32::EPSILON);
            acc += ((features.rms - ranges.rms[1]) / width).min(1.0);
            violations += 1;
        }

        // Abnormal stability: the window collapsed relative to baseline energy
        if model.baseline_rms > 1.0
            && features.range() < self.stable_range_factor * model.baseline_rms
        {
            acc += self.stability_penalty;
            violations += 1;
        }

        // Rapid trend change
        if features.trend.abs() > self.rapid_trend_cutoff {
            acc += self.trend_penalty;
            violations += 1;
        }

        let score = if violations > 0 {
            acc / violations as f32
        } else {
            0.0
        };

        score.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn baseline() -> (BaselineModel, FeatureRanges) {
        let features = FeatureVector {
            mean: 25.0,
            std_dev: 0.5,
            min: 24.0,
            max: 26.0,
            rms: 25.005,
            trend: 0.0,
        };
        let model = BaselineModel::from_features(&features);
        let mut ranges = FeatureRanges::default();
        ranges.calibrate(&features);
        (model, ranges)
    }

    #[test]
    fn test_calibrate_recenters_bounds() {
        let (_, ranges) = baseline();
        assert!((ranges.mean[0] - 24.5).abs() < 1e-4);
        assert!((ranges.mean[1] - 25.5).abs() < 1e-4);
        assert!((ranges.std_dev[1] - 0.9).abs() < 1e-4);
        assert!((ranges.rms[1] - 25.005 * 1.5).abs() < 1e-3);
    }

    #[test]
    fn test_normal_window_scores_zero() {
        let (model, ranges) = baseline();
        let normal = FeatureVector {
            mean: 25.1,
            std_dev: 0.4,
            min: 20.0,
            max: 30.0,
            rms: 25.1,
            trend: 0.05,
        };
        assert_eq!(RuleScorer::default().score(&normal, &model, &ranges), 0.0);
    }

    #[test]
    fn test_mean_shift_scores_high() {
        let (model, ranges) = baseline();
        // Shifted and still wobbling: mean and variance rules both fire
        let shifted = FeatureVector {
            mean: 28.2,
            std_dev: 2.5,
            min: 24.7,
            max: 31.7,
            rms: 28.3,
            trend: 0.1,
        };
        let score = RuleScorer::default().score(&shifted, &model, &ranges);
        assert!(score > 0.9, "score {} should be near 1", score);
    }

    #[test]
    fn test_stability_penalty_alone() {
        let (model, ranges) = baseline();
        // Flat window within all bands: only the stability rule fires
        let flat = FeatureVector {
            mean: 25.0,
            std_dev: 0.0,
            min: 25.0,
            max: 25.0,
            rms: 25.0,
            trend: 0.0,
        };
        let score = RuleScorer::default().score(&flat, &model, &ranges);
        assert!((score - 0.3).abs() < 1e-5);
    }

    #[test]
    fn test_stability_requires_energetic_baseline() {
        let quiet = FeatureVector {
            mean: 0.1,
            std_dev: 0.05,
            min: 0.0,
            max: 0.2,
            rms: 0.12,
            trend: 0.0,
        };
        let model = BaselineModel::from_features(&quiet);
        let mut ranges = FeatureRanges::default();
        ranges.calibrate(&quiet);

        // baseline_rms <= 1: a flat window is not suspicious
        let flat = FeatureVector {
            mean: 0.1,
            std_dev: 0.0,
            min: 0.1,
            max: 0.1,
            rms: 0.1,
            trend: 0.0,
        };
        assert_eq!(RuleScorer::default().score(&flat, &model, &ranges), 0.0);
    }

    #[test]
    fn test_rapid_trend_penalty() {
        let (model, ranges) = baseline();
        let trending = FeatureVector {
            mean: 25.0,
            std_dev: 0.4,
            min: 15.0,
            max: 35.0,
            rms: 25.2,
            trend: 6.0,
        };
        let score = RuleScorer::default().score(&trending, &model, &ranges);
        assert!((score - 0.4).abs() < 1e-5);
    }

    #[test]
    fn test_score_always_in_unit_interval() {
        let (model, ranges) = baseline();
        let extremes = [
            FeatureVector {
                mean: 1e9,
                std_dev: 1e9,
                min: -1e9,
                max: 1e9,
                rms: 1e9,
                trend: 1e9,
            },
            FeatureVector {
                mean: -1e9,
                std_dev: 0.0,
                min: -1e9,
                max: -1e9,
                rms: 1e9,
                trend: -1e9,
            },
            FeatureVector::default(),
        ];

        let scorer = RuleScorer::default();
        for features in &extremes {
            let score = scorer.score(features, &model, &ranges);
            assert!((0.0..=1.0).contains(&score), "score {} out of range", score);
        }
    }
}
