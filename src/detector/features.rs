//! Feature extraction
//!
//! Computes a six-dimensional statistical summary of the most recent feature
//! window: moments, extremes, RMS and a least-squares trend.

use serde::{Deserialize, Serialize};

use super::store::Sample;

/// Feature names, index-aligned with [`FeatureVector::as_array`]
pub const FEATURE_NAMES: &[&str] = &["mean", "std_dev", "min", "max", "rms", "trend"];

/// Number of features extracted
pub const NUM_FEATURES: usize = 6;

/// Denominator magnitude below which the trend fit is degenerate
const TREND_EPSILON: f32 = 1e-3;

/// Statistical summary of one feature window
///
/// Recomputed wholesale per extraction; a zero vector means "no signal yet",
/// never a valid baseline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub mean: f32,
    pub std_dev: f32,
    pub min: f32,
    pub max: f32,
    pub rms: f32,
    /// Least-squares slope of the filtered value over the window index
    pub trend: f32,
}

impl FeatureVector {
    /// Window spread, `max - min`
    pub fn range(&self) -> f32 {
        self.max - self.min
    }

    /// Values in [`FEATURE_NAMES`] order
    pub fn as_array(&self) -> [f32; NUM_FEATURES] {
        [
            self.mean,
            self.std_dev,
            self.min,
            self.max,
            self.rms,
            self.trend,
        ]
    }
}

/// Extract the feature vector from a chronological window of samples.
///
/// Operates on filtered values. An empty window yields the zero vector; a
/// window too small for a meaningful fit gets `trend = 0`.
pub fn extract(window: &[Sample]) -> FeatureVector {
    let mut sum = 0.0f32;
    let mut sum_sq = 0.0f32;
    let mut min = f32::MAX;
    let mut max = f32::MIN;
    let mut count = 0usize;

    for sample in window.iter().filter(|s| s.valid) {
        let v = sample.filtered;
        sum += v;
        sum_sq += v * v;
        min = min.min(v);
        max = max.max(v);
        count += 1;
    }

    if count == 0 {
        return FeatureVector::default();
    }

    let n = count as f32;
    let mean = sum / n;
    // Clamp before the square root: near-constant series can round to a
    // tiny negative variance
    let variance = (sum_sq / n - mean * mean).max(0.0);
    let std_dev = variance.sqrt();
    let rms = (sum_sq / n).sqrt();

    // Trend: ordinary least-squares slope of value against sample index
    let mut sum_x = 0.0f32;
    let mut sum_xy = 0.0f32;
    let mut sum_x2 = 0.0f32;
    for (i, sample) in window.iter().filter(|s| s.valid).enumerate() {
        let x = i as f32;
        sum_x += x;
        sum_xy += x * sample.filtered;
        sum_x2 += x * x;
    }

    let denominator = n * sum_x2 - sum_x * sum_x;
    let trend = if denominator.abs() > TREND_EPSILON {
        (n * sum_xy - sum_x * sum) / denominator
    } else {
        0.0
    };

    FeatureVector {
        mean,
        std_dev,
        min,
        max,
        rms,
        trend,
    }
}
