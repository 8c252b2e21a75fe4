//! Adaptive threshold controller
//!
//! Hand-tuned multiplicative control loop for the decision threshold. Not a
//! principled Bayesian posterior: it converges empirically on steady inputs
//! but carries no formal convergence guarantee.

use serde::{Deserialize, Serialize};

use super::baseline::BaselineModel;

/// Hard lower bound the adaptive threshold may never leave
pub const THRESHOLD_MIN: f32 = 0.40;
/// Hard upper bound the adaptive threshold may never leave
pub const THRESHOLD_MAX: f32 = 0.80;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdController {
    base_threshold: f32,
    /// Margin added per unit of baseline noise at initialization
    std_margin: f32,
    /// Multiplier applied when almost everything reads normal
    tighten_step: f32,
    /// Multiplier applied when anomalies dominate
    relax_step: f32,
    high_normal_ratio: f32,
    low_normal_ratio: f32,
}

impl Default for ThresholdController {
    fn default() -> Self {
        Self::new(0.6)
    }
}

impl ThresholdController {
    pub fn new(base_threshold: f32) -> Self {
        Self {
            base_threshold,
            std_margin: 0.15,
            tighten_step: 0.98,
            relax_step: 1.02,
            high_normal_ratio: 0.95,
            low_normal_ratio: 0.80,
        }
    }

    /// Initial threshold for a freshly learned baseline
    pub fn initialize(&self, baseline_std: f32) -> f32 {
        (self.base_threshold + baseline_std * self.std_margin).clamp(THRESHOLD_MIN, THRESHOLD_MAX)
    }

    /// One periodic adjustment from the running normal/anomaly counts.
    /// The result is clamped unconditionally, preventing runaway drift.
    pub fn update(&self, model: &mut BaselineModel) {
        let total = model.total_decisions().max(1);
        let normal_ratio = model.normal_count as f32 / total as f32;

        if normal_ratio > self.high_normal_ratio {
            // Almost everything normal: become more sensitive
            model.adaptive_threshold *= self.tighten_step;
        } else if normal_ratio < self.low_normal_ratio {
            // Anomalies dominate: back off
            model.adaptive_threshold *= self.relax_step;
        }

        model.adaptive_threshold = model.adaptive_threshold.clamp(THRESHOLD_MIN, THRESHOLD_MAX);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model_with(normal: u32, anomaly: u32, threshold: f32) -> BaselineModel {
        let mut model = BaselineModel::from_features(&Default::default());
        model.normal_count = normal;
        model.anomaly_count = anomaly;
        model.adaptive_threshold = threshold;
        model
    }

    #[test]
    fn test_initialize_adds_noise_margin() {
        let controller = ThresholdController::new(0.6);
        assert!((controller.initialize(0.5) - 0.675).abs() < 1e-5);
        // Noisy baselines still start inside the clamp band
        assert_eq!(controller.initialize(10.0), THRESHOLD_MAX);
    }

    #[test]
    fn test_high_normal_ratio_tightens() {
        let controller = ThresholdController::default();
        let mut model = model_with(96, 4, 0.675);
        controller.update(&mut model);
        assert!((model.adaptive_threshold - 0.675 * 0.98).abs() < 1e-5);
    }

    #[test]
    fn test_exact_boundary_ratio_is_unchanged() {
        let controller = ThresholdController::default();
        // 95/100 is not strictly above the gate
        let mut model = model_with(95, 5, 0.675);
        controller.update(&mut model);
        assert_eq!(model.adaptive_threshold, 0.675);
    }

    #[test]
    fn test_low_normal_ratio_relaxes() {
        let controller = ThresholdController::default();
        let mut model = model_with(70, 30, 0.675);
        controller.update(&mut model);
        assert!((model.adaptive_threshold - 0.675 * 1.02).abs() < 1e-5);
    }

    #[test]
    fn test_bounds_hold_under_repeated_updates() {
        let controller = ThresholdController::default();

        // Tighten until the lower clamp engages
        let mut model = model_with(99, 1, 0.675);
        for _ in 0..200 {
            controller.update(&mut model);
            assert!(model.adaptive_threshold >= THRESHOLD_MIN);
            assert!(model.adaptive_threshold <= THRESHOLD_MAX);
        }
        assert!((model.adaptive_threshold - THRESHOLD_MIN).abs() < 1e-5);

        // Relax until the upper clamp engages
        let mut model = model_with(10, 90, 0.675);
        for _ in 0..200 {
            controller.update(&mut model);
            assert!(model.adaptive_threshold >= THRESHOLD_MIN);
            assert!(model.adaptive_threshold <= THRESHOLD_MAX);
        }
        assert!((model.adaptive_threshold - THRESHOLD_MAX).abs() < 1e-5);
    }

    #[test]
    fn test_zero_decisions_reads_as_all_anomalous() {
        let controller = ThresholdController::default();
        // The max(1) guard makes an empty history a zero normal ratio
        let mut model = model_with(0, 0, 0.6);
        controller.update(&mut model);
        assert!((model.adaptive_threshold - 0.612).abs() < 1e-5);
    }
}
