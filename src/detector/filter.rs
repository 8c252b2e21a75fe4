//! Signal conditioning
//!
//! Low-pass smoothing of raw samples plus a Chauvenet-style outlier check.

/// Single-pole low-pass filter (exponential moving average).
///
/// The first sample after construction or [`reset`](EmaFilter::reset) passes
/// through unchanged and seeds the filter state, so a cold filter never
/// reports zero.
#[derive(Debug, Clone)]
pub struct EmaFilter {
    alpha: f32,
    state: f32,
    primed: bool,
}

impl EmaFilter {
    /// Create a filter with smoothing coefficient `alpha` in (0, 1)
    pub fn new(alpha: f32) -> Self {
        Self {
            alpha,
            state: 0.0,
            primed: false,
        }
    }

    /// Smooth one raw sample and return the filtered value
    pub fn apply(&mut self, raw: f32) -> f32 {
        if !self.primed {
            self.state = raw;
            self.primed = true;
            return raw;
        }

        self.state = self.alpha * raw + (1.0 - self.alpha) * self.state;
        self.state
    }

    /// Clear state and re-arm the cold-start pass-through
    pub fn reset(&mut self) {
        self.primed = false;
        self.state = 0.0;
    }
}

/// Chauvenet-style outlier check (~3.5 sigma for small windows).
///
/// Returns `false` for near-zero spread so a flat signal never flags.
pub fn is_outlier(value: f32, mean: f32, std_dev: f32, zscore_cutoff: f32) -> bool {
    if std_dev < 1e-3 {
        return false;
    }
    ((value - mean).abs() / std_dev) > zscore_cutoff
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_sample_passes_through() {
        let mut filter = EmaFilter::new(0.2);
        assert_eq!(filter.apply(42.0), 42.0);
        // Second sample is smoothed toward the first
        let second = filter.apply(0.0);
        assert!(second > 0.0 && second < 42.0);
    }

    #[test]
    fn test_converges_without_overshoot() {
        let alpha = 0.2f32;
        let mut filter = EmaFilter::new(alpha);
        filter.apply(0.0);

        let target = 10.0f32;
        // Settling bound: -3 / ln(1 - alpha) ticks brings the error under ~5%
        let settle_ticks = (-3.0 / (1.0 - alpha).ln()).ceil() as usize;

        let mut prev = 0.0f32;
        let mut out = 0.0f32;
        for _ in 0..settle_ticks {
            out = filter.apply(target);
            assert!(out <= target, "filter overshot: {} > {}", out, target);
            assert!(out >= prev, "filter moved away from target");
            prev = out;
        }

        assert!((target - out).abs() < target * 0.05 + 0.01);
    }

    #[test]
    fn test_constant_input_is_fixed_point() {
        let mut filter = EmaFilter::new(0.3);
        for _ in 0..20 {
            assert_eq!(filter.apply(5.5), 5.5);
        }
    }

    #[test]
    fn test_reset_rearms_cold_start() {
        let mut filter = EmaFilter::new(0.2);
        filter.apply(100.0);
        filter.apply(100.0);
        filter.reset();
        // After reset the next sample passes through unchanged again
        assert_eq!(filter.apply(-7.0), -7.0);
    }

    #[test]
    fn test_outlier_check() {
        assert!(is_outlier(100.0, 50.0, 10.0, 3.5));
        assert!(!is_outlier(60.0, 50.0, 10.0, 3.5));
        // Near-zero spread never flags
        assert!(!is_outlier(1000.0, 0.0, 0.0005, 3.5));
    }
}
