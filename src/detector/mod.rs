//! Detection pipeline
//!
//! Conditions raw samples, maintains the sliding window, and drives the
//! Learning → BaselineComputed → Operational state machine that turns each
//! feature window into a classified, explained decision.
//!
//! # Example
//! ```ignore
//! use driftwatch::{Detector, DetectorConfig};
//!
//! let mut detector = Detector::new(DetectorConfig::default())?;
//!
//! // One call per sampling period, with a monotonic millisecond clock
//! if let Some(decision) = detector.process_sample(reading, now_ms) {
//!     if decision.is_anomaly {
//!         println!("anomaly: {:?}", decision.primary_reason);
//!     }
//! }
//! ```

pub mod baseline;
pub mod features;
pub mod filter;
pub mod scorer;
pub mod store;
pub mod threshold;

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::DetectorConfig;
use crate::error::{DetectorError, Result};

pub use baseline::{BaselineModel, PersistedModel};
pub use features::{FeatureVector, FEATURE_NAMES, NUM_FEATURES};
pub use filter::EmaFilter;
pub use scorer::{FeatureRanges, RuleScorer};
pub use store::{Sample, SampleStore};
pub use threshold::{ThresholdController, THRESHOLD_MAX, THRESHOLD_MIN};

/// Multiple of baseline noise beyond which a mean move reads as a shift
const MEAN_SHIFT_SIGMA: f32 = 2.0;
/// Multiple of baseline noise beyond which variance reads as high
const HIGH_VARIANCE_FACTOR: f32 = 1.8;
/// Multiple of baseline RMS beyond which amplitude reads as increased
const AMPLITUDE_FACTOR: f32 = 2.0;
/// Slope magnitude beyond which the primary reason is a rapid trend
const RAPID_TREND_REASON_CUTOFF: f32 = 3.0;
/// Fraction of baseline RMS below which the window reads as abnormally stable
const STABLE_RANGE_FACTOR: f32 = 0.2;

/// Detection phases. `BaselineComputed` is a single-tick transition that
/// seeds the model and immediately advances to `Operational`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectionPhase {
    /// Accumulating samples, no classification decisions
    Learning,
    /// Baseline seeded from the final learning window
    BaselineComputed,
    /// Classifying every feature window
    Operational,
}

/// Primary explanation attached to an anomalous decision, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnomalyReason {
    /// Window mean moved beyond 2 sigma of the baseline
    MeanShift,
    /// Window variance beyond 1.8x baseline
    HighVariance,
    /// Window RMS beyond 2x baseline
    SignalAmplitudeIncrease,
    /// Slope magnitude beyond the rapid-change cutoff
    RapidTrend,
    /// Score over threshold without a single dominant rule
    CombinedDeviation,
}

impl AnomalyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyReason::MeanShift => "mean_shift",
            AnomalyReason::HighVariance => "high_variance",
            AnomalyReason::SignalAmplitudeIncrease => "signal_amplitude_increase",
            AnomalyReason::RapidTrend => "rapid_trend",
            AnomalyReason::CombinedDeviation => "combined_deviation",
        }
    }
}

/// Secondary observation attached independently of the primary reason
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SecondaryReason {
    /// Window range collapsed relative to baseline signal energy
    AbnormallyStable,
}

impl SecondaryReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecondaryReason::AbnormallyStable => "abnormally_stable",
        }
    }
}

/// One classification outcome. Immutable once produced.
#[derive(Debug, Clone, Serialize)]
pub struct Decision {
    pub is_anomaly: bool,
    /// Anomaly score in `[0, 1]`
    pub score: f32,
    pub primary_reason: Option<AnomalyReason>,
    pub secondary_reason: Option<SecondaryReason>,
    /// Score itself when anomalous, `1 - score` when normal
    pub confidence: f32,
    /// Monotonic milliseconds of the classification tick
    pub timestamp: u32,
}

/// Running pipeline counters
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct DetectorMetrics {
    pub samples_ingested: u64,
    pub total_predictions: u64,
    pub anomalies_detected: u64,
    /// Raw samples flagged by the conditioning outlier check
    pub outliers_flagged: u64,
    pub detection_rate: f32,
}

/// Point-in-time view of the detector for reporting collaborators
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticsSnapshot {
    pub phase: DetectionPhase,
    pub features: FeatureVector,
    pub model: Option<BaselineModel>,
    pub metrics: DetectorMetrics,
}

/// Single-channel anomaly detector
///
/// Owns the whole pipeline; the only externally visible artifact per cycle is
/// the returned [`Decision`]. Single-threaded by design: one logical tick per
/// sampling period, driven by the caller's monotonic clock.
pub struct Detector {
    config: DetectorConfig,
    phase: DetectionPhase,
    filter: EmaFilter,
    store: SampleStore,
    scorer: RuleScorer,
    controller: ThresholdController,
    ranges: FeatureRanges,
    model: Option<BaselineModel>,
    current_features: FeatureVector,
    learning_started: Option<u32>,
    last_feature_update: Option<u32>,
    metrics: DetectorMetrics,
}

impl Detector {
    /// Create a detector in the learning phase
    pub fn new(config: DetectorConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            filter: EmaFilter::new(config.filter.alpha),
            store: SampleStore::new(config.window.buffer_capacity),
            scorer: RuleScorer::default(),
            controller: ThresholdController::new(config.detection.base_threshold),
            ranges: FeatureRanges::default(),
            model: None,
            current_features: FeatureVector::default(),
            learning_started: None,
            last_feature_update: None,
            metrics: DetectorMetrics::default(),
            phase: DetectionPhase::Learning,
            config,
        })
    }

    /// Ingest one raw sample.
    ///
    /// Conditions and stores the sample every call; extracts features and
    /// (once operational) classifies only when the update interval has
    /// elapsed, so a late tick is skipped rather than queued. Returns the
    /// decision for classification ticks, `None` otherwise.
    pub fn process_sample(&mut self, raw: f32, now_ms: u32) -> Option<Decision> {
        self.flag_outlier(raw);

        let filtered = self.filter.apply(raw);
        self.store.push(raw, filtered, now_ms);
        self.metrics.samples_ingested += 1;

        if self.learning_started.is_none() && self.phase == DetectionPhase::Learning {
            self.learning_started = Some(now_ms);
        }

        // Wrapping subtraction: a millisecond clock rolls over after ~49 days
        let due = match self.last_feature_update {
            None => true,
            Some(last) => now_ms.wrapping_sub(last) >= self.config.detection.update_interval_ms,
        };
        if !due {
            return None;
        }
        self.last_feature_update = Some(now_ms);

        self.current_features =
            features::extract(&self.store.window(self.config.window.feature_window));

        match self.phase {
            DetectionPhase::Learning => {
                let started = self.learning_started.unwrap_or(now_ms);
                if now_ms.wrapping_sub(started) >= self.config.learning.duration_ms {
                    if let Err(e) = self.complete_learning() {
                        warn!("learning incomplete: {}", e);
                    }
                }
                // The transition tick itself never classifies
                None
            }
            DetectionPhase::BaselineComputed => None,
            DetectionPhase::Operational => Some(self.classify(now_ms)),
        }
    }

    /// Flag (but keep) raw samples far outside the current window statistics
    fn flag_outlier(&mut self, raw: f32) {
        if self.store.count_valid() < self.config.learning.min_samples {
            return;
        }
        let f = &self.current_features;
        if filter::is_outlier(raw, f.mean, f.std_dev, self.config.filter.outlier_zscore) {
            self.metrics.outliers_flagged += 1;
            debug!(
                raw,
                mean = f.mean,
                std_dev = f.std_dev,
                "sample flagged as outlier"
            );
        }
    }

    /// Seed the baseline from the final learning window and go operational
    fn complete_learning(&mut self) -> Result<()> {
        let collected = self.store.count_valid();
        let required = self.config.learning.min_samples;
        if collected < required {
            return Err(DetectorError::InsufficientSamples {
                collected,
                required,
            });
        }

        self.phase = DetectionPhase::BaselineComputed;

        let mut model = BaselineModel::from_features(&self.current_features);
        model.adaptive_threshold = self.controller.initialize(model.baseline_std);
        self.ranges.calibrate(&self.current_features);

        info!(
            samples = collected,
            baseline_mean = model.baseline_mean,
            baseline_std = model.baseline_std,
            baseline_rms = model.baseline_rms,
            adaptive_threshold = model.adaptive_threshold,
            "baseline established, entering operational phase"
        );

        self.model = Some(model);
        self.phase = DetectionPhase::Operational;
        Ok(())
    }

    /// Score the current window and explain the outcome.
    /// Order per tick: score, decide, update counters, then the periodic
    /// threshold update and diagnostics.
    fn classify(&mut self, now_ms: u32) -> Decision {
        let features = self.current_features;

        let Some(model) = self.model.as_mut() else {
            // Operational without a model cannot be reached via the public API
            return Decision {
                is_anomaly: false,
                score: 0.0,
                primary_reason: None,
                secondary_reason: None,
                confidence: 0.0,
                timestamp: now_ms,
            };
        };

        let score = self.scorer.score(&features, model, &self.ranges);
        let is_anomaly = score > model.adaptive_threshold;

        let primary_reason = if is_anomaly {
            Some(
                if (features.mean - model.baseline_mean).abs()
                    > model.baseline_std * MEAN_SHIFT_SIGMA
                {
                    AnomalyReason::MeanShift
                } else if features.std_dev > model.baseline_std * HIGH_VARIANCE_FACTOR {
                    AnomalyReason::HighVariance
                } else if features.rms > model.baseline_rms * AMPLITUDE_FACTOR {
                    AnomalyReason::SignalAmplitudeIncrease
                } else if features.trend.abs() > RAPID_TREND_REASON_CUTOFF {
                    AnomalyReason::RapidTrend
                } else {
                    AnomalyReason::CombinedDeviation
                },
            )
        } else {
            None
        };

        // Attached independently of the primary classification
        let secondary_reason = if model.baseline_rms > 0.0
            && features.range() < STABLE_RANGE_FACTOR * model.baseline_rms
        {
            Some(SecondaryReason::AbnormallyStable)
        } else {
            None
        };

        let confidence = if is_anomaly { score } else { 1.0 - score };

        model.record(is_anomaly);
        self.metrics.total_predictions += 1;
        if is_anomaly {
            self.metrics.anomalies_detected += 1;
        }
        self.metrics.detection_rate =
            self.metrics.anomalies_detected as f32 / self.metrics.total_predictions as f32;

        if self.metrics.total_predictions % u64::from(self.config.detection.threshold_update_every)
            == 0
        {
            self.controller.update(model);
            debug!(
                threshold = model.adaptive_threshold,
                "adaptive threshold updated"
            );
        }

        if self.metrics.total_predictions % u64::from(self.config.detection.diagnostics_every) == 0
        {
            info!(
                mean = features.mean,
                baseline_mean = model.baseline_mean,
                std_dev = features.std_dev,
                baseline_std = model.baseline_std,
                rms = features.rms,
                baseline_rms = model.baseline_rms,
                trend = features.trend,
                threshold = model.adaptive_threshold,
                detection_rate = self.metrics.detection_rate,
                predictions = self.metrics.total_predictions,
                "periodic diagnostics"
            );
        }

        Decision {
            is_anomaly,
            score,
            primary_reason,
            secondary_reason,
            confidence,
            timestamp: now_ms,
        }
    }

    /// Discard the learned model and re-enter the learning phase
    pub fn relearn(&mut self, now_ms: u32) {
        self.filter.reset();
        self.store.clear();
        self.model = None;
        self.ranges = FeatureRanges::default();
        self.current_features = FeatureVector::default();
        self.learning_started = Some(now_ms);
        self.last_feature_update = None;
        self.metrics = DetectorMetrics::default();
        self.phase = DetectionPhase::Learning;
        info!("relearn requested, baseline discarded");
    }

    /// Current phase
    pub fn phase(&self) -> DetectionPhase {
        self.phase
    }

    /// True while no classification decisions are being made
    pub fn is_learning(&self) -> bool {
        self.phase == DetectionPhase::Learning
    }

    /// Running counters
    pub fn metrics(&self) -> &DetectorMetrics {
        &self.metrics
    }

    /// Most recently extracted feature vector
    pub fn current_features(&self) -> &FeatureVector {
        &self.current_features
    }

    /// Learned baseline, if operational
    pub fn model(&self) -> Option<&BaselineModel> {
        self.model.as_ref()
    }

    /// Configuration reference
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Point-in-time snapshot for reporting collaborators
    pub fn diagnostics(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            phase: self.phase,
            features: self.current_features,
            model: self.model.clone(),
            metrics: self.metrics,
        }
    }

    /// Persist the baseline model and calibrated ranges
    pub fn save_model(&self, path: &Path) -> anyhow::Result<()> {
        let model = self.model.clone().ok_or(DetectorError::NotCalibrated)?;
        let record = PersistedModel {
            model,
            ranges: self.ranges.clone(),
        };
        record.save(path)?;
        info!(path = %path.display(), "model saved");
        Ok(())
    }

    /// Load a persisted model and skip the learning phase
    pub fn load_model(&mut self, path: &Path) -> anyhow::Result<()> {
        let record = PersistedModel::load(path)?;
        self.ranges = record.ranges;
        self.model = Some(record.model);
        self.phase = DetectionPhase::Operational;
        info!(path = %path.display(), "model loaded, skipping learning phase");
        Ok(())
    }
}
