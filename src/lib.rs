//! Self-calibrating anomaly detection for a single streaming sensor channel.
//!
//! The detector learns what "normal" looks like from its own input during a
//! learning phase, then classifies every feature window against the learned
//! baseline with a rule-based scorer and an adaptive decision threshold. No
//! labeled data, no pre-trained weights; everything is derived on-line from
//! the stream itself.
//!
//! # Pipeline
//!
//! ```text
//! raw sample -> EMA filter -> circular store -> feature window
//!            -> rule scorer -> adaptive threshold -> Decision
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use driftwatch::{Detector, DetectorConfig};
//!
//! let mut detector = Detector::new(DetectorConfig::default())?;
//!
//! loop {
//!     let reading = read_sensor();
//!     if let Some(decision) = detector.process_sample(reading, now_ms()) {
//!         if decision.is_anomaly {
//!             eprintln!("{:?} (score {:.2})", decision.primary_reason, decision.score);
//!         }
//!     }
//! }
//! ```

pub mod config;
pub mod detector;
pub mod error;

pub use config::DetectorConfig;
pub use detector::{
    AnomalyReason, BaselineModel, Decision, DetectionPhase, Detector, DetectorMetrics,
    DiagnosticsSnapshot, FeatureVector, SecondaryReason,
};
pub use error::{DetectorError, Result};
