//! Feed the detector a synthetic sensor stream and print its decisions.
//!
//! Runs on a simulated millisecond clock, so a one-hour scenario finishes in
//! well under a second. Useful for eyeballing phase transitions, threshold
//! drift and the reason labels without hardware attached.

use std::f32::consts::TAU;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use rand::Rng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use driftwatch::{Detector, DetectorConfig};

/// Sampling period of the simulated sensor, in simulated milliseconds
const SAMPLE_PERIOD_MS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum InjectMode {
    /// Clean signal end to end
    None,
    /// Step the signal level up and add a fast oscillation
    MeanShift,
    /// Multiply the noise floor
    VarianceBurst,
    /// Freeze the signal at its current level
    Flatline,
}

#[derive(Debug, Parser)]
#[command(name = "simulate", about = "Synthetic sensor stream for the detector")]
struct Args {
    /// Optional TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Simulated runtime in seconds
    #[arg(short, long, default_value_t = 180)]
    seconds: u32,

    /// Base signal level
    #[arg(long, default_value_t = 1.65)]
    level: f32,

    /// Uniform noise amplitude around the base level
    #[arg(long, default_value_t = 0.05)]
    noise: f32,

    /// Disturbance to inject partway through the run
    #[arg(long, value_enum, default_value = "none")]
    inject: InjectMode,

    /// Simulated second at which the disturbance starts
    #[arg(long, default_value_t = 90)]
    inject_at: u32,

    /// Print every decision as a JSON line instead of only anomalies
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => DetectorConfig::load(path)?,
        None => DetectorConfig::default(),
    };

    info!(
        seconds = args.seconds,
        inject = ?args.inject,
        inject_at = args.inject_at,
        "starting simulation"
    );

    let mut detector = Detector::new(config)?;
    let mut rng = rand::thread_rng();

    let total_samples = args.seconds * 1_000 / SAMPLE_PERIOD_MS;
    let inject_from = args.inject_at * 1_000;

    for i in 0..total_samples {
        let now_ms = i * SAMPLE_PERIOD_MS;
        let t = now_ms as f32 / 1_000.0;

        // Slow drift plus uniform noise is the "healthy" channel
        let mut value = args.level
            + 0.3 * (TAU * t / 20.0).sin()
            + rng.gen_range(-args.noise..=args.noise);

        if args.inject != InjectMode::None && now_ms >= inject_from {
            match args.inject {
                InjectMode::MeanShift => {
                    value += args.level * 0.6 + 0.4 * (TAU * t / 0.5).sin();
                }
                InjectMode::VarianceBurst => {
                    value += rng.gen_range(-args.noise * 12.0..=args.noise * 12.0);
                }
                InjectMode::Flatline => {
                    value = args.level;
                }
                InjectMode::None => {}
            }
        }

        let Some(decision) = detector.process_sample(value, now_ms) else {
            continue;
        };

        if args.json {
            println!("{}", serde_json::to_string(&decision)?);
        } else if decision.is_anomaly {
            let reason = decision
                .primary_reason
                .map(|r| r.as_str())
                .unwrap_or("unknown");
            println!(
                "[{:>7.2}s] anomaly: {} (score {:.3}, confidence {:.3})",
                t, reason, decision.score, decision.confidence
            );
        }
    }

    let metrics = detector.metrics();
    info!(
        samples = metrics.samples_ingested,
        predictions = metrics.total_predictions,
        anomalies = metrics.anomalies_detected,
        detection_rate = metrics.detection_rate,
        "simulation complete"
    );

    Ok(())
}
