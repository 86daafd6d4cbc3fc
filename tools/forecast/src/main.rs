//! Coastal hazard forecast CLI: trains or loads the ensemble, then answers
//! one point query or a batch file and prints the results as JSON.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use serde::{Deserialize, Serialize};
use tidewatch_core::locations::{events_for_state, HistoricalEvent};
use tidewatch_core::{FixedClock, HazardService, PredictionResult, ServiceConfig, TrainOutcome};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "forecast")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Coastal hazard risk for a point or a batch of points", long_about = None)]
struct Args {
    /// Latitude of a single query
    #[arg(long, allow_hyphen_values = true, requires = "lng")]
    lat: Option<f64>,

    /// Longitude of a single query
    #[arg(long, allow_hyphen_values = true, requires = "lat")]
    lng: Option<f64>,

    /// Hazard type for a single query (default storm_surge)
    #[arg(long)]
    hazard: Option<String>,

    /// JSON file with an array of {"lat": .., "lng": ..} objects
    #[arg(short, long, conflicts_with_all = ["lat", "lng", "hazard"])]
    batch: Option<PathBuf>,

    /// Service config JSON
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Evaluate as of this date (YYYY-MM-DD) instead of today
    #[arg(long)]
    date: Option<NaiveDate>,

    /// Train from scratch even when a snapshot exists
    #[arg(long)]
    retrain: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Deserialize)]
struct BatchPoint {
    lat: f64,
    lng: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Report<'a> {
    #[serde(flatten)]
    prediction: &'a PredictionResult,
    historical_events: Vec<&'static HistoricalEvent>,
}

fn report(p: &PredictionResult) -> Report<'_> {
    Report { prediction: p, historical_events: events_for_state(p.nearest_location.state) }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set tracing subscriber")?;

    let config = match &args.config {
        Some(path) => ServiceConfig::from_json_file(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?,
        None => ServiceConfig::default(),
    };
    let snapshot = config.snapshot_path();

    let mut service = HazardService::new(config).context("Invalid service config")?;
    if let Some(date) = args.date {
        service = service.with_clock(Box::new(FixedClock(date)));
    }
    if args.retrain && snapshot.exists() {
        fs::remove_file(&snapshot).with_context(|| format!("Failed to remove {}", snapshot.display()))?;
    }

    match service.train_or_load().context("Failed to prepare models")? {
        TrainOutcome::Loaded => info!(path = %snapshot.display(), "using saved models"),
        TrainOutcome::Trained(m) => info!(
            rows = m.rows,
            r2 = m.risk_r2,
            severity_acc = m.severity_accuracy,
            intensity_acc = m.intensity_accuracy,
            "models trained"
        ),
    }

    let json = match (&args.batch, args.lat, args.lng) {
        (Some(path), _, _) => {
            let text = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
            let points: Vec<BatchPoint> = serde_json::from_str(&text).context("Malformed batch file")?;
            let locations: Vec<(f64, f64)> = points.iter().map(|p| (p.lat, p.lng)).collect();
            let results = service.predict_batch(&locations).context("Batch prediction failed")?;
            let reports: Vec<Report<'_>> = results.iter().map(report).collect();
            serde_json::to_string_pretty(&reports)?
        }
        (None, Some(lat), Some(lng)) => {
            let result = service.predict(lat, lng, args.hazard.as_deref()).context("Prediction failed")?;
            serde_json::to_string_pretty(&report(&result))?
        }
        _ => bail!("either --lat and --lng or --batch is required"),
    };

    println!("{json}");
    Ok(())
}
