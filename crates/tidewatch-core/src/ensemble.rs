//! Three-head ensemble over one feature matrix.
//!
//! - risk:      gradient-boosted regression on the continuous risk score
//! - severity:  random-forest classifier, 4 classes
//! - intensity: random-forest classifier, 5 classes
//!
//! The heads share the feature layout and the fitted codec and nothing else.
//! Confidence comes from the severity head only.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::codec::{CategoricalCodec, CategoricalColumn};
use crate::dataset::TrainingRecord;
use crate::error::{CoastError, Result};
use crate::labeling::{IntensityBin, Severity};
use crate::model::forest::argmax;
use crate::model::{
    BinnedMatrix, ForestParams, GbdtParams, GradientBoostedRegressor, RandomForestClassifier, MAX_BINS,
};
use crate::schema::{FeatureRow, FeatureSchema};

/// Bumped whenever the snapshot layout or the feature semantics change.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// Reported confidence never leaves this band.
pub const CONFIDENCE_FLOOR: f64 = 0.6;
pub const CONFIDENCE_CEILING: f64 = 0.98;

const TOP_FACTORS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Full 17-column layout when true, 14-column base layout otherwise.
    pub include_geology: bool,
    pub max_bins: usize,
    pub risk: GbdtParams,
    pub severity: ForestParams,
    pub intensity: ForestParams,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            include_geology: true,
            max_bins: MAX_BINS,
            risk: GbdtParams::default(),
            severity: ForestParams { n_trees: 150, max_depth: 12, min_samples_split: 5, ..ForestParams::default() },
            intensity: ForestParams { n_trees: 150, max_depth: 10, ..ForestParams::default() },
        }
    }
}

impl ModelConfig {
    pub fn schema(&self) -> FeatureSchema {
        FeatureSchema::with_geology(self.include_geology)
    }

    /// Checks every head's parameters and the bin budget before any fitting starts.
    pub fn validate(&self) -> Result<()> {
        if !(2..=MAX_BINS).contains(&self.max_bins) {
            return Err(CoastError::Training(format!(
                "max_bins must be in 2..={MAX_BINS}, got {}",
                self.max_bins
            )));
        }
        self.risk.validate()?;
        self.severity.validate()?;
        self.intensity.validate()
    }
}

/// Fit quality on the training table itself.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TrainingMetrics {
    pub rows: usize,
    pub risk_r2: f64,
    pub severity_accuracy: f64,
    pub intensity_accuracy: f64,
}

/// One feature's share of the heuristic ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributingFactor {
    pub feature: String,
    pub value: f64,
    pub importance: f64,
}

/// Raw outputs of the three heads for one feature row.
#[derive(Debug, Clone, PartialEq)]
pub struct EnsembleOutput {
    /// Clamped to [0, 1].
    pub risk_score: f64,
    pub severity: Severity,
    pub intensity_bin: IntensityBin,
    /// Max severity class probability, clamped to the confidence band.
    pub confidence: f64,
    pub severity_probabilities: Vec<f64>,
    pub top_factors: Vec<ContributingFactor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSnapshot {
    pub format_version: u32,
    pub columns: Vec<String>,
    pub codec: CategoricalCodec,
    pub risk_model: GradientBoostedRegressor,
    pub severity_model: RandomForestClassifier,
    pub intensity_model: RandomForestClassifier,
    pub metrics: TrainingMetrics,
    pub created_at: DateTime<Utc>,
}

impl ModelSnapshot {
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(path, serde_json::to_vec(self)?)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        let snapshot: ModelSnapshot = serde_json::from_slice(&bytes)?;
        if snapshot.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(CoastError::Snapshot(format!(
                "snapshot format v{} is not supported (expected v{SNAPSHOT_FORMAT_VERSION})",
                snapshot.format_version
            )));
        }
        Ok(snapshot)
    }
}

#[derive(Debug, Clone)]
pub struct EnsemblePredictor {
    schema: FeatureSchema,
    codec: CategoricalCodec,
    risk: GradientBoostedRegressor,
    severity: RandomForestClassifier,
    intensity: RandomForestClassifier,
    metrics: TrainingMetrics,
    created_at: DateTime<Utc>,
}

impl EnsemblePredictor {
    /// Fit the codec and all three heads on `records`.
    pub fn fit<R: Rng + ?Sized>(records: &[TrainingRecord], config: &ModelConfig, rng: &mut R) -> Result<Self> {
        config.validate()?;
        let codec = CategoricalCodec::fit(records)?;
        let schema = config.schema();

        let rows: Vec<Vec<f64>> = records
            .iter()
            .map(|r| schema.project(&FeatureRow::from_record(r, &codec)))
            .collect();
        let data = BinnedMatrix::fit(&rows, config.max_bins)?;
        tracing::info!(rows = rows.len(), columns = schema.len(), "fitting ensemble");

        let targets: Vec<f64> = records.iter().map(|r| r.risk_score).collect();
        let severity_labels = class_codes(records, &codec, CategoricalColumn::Severity, |r| r.severity.label())?;
        let intensity_labels =
            class_codes(records, &codec, CategoricalColumn::IntensityBin, |r| r.intensity_bin.label())?;

        let risk = GradientBoostedRegressor::fit(&data, &targets, &config.risk, rng)?;
        tracing::debug!(trees = risk.n_trees(), "risk head fitted");
        let severity = RandomForestClassifier::fit(
            &data,
            &severity_labels,
            codec.cardinality(CategoricalColumn::Severity),
            &config.severity,
            rng.gen(),
        )?;
        tracing::debug!(trees = severity.n_trees(), "severity head fitted");
        let intensity = RandomForestClassifier::fit(
            &data,
            &intensity_labels,
            codec.cardinality(CategoricalColumn::IntensityBin),
            &config.intensity,
            rng.gen(),
        )?;
        tracing::debug!(trees = intensity.n_trees(), "intensity head fitted");

        let metrics = TrainingMetrics {
            rows: rows.len(),
            risk_r2: r_squared(&targets, rows.iter().map(|x| risk.predict(x))),
            severity_accuracy: accuracy(&severity_labels, rows.iter().map(|x| severity.predict(x))),
            intensity_accuracy: accuracy(&intensity_labels, rows.iter().map(|x| intensity.predict(x))),
        };
        tracing::info!(
            r2 = metrics.risk_r2,
            severity_acc = metrics.severity_accuracy,
            intensity_acc = metrics.intensity_accuracy,
            "ensemble trained"
        );

        let predictor = Self { schema, codec, risk, severity, intensity, metrics, created_at: Utc::now() };
        for (name, imp) in predictor.ranked_importances().iter().take(10) {
            tracing::debug!(feature = %name, importance = imp, "risk feature importance");
        }
        Ok(predictor)
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn codec(&self) -> &CategoricalCodec {
        &self.codec
    }

    pub fn metrics(&self) -> TrainingMetrics {
        self.metrics
    }

    /// Risk-head importances paired with column names, largest first.
    pub fn ranked_importances(&self) -> Vec<(String, f64)> {
        let mut ranked: Vec<(String, f64)> = self
            .schema
            .names()
            .into_iter()
            .zip(self.risk.feature_importances().iter().copied())
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }

    /// Run the three heads on one reconstructed feature row.
    pub fn predict(&self, row: &FeatureRow) -> Result<EnsembleOutput> {
        let x = self.schema.project(row);

        let risk_score = self.risk.predict(&x).clamp(0.0, 1.0);
        let severity_probabilities = self.severity.predict_proba(&x);
        let severity: Severity = self.decode(CategoricalColumn::Severity, argmax(&severity_probabilities))?;
        let intensity_bin: IntensityBin = self.decode(CategoricalColumn::IntensityBin, self.intensity.predict(&x))?;

        let max_p = severity_probabilities.iter().copied().fold(0.0, f64::max);
        let confidence = max_p.clamp(CONFIDENCE_FLOOR, CONFIDENCE_CEILING);

        Ok(EnsembleOutput {
            risk_score,
            severity,
            intensity_bin,
            confidence,
            severity_probabilities,
            top_factors: self.top_factors(&x),
        })
    }

    /// Top features by |value × global risk importance|.
    ///
    /// This ranks with the model's global importances, not a per-prediction
    /// attribution: two queries with equal feature values always rank the
    /// same way regardless of how the trees route them.
    pub fn top_factors(&self, x: &[f64]) -> Vec<ContributingFactor> {
        let mut factors: Vec<ContributingFactor> = self
            .schema
            .columns()
            .iter()
            .zip(x)
            .zip(self.risk.feature_importances())
            .map(|((c, &value), &importance)| ContributingFactor { feature: c.name().to_string(), value, importance })
            .collect();
        factors.sort_by(|a, b| (b.value * b.importance).abs().total_cmp(&(a.value * a.importance).abs()));
        factors.truncate(TOP_FACTORS);
        factors
    }

    fn decode<T: std::str::FromStr>(&self, column: CategoricalColumn, class: usize) -> Result<T> {
        self.codec
            .decode(column, class as u32)
            .and_then(|label| label.parse().ok())
            .ok_or_else(|| CoastError::Snapshot(format!("{column} head produced unknown class {class}")))
    }

    pub fn to_snapshot(&self) -> ModelSnapshot {
        ModelSnapshot {
            format_version: SNAPSHOT_FORMAT_VERSION,
            columns: self.schema.names(),
            codec: self.codec.clone(),
            risk_model: self.risk.clone(),
            severity_model: self.severity.clone(),
            intensity_model: self.intensity.clone(),
            metrics: self.metrics,
            created_at: self.created_at,
        }
    }

    /// Rebuild from a snapshot, rejecting one fitted on another column layout.
    pub fn from_snapshot(snapshot: ModelSnapshot, expected: &FeatureSchema) -> Result<Self> {
        if snapshot.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(CoastError::Snapshot(format!(
                "snapshot format v{} is not supported (expected v{SNAPSHOT_FORMAT_VERSION})",
                snapshot.format_version
            )));
        }
        expected.check(&snapshot.columns)?;
        if snapshot.risk_model.feature_importances().len() != expected.len() {
            return Err(CoastError::Snapshot("risk model width differs from its column list".into()));
        }
        Ok(Self {
            schema: expected.clone(),
            codec: snapshot.codec,
            risk: snapshot.risk_model,
            severity: snapshot.severity_model,
            intensity: snapshot.intensity_model,
            metrics: snapshot.metrics,
            created_at: snapshot.created_at,
        })
    }
}

fn class_codes(
    records: &[TrainingRecord],
    codec: &CategoricalCodec,
    column: CategoricalColumn,
    label: impl Fn(&TrainingRecord) -> &'static str,
) -> Result<Vec<usize>> {
    records
        .iter()
        .map(|r| codec.try_encode(column, label(r)).map(|c| c as usize))
        .collect()
}

fn r_squared(targets: &[f64], predictions: impl Iterator<Item = f64>) -> f64 {
    let mean = targets.iter().sum::<f64>() / targets.len().max(1) as f64;
    let (ss_res, ss_tot) = targets
        .iter()
        .zip(predictions)
        .fold((0.0, 0.0), |(res, tot), (y, p)| (res + (y - p).powi(2), tot + (y - mean).powi(2)));
    if ss_tot > 0.0 {
        1.0 - ss_res / ss_tot
    } else {
        0.0
    }
}

fn accuracy(labels: &[usize], predictions: impl Iterator<Item = usize>) -> f64 {
    let hits = labels.iter().zip(predictions).filter(|(l, p)| **l == *p).count();
    hits as f64 / labels.len().max(1) as f64
}
