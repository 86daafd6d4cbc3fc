//! Service facade: train or load the ensemble once, then answer point
//! queries.
//!
//! Fitted models are read-only after `train_or_load`. The only shared
//! mutable state is the RNG behind a `Mutex`, so `&HazardService` can be
//! handed to any number of threads.

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use crate::config::ServiceConfig;
use crate::coords::LatLon;
use crate::dataset::{DatasetAssembler, DatasetSummary};
use crate::ensemble::{
    ContributingFactor, EnsemblePredictor, ModelSnapshot, TrainingMetrics, SNAPSHOT_FORMAT_VERSION,
};
use crate::error::{CoastError, Result};
use crate::grid::Region;
use crate::hazard::{HazardSampler, HazardType};
use crate::inference::InferenceFeaturizer;
use crate::labeling::{IntensityBin, Severity};
use crate::locations::{affected_area, location_profile, LocationProfile};
use crate::synthesis::{round_to, FeatureSynthesizer, GeologicalSample, OceanographicSample};
use crate::temporal::{Clock, Season, SystemClock};

/// How `train_or_load` obtained its models.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrainOutcome {
    Loaded,
    Trained(TrainingMetrics),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OceanConditions {
    pub sst: f64,
    pub wave_height: f64,
    pub wind_speed: f64,
    pub current_velocity: f64,
    pub tide_level: f64,
}

impl From<&OceanographicSample> for OceanConditions {
    fn from(o: &OceanographicSample) -> Self {
        Self {
            sst: round_to(o.sst_celsius, 2),
            wave_height: round_to(o.wave_height_m, 2),
            wind_speed: round_to(o.wind_speed_kmh, 1),
            current_velocity: round_to(o.current_velocity_ms, 2),
            tide_level: round_to(o.tide_level_m, 2),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeologicalConditions {
    pub bathymetry_depth: f64,
    pub coastal_slope: f64,
    pub tidal_range: f64,
}

impl From<&GeologicalSample> for GeologicalConditions {
    fn from(g: &GeologicalSample) -> Self {
        Self {
            bathymetry_depth: round_to(g.bathymetry_depth_m, 1),
            coastal_slope: round_to(g.coastal_slope_deg, 2),
            tidal_range: round_to(g.tidal_range_m, 2),
        }
    }
}

/// One answered query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResult {
    /// The requested label, echoed even when it is not a known hazard.
    pub hazard_type: String,
    pub risk_score: f64,
    pub confidence: f64,
    pub severity: Severity,
    pub intensity_bin: IntensityBin,
    pub affected_area: String,
    pub sea_region: Region,
    pub season: Season,
    pub lat: f64,
    pub lng: f64,
    pub timestamp: DateTime<Utc>,
    pub oceanographic_conditions: OceanConditions,
    pub geological_conditions: GeologicalConditions,
    pub top_contributing_factors: Vec<ContributingFactor>,
    pub nearest_location: LocationProfile,
    pub model_version: String,
}

pub struct HazardService {
    config: ServiceConfig,
    clock: Box<dyn Clock>,
    rng: Mutex<StdRng>,
    featurizer: InferenceFeaturizer,
    batch_hazards: HazardSampler,
    predictor: Option<EnsemblePredictor>,
}

impl HazardService {
    /// Validates the configuration and lookup tables; trains nothing yet.
    pub fn new(config: ServiceConfig) -> Result<Self> {
        config.validate()?;
        let batch_hazards = config.batch_hazard_weights.sampler()?;
        let rng = match config.generation.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let featurizer = InferenceFeaturizer::new(FeatureSynthesizer::default(), config.generation.grid_step_deg);
        Ok(Self { config, clock: Box::new(SystemClock), rng: Mutex::new(rng), featurizer, batch_hazards, predictor: None })
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn is_trained(&self) -> bool {
        self.predictor.is_some()
    }

    pub fn predictor(&self) -> Option<&EnsemblePredictor> {
        self.predictor.as_ref()
    }

    /// Load the persisted snapshot when it matches the configured layout,
    /// otherwise generate a fresh table and train.
    pub fn train_or_load(&mut self) -> Result<TrainOutcome> {
        let path = self.config.snapshot_path();
        let expected = self.config.model.schema();

        if path.exists() {
            match ModelSnapshot::load(&path).and_then(|s| EnsemblePredictor::from_snapshot(s, &expected)) {
                Ok(predictor) => {
                    tracing::info!(path = %path.display(), "loaded ensemble snapshot");
                    self.predictor = Some(predictor);
                    return Ok(TrainOutcome::Loaded);
                }
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "snapshot unusable, retraining"),
            }
        }

        let generation = &self.config.generation;
        let assembler = DatasetAssembler::from_config(generation)?;

        let mut rng = self.lock_rng();
        let records = assembler.generate(generation.samples_per_cell, generation.temporal_sampling_rate, &mut *rng)?;
        DatasetSummary::from_records(&records).log();
        let predictor = EnsemblePredictor::fit(&records, &self.config.model, &mut *rng)?;
        drop(rng);

        if self.config.persist {
            if let Err(e) = predictor.to_snapshot().save(&path) {
                tracing::warn!(path = %path.display(), error = %e, "could not persist snapshot");
            } else {
                tracing::info!(path = %path.display(), "saved ensemble snapshot");
            }
        }

        let metrics = predictor.metrics();
        self.predictor = Some(predictor);
        Ok(TrainOutcome::Trained(metrics))
    }

    /// Answer one query. `hazard` defaults to `storm_surge`.
    pub fn predict(&self, lat: f64, lng: f64, hazard: Option<&str>) -> Result<PredictionResult> {
        let predictor = self.predictor.as_ref().ok_or(CoastError::UntrainedModel)?;
        let point = LatLon::checked(lat, lng)?;
        let hazard_label = match hazard.map(str::trim) {
            None => HazardType::DEFAULT.label(),
            Some("") => return Err(CoastError::Validation("hazard type must not be empty".into())),
            Some(label) => label,
        };

        let features = {
            let mut rng = self.lock_rng();
            self.featurizer.featurize(point, hazard_label, &*self.clock, predictor.codec(), &mut *rng)
        };
        let out = predictor.predict(&features.row)?;
        tracing::debug!(
            lat,
            lng,
            hazard = hazard_label,
            risk = out.risk_score,
            severity = %out.severity,
            "prediction"
        );

        Ok(PredictionResult {
            hazard_type: features.hazard_label,
            risk_score: round_to(out.risk_score, 3),
            confidence: round_to(out.confidence, 3),
            severity: out.severity,
            intensity_bin: out.intensity_bin,
            affected_area: affected_area(point).to_string(),
            sea_region: features.cell.region,
            season: features.window.season,
            lat,
            lng,
            timestamp: self.clock.now(),
            oceanographic_conditions: OceanConditions::from(&features.ocean),
            geological_conditions: GeologicalConditions::from(&features.geology),
            top_contributing_factors: out.top_factors,
            nearest_location: location_profile(lat, lng),
            model_version: model_version(),
        })
    }

    /// Answer many queries; each location's hazard is drawn from the batch
    /// weights of its region. Fails on the first invalid location.
    pub fn predict_batch(&self, locations: &[(f64, f64)]) -> Result<Vec<PredictionResult>> {
        if !self.is_trained() {
            return Err(CoastError::UntrainedModel);
        }
        locations
            .iter()
            .enumerate()
            .map(|(i, &(lat, lng))| {
                LatLon::checked(lat, lng).map_err(|e| CoastError::Validation(format!("location {i}: {e}")))?;
                let hazard = {
                    let mut rng = self.lock_rng();
                    self.batch_hazards.sample(Region::classify(lat, lng), &mut *rng)
                };
                self.predict(lat, lng, Some(hazard.label()))
            })
            .collect()
    }

    /// A poisoned lock only means another query panicked mid-draw; the
    /// generator state is still usable.
    fn lock_rng(&self) -> MutexGuard<'_, StdRng> {
        self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn model_version() -> String {
    format!("tidewatch-ensemble-v{SNAPSHOT_FORMAT_VERSION}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GenerationConfig;
    use crate::ensemble::tests::tiny_config;
    use crate::ensemble::{CONFIDENCE_CEILING, CONFIDENCE_FLOOR};
    use crate::locations::GENERIC_AREA;
    use crate::temporal::FixedClock;
    use chrono::NaiveDate;
    use std::path::Path;

    fn small_config(dir: &Path, seed: u64) -> ServiceConfig {
        ServiceConfig {
            data_dir: dir.to_path_buf(),
            generation: GenerationConfig {
                max_cells: 60,
                samples_per_cell: 2,
                temporal_sampling_rate: 0.05,
                seed: Some(seed),
                ..GenerationConfig::default()
            },
            model: tiny_config(),
            ..ServiceConfig::default()
        }
    }

    fn july() -> Box<dyn Clock> {
        Box::new(FixedClock(NaiveDate::from_ymd_opt(2025, 7, 15).unwrap()))
    }

    fn trained(dir: &Path, seed: u64) -> HazardService {
        let mut service = HazardService::new(small_config(dir, seed)).unwrap().with_clock(july());
        assert!(matches!(service.train_or_load().unwrap(), TrainOutcome::Trained(_)));
        service
    }

    #[test]
    fn untrained_service_refuses_queries() {
        let dir = tempfile::tempdir().unwrap();
        let service = HazardService::new(small_config(dir.path(), 1)).unwrap();
        assert!(!service.is_trained());
        assert!(matches!(service.predict(13.08, 80.27, None), Err(CoastError::UntrainedModel)));
        assert!(matches!(service.predict_batch(&[(13.08, 80.27)]), Err(CoastError::UntrainedModel)));
    }

    #[test]
    fn invalid_generation_config_fails_at_start() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = small_config(dir.path(), 1);
        config.generation.temporal_sampling_rate = 0.0;
        assert!(matches!(HazardService::new(config), Err(CoastError::GenerationConfig(_))));
    }

    #[test]
    fn invalid_model_config_fails_at_start() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = small_config(dir.path(), 1);
        config.model.intensity.n_trees = 0;
        assert!(matches!(HazardService::new(config), Err(CoastError::Training(_))));

        let mut config = small_config(dir.path(), 1);
        config.model.max_bins = 1;
        assert!(matches!(HazardService::new(config), Err(CoastError::Training(_))));
        assert!(!dir.path().join("ensemble_snapshot.json").exists());
    }

    #[test]
    fn end_to_end_query() {
        let dir = tempfile::tempdir().unwrap();
        let service = trained(dir.path(), 3);
        assert!(service.is_trained());
        assert!(dir.path().join("ensemble_snapshot.json").exists());

        let r = service.predict(13.08, 80.27, None).unwrap();
        assert_eq!(r.hazard_type, "storm_surge");
        assert_eq!(r.sea_region, Region::BayOfBengal);
        assert_eq!(r.season, Season::Monsoon);
        assert_eq!(r.affected_area, "Chennai Metropolitan Area");
        assert_eq!(r.nearest_location.closest_location, "Chennai");
        assert!((0.0..=1.0).contains(&r.risk_score));
        assert!((CONFIDENCE_FLOOR..=CONFIDENCE_CEILING).contains(&r.confidence));
        assert_eq!(r.top_contributing_factors.len(), 3);
        assert_eq!(r.model_version, "tidewatch-ensemble-v1");

        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["seaRegion"], "Bay of Bengal");
        assert_eq!(json["hazardType"], "storm_surge");
        assert!(json["oceanographicConditions"]["waveHeight"].is_number());
        assert!(json["nearestLocation"]["distanceKm"].is_number());
    }

    #[test]
    fn cyclone_outranks_high_tide_in_monsoon() {
        let dir = tempfile::tempdir().unwrap();
        let service = trained(dir.path(), 5);
        let mean = |hazard: &str| {
            (0..100).map(|_| service.predict(13.08, 80.27, Some(hazard)).unwrap().risk_score).sum::<f64>() / 100.0
        };
        let cyclone = mean("cyclone");
        let high_tide = mean("high_tide");
        assert!(cyclone > high_tide + 0.1, "cyclone {cyclone} vs high_tide {high_tide}");
    }

    #[test]
    fn degenerate_inputs_stay_in_band() {
        let dir = tempfile::tempdir().unwrap();
        let service = trained(dir.path(), 7);
        for (lat, lng) in [(0.0, 0.0), (-45.0, 170.0), (89.9, -179.9)] {
            let r = service.predict(lat, lng, Some("tsunami")).unwrap();
            assert_eq!(r.affected_area, GENERIC_AREA);
            assert!((0.0..=1.0).contains(&r.risk_score));
            assert!((CONFIDENCE_FLOOR..=CONFIDENCE_CEILING).contains(&r.confidence));
        }

        let r = service.predict(19.0, 72.8, Some("volcano")).unwrap();
        assert_eq!(r.hazard_type, "volcano");
        assert!((CONFIDENCE_FLOOR..=CONFIDENCE_CEILING).contains(&r.confidence));

        assert!(matches!(service.predict(f64::NAN, 80.0, None), Err(CoastError::Validation(_))));
        assert!(matches!(service.predict(13.0, 200.0, None), Err(CoastError::Validation(_))));
        assert!(matches!(service.predict(13.0, 80.0, Some("  ")), Err(CoastError::Validation(_))));
    }

    #[test]
    fn batch_draws_known_hazards() {
        let dir = tempfile::tempdir().unwrap();
        let service = trained(dir.path(), 9);
        let locations = [(13.08, 80.27), (18.97, 72.82), (11.6, 92.7)];
        let results = service.predict_batch(&locations).unwrap();
        assert_eq!(results.len(), 3);
        for (r, (lat, lng)) in results.iter().zip(locations) {
            assert_eq!((r.lat, r.lng), (lat, lng));
            assert!(r.hazard_type.parse::<HazardType>().is_ok());
        }
        assert!(matches!(service.predict_batch(&[(13.0, 80.0), (95.0, 80.0)]), Err(CoastError::Validation(_))));
    }

    #[test]
    fn batch_never_draws_rip_current_or_erosion() {
        let dir = tempfile::tempdir().unwrap();
        let service = trained(dir.path(), 17);
        let locations: Vec<(f64, f64)> =
            [(13.08, 80.27), (18.97, 72.82), (11.6, 92.7)].into_iter().cycle().take(150).collect();
        let results = service.predict_batch(&locations).unwrap();
        let drawn: std::collections::BTreeSet<&str> = results.iter().map(|r| r.hazard_type.as_str()).collect();
        assert!(!drawn.contains("rip_current"), "{drawn:?}");
        assert!(!drawn.contains("erosion"), "{drawn:?}");
        assert!(drawn.contains("cyclone") && drawn.contains("storm_surge"), "{drawn:?}");
    }

    #[test]
    fn timestamp_follows_injected_clock() {
        let dir = tempfile::tempdir().unwrap();
        let service = trained(dir.path(), 19);
        let r = service.predict(13.08, 80.27, None).unwrap();
        assert_eq!(r.timestamp.date_naive(), NaiveDate::from_ymd_opt(2025, 7, 15).unwrap());
        for b in service.predict_batch(&[(18.97, 72.82)]).unwrap() {
            assert_eq!(b.timestamp, r.timestamp);
        }
    }

    #[test]
    fn trained_service_answers_from_many_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<HazardService>();

        let dir = tempfile::tempdir().unwrap();
        let service = trained(dir.path(), 21);
        let points = [(13.08, 80.27), (18.97, 72.82), (11.6, 92.7), (22.5, 88.3)];
        let results: Vec<Vec<PredictionResult>> = std::thread::scope(|scope| {
            let handles: Vec<_> = points
                .iter()
                .map(|&(lat, lng)| {
                    let service = &service;
                    scope.spawn(move || {
                        (0..25).map(|_| service.predict(lat, lng, Some("cyclone")).unwrap()).collect::<Vec<_>>()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(results.len(), points.len());
        for (per_thread, (lat, lng)) in results.iter().zip(points) {
            assert_eq!(per_thread.len(), 25);
            for r in per_thread {
                assert_eq!((r.lat, r.lng), (lat, lng));
                assert_eq!(r.sea_region, Region::classify(lat, lng));
                assert!((0.0..=1.0).contains(&r.risk_score));
                assert!((CONFIDENCE_FLOOR..=CONFIDENCE_CEILING).contains(&r.confidence));
            }
        }
    }

    #[test]
    fn second_start_loads_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let first = trained(dir.path(), 11);
        let metrics = first.predictor().unwrap().metrics();

        let mut second = HazardService::new(small_config(dir.path(), 11)).unwrap().with_clock(july());
        assert_eq!(second.train_or_load().unwrap(), TrainOutcome::Loaded);
        assert_eq!(second.predictor().unwrap().metrics(), metrics);
        assert!(second.predict(13.08, 80.27, Some("cyclone")).is_ok());
    }

    #[test]
    fn layout_change_forces_retrain() {
        let dir = tempfile::tempdir().unwrap();
        trained(dir.path(), 13);

        let mut config = small_config(dir.path(), 13);
        config.model.include_geology = false;
        let mut service = HazardService::new(config).unwrap().with_clock(july());
        assert!(matches!(service.train_or_load().unwrap(), TrainOutcome::Trained(_)));
        assert_eq!(service.predictor().unwrap().schema().len(), 14);
    }

    #[test]
    fn corrupt_snapshot_forces_retrain() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ensemble_snapshot.json"), b"{ truncated").unwrap();
        let mut service = HazardService::new(small_config(dir.path(), 15)).unwrap();
        assert!(matches!(service.train_or_load().unwrap(), TrainOutcome::Trained(_)));
    }
}
