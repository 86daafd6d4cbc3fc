//! Risk scoring and label derivation.
//!
//! score = clamp(base × seasonal × (0.7 + ocean_factor × 0.6) + N(0, 0.05), 0, 1)
//!
//! The 0.7 / 0.6 blend and the factor weights are part of the trained models'
//! contract: a model fitted on one set of constants is not valid for another.

pub mod bins;
pub mod tables;

use rand::Rng;

use crate::grid::Region;
use crate::hazard::HazardType;
use crate::synthesis::{gaussian, GeologicalSample, OceanographicSample};
use crate::temporal::Season;

pub use bins::{IntensityBin, Severity};
pub use tables::SeasonalRiskTable;

const BLEND_FLOOR: f64 = 0.7;
const BLEND_GAIN: f64 = 0.6;
const SCORE_NOISE_SD: f64 = 0.05;

const SHALLOW_DEPTH_M: f64 = 30.0;
const STEEP_SLOPE_DEG: f64 = 3.0;

/// Result of scoring one (hazard, context, features) combination.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskAssessment {
    pub risk_score: f64,
    pub seasonal_multiplier: f64,
    pub severity: Severity,
    pub intensity_bin: IntensityBin,
}

/// Weighted combination of normalized SST, wave height and wind speed plus
/// shallow-shelf and steep-slope bonuses.
pub fn ocean_risk_factor(ocean: &OceanographicSample, geo: &GeologicalSample) -> f64 {
    let shallow = if geo.bathymetry_depth_m < SHALLOW_DEPTH_M { 0.08 } else { 0.0 };
    let steep = if geo.coastal_slope_deg > STEEP_SLOPE_DEG { 0.07 } else { 0.0 };
    (ocean.sst_celsius / 30.0) * 0.25
        + (ocean.wave_height_m / 4.0) * 0.35
        + (ocean.wind_speed_kmh / 35.0) * 0.25
        + shallow
        + steep
}

/// Deterministic step functions of the score.
pub fn classify(risk_score: f64) -> (Severity, IntensityBin) {
    (Severity::from_score(risk_score), IntensityBin::from_score(risk_score))
}

#[derive(Debug, Clone, Default)]
pub struct RiskLabeler {
    pub seasonal: SeasonalRiskTable,
}

impl RiskLabeler {
    pub fn new(seasonal: SeasonalRiskTable) -> Self {
        Self { seasonal }
    }

    /// Noisy risk score in [0, 1] and the multiplier used to produce it.
    pub fn score<R: Rng + ?Sized>(
        &self,
        hazard: HazardType,
        season: Season,
        region: Region,
        ocean: &OceanographicSample,
        geo: &GeologicalSample,
        rng: &mut R,
    ) -> (f64, f64) {
        let multiplier = self.seasonal.get(hazard, region, season);
        let factor = ocean_risk_factor(ocean, geo);
        let raw = hazard.base_risk() * multiplier * (BLEND_FLOOR + factor * BLEND_GAIN)
            + gaussian(rng, 0.0, SCORE_NOISE_SD);
        (raw.clamp(0.0, 1.0), multiplier)
    }

    /// Score and derive both ordinal labels from that score.
    pub fn assess<R: Rng + ?Sized>(
        &self,
        hazard: HazardType,
        season: Season,
        region: Region,
        ocean: &OceanographicSample,
        geo: &GeologicalSample,
        rng: &mut R,
    ) -> RiskAssessment {
        let (risk_score, seasonal_multiplier) = self.score(hazard, season, region, ocean, geo, rng);
        let (severity, intensity_bin) = classify(risk_score);
        RiskAssessment { risk_score, seasonal_multiplier, severity, intensity_bin }
    }
}
