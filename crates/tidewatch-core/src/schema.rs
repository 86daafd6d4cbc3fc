//! The one feature layout shared by training and inference.
//!
//! Both the dataset side ([`FeatureRow::from_record`]) and the inference side
//! (`inference::InferenceFeaturizer`) produce a [`FeatureRow`]; a
//! [`FeatureSchema`] projects it into the ordered vector the models consume.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::codec::{CategoricalCodec, CategoricalColumn};
use crate::dataset::TrainingRecord;
use crate::error::{CoastError, Result};
use crate::synthesis::{GeologicalSample, OceanographicSample};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureColumn {
    Lat,
    Lng,
    Month,
    DayOfYear,
    IsMonsoon,
    IsCycloneSeason,
    SstCelsius,
    WaveHeightM,
    WindSpeedKmh,
    CurrentVelocityMs,
    TideLevelM,
    BathymetryDepthM,
    CoastalSlopeDeg,
    TidalRangeM,
    SeaRegionEncoded,
    HazardTypeEncoded,
    SeasonEncoded,
}

impl FeatureColumn {
    pub fn name(self) -> &'static str {
        match self {
            FeatureColumn::Lat => "lat",
            FeatureColumn::Lng => "lng",
            FeatureColumn::Month => "month",
            FeatureColumn::DayOfYear => "day_of_year",
            FeatureColumn::IsMonsoon => "is_monsoon",
            FeatureColumn::IsCycloneSeason => "is_cyclone_season",
            FeatureColumn::SstCelsius => "sst_celsius",
            FeatureColumn::WaveHeightM => "wave_height_m",
            FeatureColumn::WindSpeedKmh => "wind_speed_kmh",
            FeatureColumn::CurrentVelocityMs => "current_velocity_ms",
            FeatureColumn::TideLevelM => "tide_level_m",
            FeatureColumn::BathymetryDepthM => "bathymetry_depth_m",
            FeatureColumn::CoastalSlopeDeg => "coastal_slope_deg",
            FeatureColumn::TidalRangeM => "tidal_range_m",
            FeatureColumn::SeaRegionEncoded => "sea_region_encoded",
            FeatureColumn::HazardTypeEncoded => "hazard_type_encoded",
            FeatureColumn::SeasonEncoded => "season_encoded",
        }
    }
}

impl fmt::Display for FeatureColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

const SPATIAL: [FeatureColumn; 2] = [FeatureColumn::Lat, FeatureColumn::Lng];
const TEMPORAL: [FeatureColumn; 4] = [
    FeatureColumn::Month,
    FeatureColumn::DayOfYear,
    FeatureColumn::IsMonsoon,
    FeatureColumn::IsCycloneSeason,
];
const OCEANOGRAPHIC: [FeatureColumn; 5] = [
    FeatureColumn::SstCelsius,
    FeatureColumn::WaveHeightM,
    FeatureColumn::WindSpeedKmh,
    FeatureColumn::CurrentVelocityMs,
    FeatureColumn::TideLevelM,
];
const GEOLOGICAL: [FeatureColumn; 3] = [
    FeatureColumn::BathymetryDepthM,
    FeatureColumn::CoastalSlopeDeg,
    FeatureColumn::TidalRangeM,
];
const ENCODED: [FeatureColumn; 3] = [
    FeatureColumn::SeaRegionEncoded,
    FeatureColumn::HazardTypeEncoded,
    FeatureColumn::SeasonEncoded,
];

/// Every value any schema variant can select.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureRow {
    pub lat: f64,
    pub lng: f64,
    pub month: u32,
    pub day_of_year: u32,
    pub is_monsoon: bool,
    pub is_cyclone_season: bool,
    pub ocean: OceanographicSample,
    pub geology: GeologicalSample,
    pub sea_region_code: u32,
    pub hazard_type_code: u32,
    pub season_code: u32,
}

impl FeatureRow {
    /// Training-side row. Categories come from the fitted codec.
    pub fn from_record(r: &TrainingRecord, codec: &CategoricalCodec) -> Self {
        Self {
            lat: r.lat,
            lng: r.lng,
            month: r.month,
            day_of_year: r.day_of_year,
            is_monsoon: r.is_monsoon,
            is_cyclone_season: r.is_cyclone_season,
            ocean: r.ocean,
            geology: r.geology,
            sea_region_code: codec.encode(CategoricalColumn::SeaRegion, r.sea_region.label()),
            hazard_type_code: codec.encode(CategoricalColumn::HazardType, r.hazard_type.label()),
            season_code: codec.encode(CategoricalColumn::Season, r.season.label()),
        }
    }

    pub fn get(&self, column: FeatureColumn) -> f64 {
        let flag = |b: bool| if b { 1.0 } else { 0.0 };
        match column {
            FeatureColumn::Lat => self.lat,
            FeatureColumn::Lng => self.lng,
            FeatureColumn::Month => self.month as f64,
            FeatureColumn::DayOfYear => self.day_of_year as f64,
            FeatureColumn::IsMonsoon => flag(self.is_monsoon),
            FeatureColumn::IsCycloneSeason => flag(self.is_cyclone_season),
            FeatureColumn::SstCelsius => self.ocean.sst_celsius,
            FeatureColumn::WaveHeightM => self.ocean.wave_height_m,
            FeatureColumn::WindSpeedKmh => self.ocean.wind_speed_kmh,
            FeatureColumn::CurrentVelocityMs => self.ocean.current_velocity_ms,
            FeatureColumn::TideLevelM => self.ocean.tide_level_m,
            FeatureColumn::BathymetryDepthM => self.geology.bathymetry_depth_m,
            FeatureColumn::CoastalSlopeDeg => self.geology.coastal_slope_deg,
            FeatureColumn::TidalRangeM => self.geology.tidal_range_m,
            FeatureColumn::SeaRegionEncoded => self.sea_region_code as f64,
            FeatureColumn::HazardTypeEncoded => self.hazard_type_code as f64,
            FeatureColumn::SeasonEncoded => self.season_code as f64,
        }
    }
}

/// Ordered model input columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    columns: Vec<FeatureColumn>,
}

impl FeatureSchema {
    /// spatial (2) + temporal (4) + oceanographic (5) + geological (3) + encoded (3).
    pub fn full() -> Self {
        Self::with_geology(true)
    }

    /// The 14-column layout without geology.
    pub fn base() -> Self {
        Self::with_geology(false)
    }

    pub fn with_geology(include_geology: bool) -> Self {
        let mut columns = Vec::with_capacity(17);
        columns.extend(SPATIAL);
        columns.extend(TEMPORAL);
        columns.extend(OCEANOGRAPHIC);
        if include_geology {
            columns.extend(GEOLOGICAL);
        }
        columns.extend(ENCODED);
        Self { columns }
    }

    pub fn columns(&self) -> &[FeatureColumn] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name().to_string()).collect()
    }

    pub fn position(&self, column: FeatureColumn) -> Option<usize> {
        self.columns.iter().position(|&c| c == column)
    }

    pub fn project(&self, row: &FeatureRow) -> Vec<f64> {
        self.columns.iter().map(|&c| row.get(c)).collect()
    }

    /// Fail unless `found` names exactly these columns in this order.
    pub fn check(&self, found: &[String]) -> Result<()> {
        let expected = self.names();
        if expected.as_slice() == found {
            Ok(())
        } else {
            Err(CoastError::SchemaMismatch { expected, found: found.to_vec() })
        }
    }
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self::full()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> FeatureRow {
        FeatureRow {
            lat: 13.0,
            lng: 80.5,
            month: 7,
            day_of_year: 190,
            is_monsoon: true,
            is_cyclone_season: false,
            ocean: OceanographicSample {
                sst_celsius: 29.5,
                wave_height_m: 3.1,
                wind_speed_kmh: 22.0,
                current_velocity_ms: 0.4,
                tide_level_m: 0.9,
            },
            geology: GeologicalSample { bathymetry_depth_m: 42.0, coastal_slope_deg: 2.1, tidal_range_m: 1.2 },
            sea_region_code: 2,
            hazard_type_code: 1,
            season_code: 0,
        }
    }

    #[test]
    fn full_layout() {
        let s = FeatureSchema::full();
        assert_eq!(s.len(), 17);
        let names = s.names();
        assert_eq!(names[0], "lat");
        assert_eq!(names[11], "bathymetry_depth_m");
        assert_eq!(names[16], "season_encoded");
    }

    #[test]
    fn base_layout_drops_geology() {
        let s = FeatureSchema::base();
        assert_eq!(s.len(), 14);
        assert_eq!(s.position(FeatureColumn::BathymetryDepthM), None);
        assert_eq!(s.position(FeatureColumn::SeaRegionEncoded), Some(11));
    }

    #[test]
    fn projection_follows_column_order() {
        let v = FeatureSchema::full().project(&row());
        assert_eq!(v.len(), 17);
        assert_eq!(v[4], 1.0);
        assert_eq!(v[5], 0.0);
        assert_eq!(v[6], 29.5);
        assert_eq!(v[14], 2.0);
        let b = FeatureSchema::base().project(&row());
        assert_eq!(b[11], 2.0);
    }

    #[test]
    fn check_detects_count_and_order() {
        let full = FeatureSchema::full();
        assert!(full.check(&full.names()).is_ok());
        assert!(matches!(
            full.check(&FeatureSchema::base().names()),
            Err(CoastError::SchemaMismatch { .. })
        ));
        let mut swapped = full.names();
        swapped.swap(0, 1);
        assert!(full.check(&swapped).is_err());
    }
}
