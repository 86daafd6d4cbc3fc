//! Oceanographic sample synthesis.

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::gaussian;
use crate::grid::{GridCell, Region};
use crate::hazard::HazardType;

/// The five synthesized oceanographic fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OceanField {
    Sst,
    Wave,
    Wind,
    Current,
    Tide,
}

impl OceanField {
    pub const ALL: [OceanField; 5] =
        [OceanField::Sst, OceanField::Wave, OceanField::Wind, OceanField::Current, OceanField::Tide];

    /// Declared valid range; every synthesized value is clamped into it.
    pub fn range(self) -> (f64, f64) {
        match self {
            OceanField::Sst => (24.0, 33.0),
            OceanField::Wave => (0.3, 8.0),
            OceanField::Wind => (2.0, 55.0),
            OceanField::Current => (0.05, 3.0),
            // Extended upward for the Gulf of Khambhat.
            OceanField::Tide => (-1.0, 6.0),
        }
    }

    /// Standard deviation of the additive zero-mean noise.
    fn noise_sd(self) -> f64 {
        match self {
            OceanField::Sst => 0.5,
            OceanField::Wave => 0.3,
            OceanField::Wind => 3.0,
            OceanField::Current => 0.2,
            OceanField::Tide => 0.3,
        }
    }

    fn clamp(self, v: f64) -> f64 {
        let (lo, hi) = self.range();
        v.clamp(lo, hi)
    }
}

/// Five oceanographic readings, each inside its declared range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OceanographicSample {
    pub sst_celsius: f64,
    pub wave_height_m: f64,
    pub wind_speed_kmh: f64,
    pub current_velocity_ms: f64,
    pub tide_level_m: f64,
}

impl OceanographicSample {
    pub fn get(&self, field: OceanField) -> f64 {
        match field {
            OceanField::Sst => self.sst_celsius,
            OceanField::Wave => self.wave_height_m,
            OceanField::Wind => self.wind_speed_kmh,
            OceanField::Current => self.current_velocity_ms,
            OceanField::Tide => self.tide_level_m,
        }
    }
}

/// Sparse per-(hazard, field) multipliers; unlisted pairs use [`HazardMultipliers::DEFAULT`].
#[derive(Debug, Clone, PartialEq)]
pub struct HazardMultipliers {
    table: BTreeMap<(HazardType, OceanField), f64>,
}

impl HazardMultipliers {
    pub const DEFAULT: f64 = 1.0;

    pub fn from_entries(entries: impl IntoIterator<Item = (HazardType, OceanField, f64)>) -> Self {
        Self {
            table: entries.into_iter().map(|(h, f, m)| ((h, f), m)).collect(),
        }
    }

    pub fn get(&self, hazard: HazardType, field: OceanField) -> f64 {
        self.table.get(&(hazard, field)).copied().unwrap_or(Self::DEFAULT)
    }

    /// `None` (a hazard outside the enumeration) is neutral on every field.
    pub fn lookup(&self, hazard: Option<HazardType>, field: OceanField) -> f64 {
        hazard.map_or(Self::DEFAULT, |h| self.get(h, field))
    }
}

impl Default for HazardMultipliers {
    fn default() -> Self {
        use HazardType::*;
        use OceanField::*;
        Self::from_entries([
            (Tsunami, Wave, 3.0),
            (Tsunami, Current, 5.0),
            (Cyclone, Wind, 2.5),
            (Cyclone, Wave, 2.0),
            (Cyclone, Sst, 1.1),
            (StormSurge, Tide, 2.0),
            (StormSurge, Wind, 1.8),
            (StormSurge, Wave, 1.5),
            (HighTide, Tide, 1.5),
            (CoastalFlood, Tide, 1.3),
            (CoastalFlood, Wave, 1.2),
            (RipCurrent, Current, 2.0),
            (RipCurrent, Wave, 1.3),
            (Erosion, Wave, 1.2),
            (Erosion, Current, 1.5),
        ])
    }
}

/// Seasonal (sst, wave, wind) base by month bucket.
fn seasonal_base(month: u32) -> (f64, f64, f64) {
    match month {
        6..=9 => (29.0, 3.5, 25.0),
        12 | 1 | 2 => (26.5, 1.5, 12.0),
        _ => (30.5, 2.0, 15.0),
    }
}

/// Additive (sst, wave) offset per basin. The Arabian Sea is the calm reference.
fn regional_offset(region: Region) -> (f64, f64) {
    match region {
        Region::BayOfBengal => (0.5, 0.3),
        Region::AndamanSea => (1.0, 0.5),
        Region::ArabianSea => (0.0, 0.0),
    }
}

/// Cells with the Gulf of Khambhat / Kutch tidal amplitude.
pub fn is_high_tide_cell(region: Region, lat: f64) -> bool {
    region == Region::ArabianSea && lat > 20.0
}

/// Latitude at which the SST gradient term vanishes.
const SST_REFERENCE_LAT: f64 = 12.0;
const SST_PER_DEGREE: f64 = 0.05;
const CURRENT_BASE: f64 = 0.5;

pub(super) fn synthesize<R: Rng + ?Sized>(
    cell: &GridCell,
    month: u32,
    hazard: Option<HazardType>,
    multipliers: &HazardMultipliers,
    rng: &mut R,
) -> OceanographicSample {
    let lat = cell.center.lat;
    let (mut sst, mut wave, wind) = seasonal_base(month);

    let (d_sst, d_wave) = regional_offset(cell.region);
    sst += d_sst;
    wave += d_wave;

    sst += (SST_REFERENCE_LAT - lat) * SST_PER_DEGREE;

    let tide = if is_high_tide_cell(cell.region, lat) {
        gaussian(rng, 4.0, 1.0)
    } else {
        gaussian(rng, 0.8, 0.3)
    };

    let mut field = |f: OceanField, base: f64| {
        let v = base * multipliers.lookup(hazard, f) + gaussian(rng, 0.0, f.noise_sd());
        f.clamp(v)
    };

    OceanographicSample {
        sst_celsius: field(OceanField::Sst, sst),
        wave_height_m: field(OceanField::Wave, wave),
        wind_speed_kmh: field(OceanField::Wind, wind),
        current_velocity_ms: field(OceanField::Current, CURRENT_BASE),
        tide_level_m: field(OceanField::Tide, tide),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::LatLon;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn cell(lat: f64, lng: f64) -> GridCell {
        GridCell::for_point(LatLon::new(lat, lng), 0.5)
    }

    fn mean_of(
        n: usize,
        c: &GridCell,
        month: u32,
        hazard: HazardType,
        field: OceanField,
        seed: u64,
    ) -> f64 {
        let m = HazardMultipliers::default();
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n).map(|_| synthesize(c, month, Some(hazard), &m, &mut rng).get(field)).sum::<f64>() / n as f64
    }

    #[test]
    fn every_field_within_declared_range() {
        let m = HazardMultipliers::default();
        let mut rng = StdRng::seed_from_u64(11);
        let cells = [cell(22.0, 70.0), cell(9.0, 80.0), cell(7.0, 92.0)];
        for c in &cells {
            for month in 1..=12 {
                for hazard in HazardType::ALL {
                    for _ in 0..20 {
                        let s = synthesize(c, month, Some(hazard), &m, &mut rng);
                        for f in OceanField::ALL {
                            let (lo, hi) = f.range();
                            let v = s.get(f);
                            assert!((lo..=hi).contains(&v), "{f:?}={v} outside [{lo}, {hi}]");
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn unknown_hazard_is_neutral() {
        let m = HazardMultipliers::default();
        for f in OceanField::ALL {
            assert_eq!(m.lookup(None, f), 1.0);
        }
        assert_eq!(m.lookup(Some(HazardType::Cyclone), OceanField::Wind), 2.5);
    }

    #[test]
    fn unmapped_pairs_default_to_one() {
        let m = HazardMultipliers::default();
        assert_eq!(m.get(HazardType::HighTide, OceanField::Wind), 1.0);
        assert_eq!(m.get(HazardType::Cyclone, OceanField::Tide), 1.0);
        assert_eq!(m.get(HazardType::Tsunami, OceanField::Current), 5.0);
    }

    #[test]
    fn cyclone_raises_wind_over_high_tide() {
        let c = cell(13.0, 80.5);
        let cyclone = mean_of(2000, &c, 7, HazardType::Cyclone, OceanField::Wind, 5);
        let tide = mean_of(2000, &c, 7, HazardType::HighTide, OceanField::Wind, 5);
        assert!(cyclone > tide + 20.0, "cyclone wind {cyclone:.1} vs high_tide {tide:.1}");
    }

    /// Gujarat cells draw tide from the higher-mean distribution.
    #[test]
    fn khambhat_tide_exceeds_rest_of_coast() {
        let gujarat = mean_of(2000, &cell(21.5, 72.0), 3, HazardType::Erosion, OceanField::Tide, 8);
        let kerala = mean_of(2000, &cell(9.0, 76.0), 3, HazardType::Erosion, OceanField::Tide, 8);
        assert!(gujarat > 3.0, "gujarat mean tide {gujarat:.2}");
        assert!(kerala < 1.2, "kerala mean tide {kerala:.2}");
    }

    #[test]
    fn monsoon_waves_exceed_winter() {
        let c = cell(15.0, 73.0);
        let monsoon = mean_of(1000, &c, 7, HazardType::Erosion, OceanField::Wave, 2);
        let winter = mean_of(1000, &c, 1, HazardType::Erosion, OceanField::Wave, 2);
        assert!(monsoon > winter + 1.5);
    }

    #[test]
    fn sst_warmer_toward_equator() {
        let south = mean_of(2000, &cell(8.0, 76.0), 3, HazardType::Erosion, OceanField::Sst, 4);
        let north = mean_of(2000, &cell(22.0, 69.0), 3, HazardType::Erosion, OceanField::Sst, 4);
        assert!(south > north, "south {south:.2} vs north {north:.2}");
    }
}
