//! Seasonal risk multipliers keyed by (hazard, region, season).

use std::collections::BTreeMap;

use crate::error::{CoastError, Result};
use crate::grid::Region;
use crate::hazard::HazardType;
use crate::temporal::Season;

/// Multipliers per region in [`Season::ALL`] order: winter, summer, monsoon, post-monsoon.
type SeasonRow = [f64; 4];

/// Rows per hazard in (Bay of Bengal, Arabian Sea, Andaman Sea) order.
const MATRIX: [(HazardType, [SeasonRow; 3]); 7] = [
    (HazardType::Tsunami, [[1.2, 1.0, 1.3, 1.1], [0.8, 0.9, 1.0, 0.9], [1.3, 1.1, 1.4, 1.2]]),
    (HazardType::Cyclone, [[0.5, 1.2, 1.8, 1.6], [0.3, 1.5, 1.4, 1.0], [0.6, 1.0, 1.5, 1.3]]),
    (HazardType::StormSurge, [[0.6, 1.0, 1.7, 1.3], [0.5, 0.9, 1.5, 1.1], [0.5, 0.8, 1.3, 1.0]]),
    (HazardType::HighTide, [[0.9, 1.2, 1.1, 1.0], [1.0, 1.3, 1.1, 1.0], [0.8, 1.0, 0.9, 0.8]]),
    (HazardType::CoastalFlood, [[0.7, 0.9, 1.6, 1.2], [0.6, 0.8, 1.5, 1.0], [0.5, 0.7, 1.3, 0.9]]),
    (HazardType::RipCurrent, [[0.8, 1.3, 1.0, 0.9], [0.7, 1.2, 0.9, 0.8], [1.0, 1.4, 0.8, 0.9]]),
    (HazardType::Erosion, [[0.8, 0.9, 1.5, 1.2], [0.7, 0.8, 1.4, 1.1], [0.6, 0.7, 1.2, 0.9]]),
];

/// Explicit seasonal multiplier table.
///
/// A missing key resolves to [`SeasonalRiskTable::DEFAULT`]; [`validate`](Self::validate)
/// rejects tables that would ever hit that default so it only covers
/// hand-built partial tables used in tests.
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonalRiskTable {
    entries: BTreeMap<(HazardType, Region, Season), f64>,
}

impl SeasonalRiskTable {
    pub const DEFAULT: f64 = 1.0;

    pub fn from_entries(entries: impl IntoIterator<Item = ((HazardType, Region, Season), f64)>) -> Self {
        Self { entries: entries.into_iter().collect() }
    }

    pub fn get(&self, hazard: HazardType, region: Region, season: Season) -> f64 {
        self.entries
            .get(&(hazard, region, season))
            .copied()
            .unwrap_or(Self::DEFAULT)
    }

    /// Every (hazard, region, season) key present with a finite positive value.
    pub fn validate(&self) -> Result<()> {
        for hazard in HazardType::ALL {
            for region in Region::ALL {
                for season in Season::ALL {
                    match self.entries.get(&(hazard, region, season)) {
                        None => {
                            return Err(CoastError::GenerationConfig(format!(
                                "seasonal risk table missing ({hazard}, {region}, {season})"
                            )))
                        }
                        Some(v) if !v.is_finite() || *v <= 0.0 => {
                            return Err(CoastError::GenerationConfig(format!(
                                "seasonal multiplier for ({hazard}, {region}, {season}) is {v}"
                            )))
                        }
                        Some(_) => {}
                    }
                }
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for SeasonalRiskTable {
    fn default() -> Self {
        let regions = [Region::BayOfBengal, Region::ArabianSea, Region::AndamanSea];
        let mut entries = BTreeMap::new();
        for (hazard, rows) in MATRIX {
            for (region, row) in regions.iter().zip(rows.iter()) {
                for (season, &m) in Season::ALL.iter().zip(row.iter()) {
                    entries.insert((hazard, *region, *season), m);
                }
            }
        }
        Self { entries }
    }
}
