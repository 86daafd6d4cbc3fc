//! Hazard categories and the per-region hazard selection weights.

use std::fmt;
use std::str::FromStr;

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{CoastError, Result};
use crate::grid::Region;

/// Tolerance for a weight vector summing to one.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Coastal hazard categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HazardType {
    Tsunami,
    Cyclone,
    StormSurge,
    HighTide,
    CoastalFlood,
    RipCurrent,
    Erosion,
}

impl HazardType {
    pub const ALL: [HazardType; 7] = [
        HazardType::Tsunami,
        HazardType::Cyclone,
        HazardType::StormSurge,
        HazardType::HighTide,
        HazardType::CoastalFlood,
        HazardType::RipCurrent,
        HazardType::Erosion,
    ];

    /// Hazard assumed by `predict` when the caller names none.
    pub const DEFAULT: HazardType = HazardType::StormSurge;

    pub fn label(self) -> &'static str {
        match self {
            HazardType::Tsunami => "tsunami",
            HazardType::Cyclone => "cyclone",
            HazardType::StormSurge => "storm_surge",
            HazardType::HighTide => "high_tide",
            HazardType::CoastalFlood => "coastal_flood",
            HazardType::RipCurrent => "rip_current",
            HazardType::Erosion => "erosion",
        }
    }

    /// Fixed per-hazard base risk before seasonal and oceanographic scaling.
    pub fn base_risk(self) -> f64 {
        match self {
            HazardType::Tsunami => 0.12,
            HazardType::Cyclone => 0.35,
            HazardType::StormSurge => 0.38,
            HazardType::HighTide => 0.28,
            HazardType::CoastalFlood => 0.25,
            HazardType::RipCurrent => 0.30,
            HazardType::Erosion => 0.22,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for HazardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for HazardType {
    type Err = CoastError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        HazardType::ALL
            .into_iter()
            .find(|h| h.label() == s)
            .ok_or_else(|| CoastError::Validation(format!("unknown hazard type '{s}'")))
    }
}

/// Categorical hazard weights per region, indexed by [`HazardType::index`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HazardWeights {
    pub bay_of_bengal: [f64; 7],
    pub arabian_sea: [f64; 7],
    pub andaman_sea: [f64; 7],
}

impl Default for HazardWeights {
    fn default() -> Self {
        Self {
            bay_of_bengal: [0.05, 0.30, 0.25, 0.10, 0.10, 0.12, 0.08],
            arabian_sea: [0.02, 0.18, 0.22, 0.15, 0.15, 0.15, 0.13],
            andaman_sea: [0.15, 0.18, 0.15, 0.08, 0.07, 0.25, 0.12],
        }
    }
}

impl HazardWeights {
    /// Weights for batch queries: five hazards, one table east of 77°E
    /// (Bay of Bengal and Andaman Sea) and one for the Arabian Sea.
    /// Rip currents and erosion are never drawn.
    pub fn batch() -> Self {
        let east = [0.05, 0.35, 0.35, 0.15, 0.10, 0.0, 0.0];
        Self {
            bay_of_bengal: east,
            arabian_sea: [0.02, 0.20, 0.30, 0.25, 0.23, 0.0, 0.0],
            andaman_sea: east,
        }
    }

    pub fn for_region(&self, region: Region) -> &[f64; 7] {
        match region {
            Region::BayOfBengal => &self.bay_of_bengal,
            Region::ArabianSea => &self.arabian_sea,
            Region::AndamanSea => &self.andaman_sea,
        }
    }

    /// Every weight non-negative and each region's vector summing to 1.
    pub fn validate(&self) -> Result<()> {
        for region in Region::ALL {
            let w = self.for_region(region);
            if w.iter().any(|&x| !x.is_finite() || x < 0.0) {
                return Err(CoastError::GenerationConfig(format!(
                    "{region}: hazard weights must be finite and non-negative"
                )));
            }
            let sum: f64 = w.iter().sum();
            if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
                return Err(CoastError::GenerationConfig(format!(
                    "{region}: hazard weights sum to {sum}, expected 1"
                )));
            }
        }
        Ok(())
    }

    /// Pre-built samplers, one per region.
    pub fn sampler(&self) -> Result<HazardSampler> {
        self.validate()?;
        let build = |w: &[f64; 7]| {
            WeightedIndex::new(w.iter().copied())
                .map_err(|e| CoastError::GenerationConfig(format!("hazard weights: {e}")))
        };
        Ok(HazardSampler {
            per_region: [
                build(self.for_region(Region::BayOfBengal))?,
                build(self.for_region(Region::ArabianSea))?,
                build(self.for_region(Region::AndamanSea))?,
            ],
        })
    }
}

/// Draws hazard types from validated region weights.
#[derive(Debug, Clone)]
pub struct HazardSampler {
    per_region: [WeightedIndex<f64>; 3],
}

impl HazardSampler {
    pub fn sample<R: Rng + ?Sized>(&self, region: Region, rng: &mut R) -> HazardType {
        HazardType::ALL[self.per_region[region.index()].sample(rng)]
    }
}
