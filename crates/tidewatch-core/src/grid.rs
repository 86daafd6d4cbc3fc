//! Spatial gridding of the coastline into region-tagged rectangular cells.
//!
//! Each marine basin is enumerated over a half-open lat/lng range at a fixed
//! step. Region membership always comes from [`Region::classify`]; the grid
//! builder, the inference featurizer and the location lookups share that one
//! rule so a point can never be tagged with two different basins.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::coords::{BoundingBox, LatLon};
use crate::error::CoastError;

/// Default cell size in degrees.
pub const DEFAULT_STEP_DEG: f64 = 0.5;
/// Upper bound on the lattice points a grid step may enumerate.
pub const MAX_LATTICE_POINTS: f64 = 2_000_000.0;

/// Longitude at or beyond which a point belongs to the Andaman Sea.
const ANDAMAN_MIN_LNG: f64 = 90.75;
/// Longitude beyond which (and below [`ANDAMAN_MIN_LNG`]) a point belongs to the Bay of Bengal.
const BENGAL_MIN_LNG: f64 = 77.0;

/// Marine basins partitioning the coastline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Region {
    #[serde(rename = "Bay of Bengal")]
    BayOfBengal,
    #[serde(rename = "Arabian Sea")]
    ArabianSea,
    #[serde(rename = "Andaman Sea")]
    AndamanSea,
}

impl Region {
    pub const ALL: [Region; 3] = [Region::BayOfBengal, Region::ArabianSea, Region::AndamanSea];

    /// The geographic partition rule. Total: every coordinate maps to a basin.
    /// Only longitude takes part; latitude is accepted so call sites pass
    /// coordinates in one fixed (lat, lng) order.
    pub fn classify(_lat: f64, lng: f64) -> Region {
        if lng >= ANDAMAN_MIN_LNG {
            Region::AndamanSea
        } else if lng > BENGAL_MIN_LNG {
            Region::BayOfBengal
        } else {
            Region::ArabianSea
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Region::BayOfBengal => "Bay of Bengal",
            Region::ArabianSea => "Arabian Sea",
            Region::AndamanSea => "Andaman Sea",
        }
    }

    /// Prefix used for cell ids.
    fn id_prefix(self) -> &'static str {
        match self {
            Region::BayOfBengal => "BOB",
            Region::ArabianSea => "AS",
            Region::AndamanSea => "AND",
        }
    }

    /// Half-open enumeration bounds: (lat_start, lat_end, lng_start, lng_end).
    fn extent(self) -> (f64, f64, f64, f64) {
        match self {
            Region::BayOfBengal => (8.0, 23.0, 77.5, 90.0),
            Region::ArabianSea => (8.0, 24.0, 66.0, 77.0),
            Region::AndamanSea => (6.0, 14.0, 91.0, 94.5),
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Region {
    type Err = CoastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Region::ALL
            .into_iter()
            .find(|r| r.label() == s)
            .ok_or_else(|| CoastError::Validation(format!("unknown sea region '{s}'")))
    }
}

/// One rectangular grid cell. Immutable once the grid is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridCell {
    pub id: String,
    pub center: LatLon,
    pub bounds: BoundingBox,
    pub region: Region,
}

impl GridCell {
    /// Ad-hoc cell for an arbitrary query point (inference side).
    /// The region comes from the same partition rule as the grid.
    pub fn for_point(point: LatLon, step: f64) -> Self {
        let region = Region::classify(point.lat, point.lon);
        Self {
            id: format!("{}_QUERY", region.id_prefix()),
            center: point,
            bounds: BoundingBox::around(point, step / 2.0),
            region,
        }
    }
}

/// All grid cells of the domain.
#[derive(Debug, Clone)]
pub struct SpatialGrid {
    pub cells: Vec<GridCell>,
    pub step: f64,
}

impl SpatialGrid {
    /// Lattice points enumerated across all regions at `step` degrees, before
    /// the partition filter. Computed in floating point so tiny steps do not overflow.
    pub fn lattice_points(step: f64) -> f64 {
        Region::ALL
            .into_iter()
            .map(|region| {
                let (lat0, lat1, lng0, lng1) = region.extent();
                ((lat1 - lat0) / step).ceil() * ((lng1 - lng0) / step).ceil()
            })
            .sum()
    }

    /// Deterministically enumerate every region's cells at `step` degrees.
    pub fn build(step: f64) -> Self {
        let mut cells = Vec::new();
        for region in Region::ALL {
            let (lat0, lat1, lng0, lng1) = region.extent();
            let n_lat = ((lat1 - lat0) / step).ceil() as usize;
            let n_lng = ((lng1 - lng0) / step).ceil() as usize;
            let mut counter = 0usize;

            for i in 0..n_lat {
                let lat = lat0 + i as f64 * step;
                for j in 0..n_lng {
                    let lng = lng0 + j as f64 * step;
                    if Region::classify(lat, lng) != region {
                        continue;
                    }
                    let center = LatLon::new(lat, lng);
                    cells.push(GridCell {
                        id: format!("{}_{counter:04}", region.id_prefix()),
                        center,
                        bounds: BoundingBox::around(center, step / 2.0),
                        region,
                    });
                    counter += 1;
                }
            }
        }

        tracing::info!(cells = cells.len(), step, "built spatial grid");
        Self { cells, step }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn count_in(&self, region: Region) -> usize {
        self.cells.iter().filter(|c| c.region == region).count()
    }
}

impl Default for SpatialGrid {
    fn default() -> Self {
        Self::build(DEFAULT_STEP_DEG)
    }
}
