//! Time-invariant geology per cell: shelf depth, coastal slope and tidal range.
//!
//! Bathymetry buckets:
//!   - Gujarat (Arabian Sea north of 20°): wide shallow shelf, 5–30 m
//!   - Andaman Sea: deep water, 50–300 m
//!   - Bengal shelf (Bay of Bengal north of 20°): 10–40 m
//!   - elsewhere: 15–100 m
//!
//! Tidal range is an order of magnitude wider in the Gulf of Khambhat.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::ocean::is_high_tide_cell;
use super::round_to;
use crate::grid::{GridCell, Region};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeologicalSample {
    pub bathymetry_depth_m: f64,
    pub coastal_slope_deg: f64,
    pub tidal_range_m: f64,
}

const SLOPE_RANGE: (f64, f64) = (0.5, 5.0);

fn is_bengal_shelf(region: Region, lat: f64) -> bool {
    region == Region::BayOfBengal && lat > 20.0
}

fn depth_range(region: Region, lat: f64) -> (f64, f64) {
    if is_high_tide_cell(region, lat) {
        (5.0, 30.0)
    } else if region == Region::AndamanSea {
        (50.0, 300.0)
    } else if is_bengal_shelf(region, lat) {
        (10.0, 40.0)
    } else {
        (15.0, 100.0)
    }
}

fn tidal_range_range(region: Region, lat: f64) -> (f64, f64) {
    if is_high_tide_cell(region, lat) {
        (6.0, 11.0)
    } else if is_bengal_shelf(region, lat) {
        (3.0, 6.0)
    } else {
        (0.5, 2.5)
    }
}

pub(super) fn synthesize<R: Rng + ?Sized>(cell: &GridCell, rng: &mut R) -> GeologicalSample {
    let lat = cell.center.lat;
    let (d0, d1) = depth_range(cell.region, lat);
    let (t0, t1) = tidal_range_range(cell.region, lat);

    let depth = rng.gen_range(d0..=d1);
    let slope = rng.gen_range(SLOPE_RANGE.0..=SLOPE_RANGE.1);
    let tidal = rng.gen_range(t0..=t1);

    GeologicalSample {
        bathymetry_depth_m: round_to(depth, 1),
        coastal_slope_deg: round_to(slope, 2),
        tidal_range_m: round_to(tidal, 2),
    }
}
