//! Feature synthesis: oceanographic conditions per (cell, window, hazard) and
//! time-invariant geology per cell.
//!
//! Pipeline for one oceanographic sample:
//!   seasonal base → regional offset → latitude gradient → hazard multiplier →
//!   Gaussian noise → range clamp.
//!
//! The same arithmetic serves training-time generation (historical window) and
//! inference-time estimation (window derived from the current date).

pub mod geology;
pub mod ocean;

use rand::Rng;
use rand_distr::StandardNormal;

use crate::grid::GridCell;
use crate::hazard::HazardType;
use crate::temporal::{Clock, TemporalWindow};

pub use geology::GeologicalSample;
pub use ocean::{HazardMultipliers, OceanField, OceanographicSample};

/// Where the temporal context of a synthesized sample comes from.
#[derive(Clone, Copy)]
pub enum SynthesisMode<'a> {
    /// Training-time generation over a historical window.
    Generation(&'a TemporalWindow),
    /// Inference-time estimate: the window is "today" according to the clock.
    Estimate(&'a dyn Clock),
}

impl SynthesisMode<'_> {
    pub fn resolve_window(&self) -> TemporalWindow {
        match self {
            SynthesisMode::Generation(w) => (*w).clone(),
            SynthesisMode::Estimate(clock) => TemporalWindow::from_date(clock.today()),
        }
    }
}

/// Produces oceanographic and geological samples.
#[derive(Debug, Clone, Default)]
pub struct FeatureSynthesizer {
    pub multipliers: HazardMultipliers,
}

impl FeatureSynthesizer {
    pub fn new(multipliers: HazardMultipliers) -> Self {
        Self { multipliers }
    }

    /// Oceanographic sample for a historical window.
    pub fn oceanographic<R: Rng + ?Sized>(
        &self,
        cell: &GridCell,
        window: &TemporalWindow,
        hazard: HazardType,
        rng: &mut R,
    ) -> OceanographicSample {
        ocean::synthesize(cell, window.month, Some(hazard), &self.multipliers, rng)
    }

    /// Oceanographic sample in either mode; returns the window it used.
    /// A `None` hazard applies no hazard multipliers.
    pub fn oceanographic_in<R: Rng + ?Sized>(
        &self,
        cell: &GridCell,
        mode: SynthesisMode<'_>,
        hazard: impl Into<Option<HazardType>>,
        rng: &mut R,
    ) -> (TemporalWindow, OceanographicSample) {
        let window = mode.resolve_window();
        let sample = ocean::synthesize(cell, window.month, hazard.into(), &self.multipliers, rng);
        (window, sample)
    }

    /// Geology for a cell. Each call is an independent draw.
    pub fn geology<R: Rng + ?Sized>(&self, cell: &GridCell, rng: &mut R) -> GeologicalSample {
        geology::synthesize(cell, rng)
    }
}

/// `mean + sd · z` with `z ~ N(0, 1)`.
pub(crate) fn gaussian<R: Rng + ?Sized>(rng: &mut R, mean: f64, sd: f64) -> f64 {
    let z: f64 = rng.sample(StandardNormal);
    mean + sd * z
}

/// Round to `places` decimal places.
pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let f = 10f64.powi(places);
    (value * f).round() / f
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::LatLon;
    use crate::temporal::FixedClock;
    use chrono::NaiveDate;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn estimate_mode_uses_clock_date() {
        let day = NaiveDate::from_ymd_opt(2025, 7, 4).unwrap();
        let clock = FixedClock(day);
        let cell = GridCell::for_point(LatLon::new(13.0, 80.2), 0.5);
        let synth = FeatureSynthesizer::default();
        let mut rng = StdRng::seed_from_u64(1);
        let (window, _) = synth.oceanographic_in(&cell, SynthesisMode::Estimate(&clock), HazardType::Cyclone, &mut rng);
        assert_eq!(window.date, day);
        assert!(window.is_monsoon);
    }

    /// Same seed and inputs give identical samples in both modes.
    #[test]
    fn modes_share_arithmetic() {
        let day = NaiveDate::from_ymd_opt(2023, 1, 20).unwrap();
        let window = TemporalWindow::from_date(day);
        let clock = FixedClock(day);
        let cell = GridCell::for_point(LatLon::new(19.0, 72.8), 0.5);
        let synth = FeatureSynthesizer::default();

        let a = synth.oceanographic(&cell, &window, HazardType::HighTide, &mut StdRng::seed_from_u64(3));
        let (_, b) = synth.oceanographic_in(
            &cell,
            SynthesisMode::Estimate(&clock),
            HazardType::HighTide,
            &mut StdRng::seed_from_u64(3),
        );
        assert_eq!(a, b);
    }

    #[test]
    fn round_to_places() {
        assert_eq!(round_to(12.3456, 1), 12.3);
        assert_eq!(round_to(12.3456, 2), 12.35);
    }
}
