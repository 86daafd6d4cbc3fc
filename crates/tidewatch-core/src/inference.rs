//! Inference-time feature reconstruction for a query point.
//!
//! The query point gets an ad-hoc grid cell, the window comes from the
//! clock, and ocean + geology are drawn by the same synthesizer the training
//! table used. Categories go through the fitted codec.

use rand::Rng;

use crate::codec::{CategoricalCodec, CategoricalColumn};
use crate::coords::LatLon;
use crate::grid::{GridCell, DEFAULT_STEP_DEG};
use crate::hazard::HazardType;
use crate::schema::FeatureRow;
use crate::synthesis::{FeatureSynthesizer, GeologicalSample, OceanographicSample, SynthesisMode};
use crate::temporal::{Clock, TemporalWindow};

/// Everything reconstructed for one query.
#[derive(Debug, Clone)]
pub struct QueryFeatures {
    pub cell: GridCell,
    pub window: TemporalWindow,
    /// Requested label, as given.
    pub hazard_label: String,
    /// `None` when the label is outside the hazard enumeration.
    pub hazard: Option<HazardType>,
    pub ocean: OceanographicSample,
    pub geology: GeologicalSample,
    pub row: FeatureRow,
}

#[derive(Debug, Clone)]
pub struct InferenceFeaturizer {
    synthesizer: FeatureSynthesizer,
    step: f64,
}

impl Default for InferenceFeaturizer {
    fn default() -> Self {
        Self::new(FeatureSynthesizer::default(), DEFAULT_STEP_DEG)
    }
}

impl InferenceFeaturizer {
    pub fn new(synthesizer: FeatureSynthesizer, step: f64) -> Self {
        Self { synthesizer, step }
    }

    /// Estimate-mode features for `point` under `hazard_label`.
    ///
    /// An unknown hazard label synthesizes without hazard multipliers and
    /// encodes with the codec's fallback code.
    pub fn featurize<R: Rng + ?Sized>(
        &self,
        point: LatLon,
        hazard_label: &str,
        clock: &dyn Clock,
        codec: &CategoricalCodec,
        rng: &mut R,
    ) -> QueryFeatures {
        let hazard = hazard_label.parse::<HazardType>().ok();
        let cell = GridCell::for_point(point, self.step);
        let (window, ocean) =
            self.synthesizer.oceanographic_in(&cell, SynthesisMode::Estimate(clock), hazard, rng);
        let geology = self.synthesizer.geology(&cell, rng);

        let row = FeatureRow {
            lat: point.lat,
            lng: point.lon,
            month: window.month,
            day_of_year: window.day_of_year,
            is_monsoon: window.is_monsoon,
            is_cyclone_season: window.is_cyclone_season,
            ocean,
            geology,
            sea_region_code: codec.encode(CategoricalColumn::SeaRegion, cell.region.label()),
            hazard_type_code: codec.encode(CategoricalColumn::HazardType, hazard_label),
            season_code: codec.encode(CategoricalColumn::Season, window.season.label()),
        };

        QueryFeatures { cell, window, hazard_label: hazard_label.to_string(), hazard, ocean, geology, row }
    }
}
