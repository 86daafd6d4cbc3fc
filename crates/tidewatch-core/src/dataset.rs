//! Training-table assembly.
//!
//! Pipeline:
//!   1. Sample min(max_cells, G) grid cells and floor(W × rate) windows, both
//!      without replacement.
//!   2. For every (cell, window) pair draw `samples_per_cell` hazards from the
//!      cell's region weights.
//!   3. Synthesize ocean + geology features and label each draw.

use std::collections::{BTreeMap, HashSet};
use std::io;

use chrono::NaiveDate;
use rand::seq::index;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{CoastError, Result};
use crate::grid::{GridCell, Region, SpatialGrid, DEFAULT_STEP_DEG, MAX_LATTICE_POINTS};
use crate::hazard::{HazardSampler, HazardType, HazardWeights};
use crate::labeling::{classify, IntensityBin, RiskLabeler, SeasonalRiskTable, Severity};
use crate::synthesis::{round_to, FeatureSynthesizer, GeologicalSample, OceanographicSample};
use crate::temporal::{Season, TemporalWindow, TemporalWindowSet, DEFAULT_NUM_DAYS, DEFAULT_START};

// ── Configuration ─────────────────────────────────────────────────────────────

/// How geology is drawn during generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeologyMode {
    /// One profile per sampled cell, shared by all of its rows.
    #[default]
    PerCell,
    /// A fresh profile for every row.
    PerDraw,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub grid_step_deg: f64,
    pub start_date: NaiveDate,
    pub num_days: u32,
    /// Upper bound on sampled grid cells.
    pub max_cells: usize,
    pub samples_per_cell: usize,
    /// Fraction of windows sampled, in (0, 1].
    pub temporal_sampling_rate: f64,
    /// `None` seeds from OS entropy.
    pub seed: Option<u64>,
    pub geology_mode: GeologyMode,
    pub hazard_weights: HazardWeights,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        let (y, m, d) = DEFAULT_START;
        Self {
            grid_step_deg: DEFAULT_STEP_DEG,
            start_date: NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default(),
            num_days: DEFAULT_NUM_DAYS,
            max_cells: 150,
            samples_per_cell: 3,
            temporal_sampling_rate: 0.15,
            seed: None,
            geology_mode: GeologyMode::PerCell,
            hazard_weights: HazardWeights::default(),
        }
    }
}

impl GenerationConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.grid_step_deg.is_finite() && self.grid_step_deg > 0.0) {
            return Err(CoastError::GenerationConfig(format!(
                "grid step must be positive, got {}",
                self.grid_step_deg
            )));
        }
        let lattice = SpatialGrid::lattice_points(self.grid_step_deg);
        if lattice > MAX_LATTICE_POINTS {
            return Err(CoastError::GenerationConfig(format!(
                "grid step {} enumerates {lattice:.0} points, limit is {MAX_LATTICE_POINTS:.0}",
                self.grid_step_deg
            )));
        }
        TemporalWindowSet::last_date(self.start_date, self.num_days)?;
        if self.max_cells == 0 {
            return Err(CoastError::GenerationConfig("max_cells must be at least 1".into()));
        }
        check_sampling(self.samples_per_cell, self.temporal_sampling_rate)?;
        self.hazard_weights.validate()
    }
}

fn check_sampling(samples_per_cell: usize, rate: f64) -> Result<()> {
    if samples_per_cell == 0 {
        return Err(CoastError::GenerationConfig("samples_per_cell must be at least 1".into()));
    }
    if !(rate > 0.0 && rate <= 1.0) {
        return Err(CoastError::GenerationConfig(format!(
            "temporal_sampling_rate must be in (0, 1], got {rate}"
        )));
    }
    Ok(())
}

// ── Records ───────────────────────────────────────────────────────────────────

/// One labeled row of the training table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingRecord {
    pub cell_id: String,
    pub lat: f64,
    pub lng: f64,
    pub sea_region: Region,
    pub date: NaiveDate,
    pub year: i32,
    pub month: u32,
    pub day_of_year: u32,
    pub season: Season,
    pub is_monsoon: bool,
    pub is_cyclone_season: bool,
    #[serde(flatten)]
    pub ocean: OceanographicSample,
    #[serde(flatten)]
    pub geology: GeologicalSample,
    pub hazard_type: HazardType,
    /// Rounded to 4 decimals; severity and intensity are derived from this value.
    pub risk_score: f64,
    pub seasonal_risk_multiplier: f64,
    pub severity: Severity,
    pub intensity_bin: IntensityBin,
}

const CSV_HEADER: [&str; 24] = [
    "cell_id",
    "lat",
    "lng",
    "sea_region",
    "timestamp",
    "year",
    "month",
    "day_of_year",
    "season",
    "is_monsoon",
    "is_cyclone_season",
    "sst_celsius",
    "wave_height_m",
    "wind_speed_kmh",
    "current_velocity_ms",
    "tide_level_m",
    "bathymetry_depth_m",
    "coastal_slope_deg",
    "tidal_range_m",
    "hazard_type",
    "risk_score",
    "seasonal_risk_multiplier",
    "severity",
    "intensity_bin",
];

/// Write the table as CSV with a header row.
pub fn write_csv<W: io::Write>(records: &[TrainingRecord], out: W) -> Result<()> {
    let mut w = csv::Writer::from_writer(out);
    w.write_record(CSV_HEADER)?;
    for r in records {
        w.write_record([
            r.cell_id.clone(),
            r.lat.to_string(),
            r.lng.to_string(),
            r.sea_region.to_string(),
            r.date.to_string(),
            r.year.to_string(),
            r.month.to_string(),
            r.day_of_year.to_string(),
            r.season.to_string(),
            r.is_monsoon.to_string(),
            r.is_cyclone_season.to_string(),
            r.ocean.sst_celsius.to_string(),
            r.ocean.wave_height_m.to_string(),
            r.ocean.wind_speed_kmh.to_string(),
            r.ocean.current_velocity_ms.to_string(),
            r.ocean.tide_level_m.to_string(),
            r.geology.bathymetry_depth_m.to_string(),
            r.geology.coastal_slope_deg.to_string(),
            r.geology.tidal_range_m.to_string(),
            r.hazard_type.to_string(),
            r.risk_score.to_string(),
            r.seasonal_risk_multiplier.to_string(),
            r.severity.to_string(),
            r.intensity_bin.to_string(),
        ])?;
    }
    w.flush()?;
    Ok(())
}

// ── Summary ───────────────────────────────────────────────────────────────────

/// Observed range of one numeric column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColumnRange {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetSummary {
    pub rows: usize,
    pub unique_cells: usize,
    pub regions: Vec<Region>,
    pub hazard_counts: BTreeMap<HazardType, usize>,
    pub ranges: BTreeMap<&'static str, ColumnRange>,
}

impl DatasetSummary {
    pub fn from_records(records: &[TrainingRecord]) -> Self {
        let mut hazard_counts = BTreeMap::new();
        let mut cells = HashSet::new();
        let mut regions = Vec::new();
        let mut ranges: BTreeMap<&'static str, ColumnRange> = BTreeMap::new();

        for r in records {
            *hazard_counts.entry(r.hazard_type).or_insert(0) += 1;
            cells.insert(r.cell_id.as_str());
            if !regions.contains(&r.sea_region) {
                regions.push(r.sea_region);
            }
            let columns = [
                ("sst_celsius", r.ocean.sst_celsius),
                ("wave_height_m", r.ocean.wave_height_m),
                ("wind_speed_kmh", r.ocean.wind_speed_kmh),
                ("bathymetry_depth_m", r.geology.bathymetry_depth_m),
                ("tidal_range_m", r.geology.tidal_range_m),
                ("risk_score", r.risk_score),
            ];
            for (name, v) in columns {
                ranges
                    .entry(name)
                    .and_modify(|c| {
                        c.min = c.min.min(v);
                        c.max = c.max.max(v);
                    })
                    .or_insert(ColumnRange { min: v, max: v });
            }
        }

        Self { rows: records.len(), unique_cells: cells.len(), regions, hazard_counts, ranges }
    }

    pub fn log(&self) {
        tracing::info!(rows = self.rows, cells = self.unique_cells, regions = ?self.regions, "dataset summary");
        for (hazard, n) in &self.hazard_counts {
            tracing::info!(%hazard, rows = n, "hazard distribution");
        }
        for (name, r) in &self.ranges {
            tracing::info!(column = name, min = r.min, max = r.max, "feature range");
        }
    }
}

// ── Assembler ─────────────────────────────────────────────────────────────────

pub struct DatasetAssembler {
    grid: SpatialGrid,
    windows: TemporalWindowSet,
    hazards: HazardSampler,
    synthesizer: FeatureSynthesizer,
    labeler: RiskLabeler,
    max_cells: usize,
    geology_mode: GeologyMode,
}

impl DatasetAssembler {
    /// Validates the weights and the seasonal table before anything is sampled.
    pub fn new(grid: SpatialGrid, windows: TemporalWindowSet, weights: &HazardWeights) -> Result<Self> {
        let labeler = RiskLabeler::new(SeasonalRiskTable::default());
        labeler.seasonal.validate()?;
        Ok(Self {
            grid,
            windows,
            hazards: weights.sampler()?,
            synthesizer: FeatureSynthesizer::default(),
            labeler,
            max_cells: 150,
            geology_mode: GeologyMode::PerCell,
        })
    }

    /// Grid, windows and limits taken from `config`.
    pub fn from_config(config: &GenerationConfig) -> Result<Self> {
        config.validate()?;
        let grid = SpatialGrid::build(config.grid_step_deg);
        let windows = TemporalWindowSet::build(config.start_date, config.num_days)?;
        Ok(Self::new(grid, windows, &config.hazard_weights)?
            .with_max_cells(config.max_cells)
            .with_geology_mode(config.geology_mode))
    }

    pub fn with_max_cells(mut self, max_cells: usize) -> Self {
        self.max_cells = max_cells;
        self
    }

    pub fn with_geology_mode(mut self, mode: GeologyMode) -> Self {
        self.geology_mode = mode;
        self
    }

    pub fn with_labeler(mut self, labeler: RiskLabeler) -> Self {
        self.labeler = labeler;
        self
    }

    pub fn grid(&self) -> &SpatialGrid {
        &self.grid
    }

    pub fn windows(&self) -> &TemporalWindowSet {
        &self.windows
    }

    /// Number of rows `generate` will produce for these parameters.
    pub fn expected_rows(&self, samples_per_cell: usize, temporal_sampling_rate: f64) -> usize {
        self.cell_count() * self.window_count(temporal_sampling_rate) * samples_per_cell
    }

    fn cell_count(&self) -> usize {
        self.max_cells.min(self.grid.len())
    }

    fn window_count(&self, rate: f64) -> usize {
        (self.windows.len() as f64 * rate).floor() as usize
    }

    pub fn generate<R: Rng + ?Sized>(
        &self,
        samples_per_cell: usize,
        temporal_sampling_rate: f64,
        rng: &mut R,
    ) -> Result<Vec<TrainingRecord>> {
        check_sampling(samples_per_cell, temporal_sampling_rate)?;
        if self.max_cells == 0 {
            return Err(CoastError::GenerationConfig("max_cells must be at least 1".into()));
        }
        if self.grid.is_empty() {
            return Err(CoastError::GenerationConfig("spatial grid is empty".into()));
        }
        if self.windows.is_empty() {
            return Err(CoastError::GenerationConfig("temporal window set is empty".into()));
        }

        let n_cells = self.cell_count();
        let n_windows = self.window_count(temporal_sampling_rate);
        if n_windows == 0 {
            return Err(CoastError::GenerationConfig(format!(
                "rate {temporal_sampling_rate} over {} windows samples no windows",
                self.windows.len()
            )));
        }

        let cells: Vec<&GridCell> = index::sample(rng, self.grid.len(), n_cells)
            .into_iter()
            .map(|i| &self.grid.cells[i])
            .collect();
        let windows: Vec<&TemporalWindow> = index::sample(rng, self.windows.len(), n_windows)
            .into_iter()
            .map(|i| &self.windows.windows[i])
            .collect();

        tracing::info!(
            cells = n_cells,
            windows = n_windows,
            samples_per_cell,
            expected = n_cells * n_windows * samples_per_cell,
            "generating training table"
        );

        let mut records = Vec::with_capacity(n_cells * n_windows * samples_per_cell);
        for cell in cells {
            let cell_geology = self.synthesizer.geology(cell, rng);
            for window in &windows {
                for _ in 0..samples_per_cell {
                    let hazard = self.hazards.sample(cell.region, rng);
                    let ocean = self.synthesizer.oceanographic(cell, window, hazard, rng);
                    let geology = match self.geology_mode {
                        GeologyMode::PerCell => cell_geology,
                        GeologyMode::PerDraw => self.synthesizer.geology(cell, rng),
                    };
                    records.push(self.label(cell, window, hazard, ocean, geology, rng));
                }
            }
        }

        Ok(records)
    }

    fn label<R: Rng + ?Sized>(
        &self,
        cell: &GridCell,
        window: &TemporalWindow,
        hazard: HazardType,
        ocean: OceanographicSample,
        geology: GeologicalSample,
        rng: &mut R,
    ) -> TrainingRecord {
        let (score, multiplier) =
            self.labeler.score(hazard, window.season, cell.region, &ocean, &geology, rng);
        let risk_score = round_to(score, 4);
        let (severity, intensity_bin) = classify(risk_score);
        TrainingRecord {
            cell_id: cell.id.clone(),
            lat: cell.center.lat,
            lng: cell.center.lon,
            sea_region: cell.region,
            date: window.date,
            year: window.year,
            month: window.month,
            day_of_year: window.day_of_year,
            season: window.season,
            is_monsoon: window.is_monsoon,
            is_cyclone_season: window.is_cyclone_season,
            ocean,
            geology,
            hazard_type: hazard,
            risk_score,
            seasonal_risk_multiplier: round_to(multiplier, 3),
            severity,
            intensity_bin,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()
    }

    fn small_assembler(max_cells: usize, days: u32) -> DatasetAssembler {
        let grid = SpatialGrid::default();
        let windows = TemporalWindowSet::build(start(), days).unwrap();
        DatasetAssembler::new(grid, windows, &HazardWeights::default())
            .unwrap()
            .with_max_cells(max_cells)
    }

    #[test]
    fn row_count_is_cells_times_windows_times_draws() {
        let a = small_assembler(10, 40);
        let mut rng = StdRng::seed_from_u64(1);
        let rows = a.generate(3, 0.15, &mut rng).unwrap();
        // floor(40 × 0.15) = 6
        assert_eq!(rows.len(), 10 * 6 * 3);
        assert_eq!(rows.len(), a.expected_rows(3, 0.15));
    }

    #[test]
    fn default_sizes() {
        let a = DatasetAssembler::from_config(&GenerationConfig::default()).unwrap();
        assert_eq!(a.grid().len(), 1566);
        assert_eq!(a.windows().len(), 730);
        assert_eq!(a.expected_rows(3, 0.15), 150 * 109 * 3);
    }

    #[test]
    fn cap_larger_than_grid_uses_whole_grid() {
        let grid = SpatialGrid::build(2.0);
        let g = grid.len();
        let windows = TemporalWindowSet::build(start(), 10).unwrap();
        let a = DatasetAssembler::new(grid, windows, &HazardWeights::default())
            .unwrap()
            .with_max_cells(10_000);
        let rows = a.generate(1, 1.0, &mut StdRng::seed_from_u64(2)).unwrap();
        assert_eq!(rows.len(), g * 10);
        let cells: HashSet<_> = rows.iter().map(|r| r.cell_id.clone()).collect();
        assert_eq!(cells.len(), g);
    }

    #[test]
    fn labels_consistent_with_score() {
        let a = small_assembler(20, 30);
        let rows = a.generate(2, 0.5, &mut StdRng::seed_from_u64(3)).unwrap();
        for r in &rows {
            assert!((0.0..=1.0).contains(&r.risk_score));
            assert_eq!((r.severity, r.intensity_bin), classify(r.risk_score));
            assert_eq!(Region::classify(r.lat, r.lng), r.sea_region);
        }
    }

    #[test]
    fn per_cell_geology_is_shared_across_rows() {
        let a = small_assembler(15, 30);
        let rows = a.generate(3, 0.3, &mut StdRng::seed_from_u64(4)).unwrap();
        let mut by_cell: HashMap<&str, GeologicalSample> = HashMap::new();
        for r in &rows {
            let g = by_cell.entry(r.cell_id.as_str()).or_insert(r.geology);
            assert_eq!(*g, r.geology, "cell {} has two geology profiles", r.cell_id);
        }
    }

    #[test]
    fn per_draw_geology_varies_within_cell() {
        let a = small_assembler(5, 30).with_geology_mode(GeologyMode::PerDraw);
        let rows = a.generate(3, 0.3, &mut StdRng::seed_from_u64(5)).unwrap();
        let first = &rows[0];
        let distinct = rows
            .iter()
            .filter(|r| r.cell_id == first.cell_id && r.geology != first.geology)
            .count();
        assert!(distinct > 0);
    }

    #[test]
    fn seeded_generation_is_reproducible() {
        let a = small_assembler(8, 20);
        let x = a.generate(2, 0.5, &mut StdRng::seed_from_u64(6)).unwrap();
        let y = a.generate(2, 0.5, &mut StdRng::seed_from_u64(6)).unwrap();
        assert_eq!(x, y);
    }

    #[test]
    fn illegal_parameters_rejected() {
        let a = small_assembler(10, 20);
        let mut rng = StdRng::seed_from_u64(7);
        assert!(matches!(a.generate(0, 0.15, &mut rng), Err(CoastError::GenerationConfig(_))));
        assert!(matches!(a.generate(3, 0.0, &mut rng), Err(CoastError::GenerationConfig(_))));
        assert!(matches!(a.generate(3, 1.5, &mut rng), Err(CoastError::GenerationConfig(_))));
        // floor(20 × 0.01) = 0 windows.
        assert!(matches!(a.generate(3, 0.01, &mut rng), Err(CoastError::GenerationConfig(_))));
        let zero = small_assembler(0, 20);
        assert!(matches!(zero.generate(3, 0.5, &mut rng), Err(CoastError::GenerationConfig(_))));
    }

    #[test]
    fn config_validation() {
        assert!(GenerationConfig::default().validate().is_ok());
        let mut bad = GenerationConfig::default();
        bad.hazard_weights.andaman_sea[0] += 0.1;
        assert!(matches!(bad.validate(), Err(CoastError::GenerationConfig(_))));
        let bad = GenerationConfig { max_cells: 0, ..GenerationConfig::default() };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn unbounded_sizes_fail_before_allocation() {
        let days = GenerationConfig { num_days: u32::MAX, ..GenerationConfig::default() };
        assert!(matches!(days.validate(), Err(CoastError::GenerationConfig(_))));
        assert!(matches!(DatasetAssembler::from_config(&days), Err(CoastError::GenerationConfig(_))));

        let step = GenerationConfig { grid_step_deg: 1e-9, ..GenerationConfig::default() };
        assert!(matches!(step.validate(), Err(CoastError::GenerationConfig(_))));
        assert!(matches!(DatasetAssembler::from_config(&step), Err(CoastError::GenerationConfig(_))));

        let fine = GenerationConfig { grid_step_deg: 0.05, num_days: 3650, ..GenerationConfig::default() };
        assert!(fine.validate().is_ok());
    }

    #[test]
    fn csv_has_header_and_one_line_per_row() {
        let a = small_assembler(3, 10);
        let rows = a.generate(1, 0.5, &mut StdRng::seed_from_u64(8)).unwrap();
        let mut buf = Vec::new();
        write_csv(&rows, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), rows.len() + 1);
        assert!(lines[0].starts_with("cell_id,lat,lng,sea_region,timestamp"));
    }

    #[test]
    fn json_record_is_flat() {
        let a = small_assembler(1, 10);
        let rows = a.generate(1, 0.1, &mut StdRng::seed_from_u64(9)).unwrap();
        let v = serde_json::to_value(&rows[0]).unwrap();
        assert!(v.get("sst_celsius").is_some());
        assert!(v.get("bathymetry_depth_m").is_some());
        let back: TrainingRecord = serde_json::from_value(v).unwrap();
        assert_eq!(back.cell_id, rows[0].cell_id);
        assert_eq!(back.hazard_type, rows[0].hazard_type);
        assert_eq!(back.date, rows[0].date);
    }

    #[test]
    fn summary_counts_hazards() {
        let a = small_assembler(10, 20);
        let rows = a.generate(3, 0.5, &mut StdRng::seed_from_u64(10)).unwrap();
        let s = DatasetSummary::from_records(&rows);
        assert_eq!(s.rows, rows.len());
        assert_eq!(s.hazard_counts.values().sum::<usize>(), rows.len());
        assert_eq!(s.unique_cells, 10);
        let r = s.ranges["risk_score"];
        assert!(r.min <= r.max);
    }
}
