//! Label encoding for the nominal columns of the training table.
//!
//! Codes are positions in the sorted list of distinct labels observed at fit
//! time, so the mapping is a pure function of the fitted table.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dataset::TrainingRecord;
use crate::error::{CoastError, Result};

/// Code used for any label the codec has not seen.
pub const FALLBACK_CODE: u32 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoricalColumn {
    SeaRegion,
    HazardType,
    Season,
    Severity,
    IntensityBin,
}

impl CategoricalColumn {
    pub const ALL: [CategoricalColumn; 5] = [
        CategoricalColumn::SeaRegion,
        CategoricalColumn::HazardType,
        CategoricalColumn::Season,
        CategoricalColumn::Severity,
        CategoricalColumn::IntensityBin,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CategoricalColumn::SeaRegion => "sea_region",
            CategoricalColumn::HazardType => "hazard_type",
            CategoricalColumn::Season => "season",
            CategoricalColumn::Severity => "severity",
            CategoricalColumn::IntensityBin => "intensity_bin",
        }
    }

    fn label_of(self, r: &TrainingRecord) -> String {
        match self {
            CategoricalColumn::SeaRegion => r.sea_region.to_string(),
            CategoricalColumn::HazardType => r.hazard_type.to_string(),
            CategoricalColumn::Season => r.season.to_string(),
            CategoricalColumn::Severity => r.severity.to_string(),
            CategoricalColumn::IntensityBin => r.intensity_bin.to_string(),
        }
    }
}

impl fmt::Display for CategoricalColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fitted forward/inverse label mappings. Built once per training table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalCodec {
    /// Sorted distinct labels per column; a label's code is its index.
    classes: BTreeMap<CategoricalColumn, Vec<String>>,
}

impl CategoricalCodec {
    pub fn fit(records: &[TrainingRecord]) -> Result<Self> {
        if records.is_empty() {
            return Err(CoastError::Training("cannot fit codec on an empty table".into()));
        }
        let mut classes = BTreeMap::new();
        for column in CategoricalColumn::ALL {
            let mut labels: Vec<String> = records.iter().map(|r| column.label_of(r)).collect();
            labels.sort();
            labels.dedup();
            tracing::debug!(%column, classes = ?labels, "fitted codec column");
            classes.insert(column, labels);
        }
        Ok(Self { classes })
    }

    fn labels(&self, column: CategoricalColumn) -> &[String] {
        self.classes.get(&column).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Strict lookup.
    pub fn try_encode(&self, column: CategoricalColumn, label: &str) -> Result<u32> {
        self.labels(column)
            .binary_search_by(|l| l.as_str().cmp(label))
            .map(|i| i as u32)
            .map_err(|_| CoastError::Validation(format!("unseen {column} label '{label}'")))
    }

    /// Lenient lookup: an unseen label encodes as [`FALLBACK_CODE`].
    pub fn encode(&self, column: CategoricalColumn, label: &str) -> u32 {
        match self.try_encode(column, label) {
            Ok(code) => code,
            Err(_) => {
                tracing::warn!(%column, label, code = FALLBACK_CODE, "unseen category, using fallback code");
                FALLBACK_CODE
            }
        }
    }

    pub fn decode(&self, column: CategoricalColumn, code: u32) -> Option<&str> {
        self.labels(column).get(code as usize).map(String::as_str)
    }

    pub fn cardinality(&self, column: CategoricalColumn) -> usize {
        self.labels(column).len()
    }

    pub fn classes(&self, column: CategoricalColumn) -> &[String] {
        self.labels(column)
    }
}
