//! Quantile binning of the feature matrix for histogram split search.
//!
//! Each feature keeps a sorted list of cut values. A value's bin is the
//! number of cuts strictly below it, so `bin(x) <= b` exactly when
//! `x <= cuts[b]` and a split found on bins can be replayed on raw values.

use serde::{Deserialize, Serialize};

use crate::error::{CoastError, Result};

/// Upper bound on bins per feature; codes fit in a `u8`.
pub const MAX_BINS: usize = 64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureBins {
    cuts: Vec<f64>,
}

impl FeatureBins {
    pub fn fit(values: &[f64], max_bins: usize) -> Self {
        let max_bins = max_bins.clamp(2, MAX_BINS);
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        sorted.sort_by(f64::total_cmp);

        let mut distinct = sorted.clone();
        distinct.dedup();

        let mut cuts = if distinct.len() <= max_bins {
            distinct
        } else {
            let n = sorted.len();
            (1..max_bins).map(|i| sorted[i * n / max_bins]).collect::<Vec<_>>()
        };
        cuts.dedup();
        // The largest value needs no cut above it.
        if let (Some(&last), Some(&max)) = (cuts.last(), sorted.last()) {
            if last >= max {
                cuts.pop();
            }
        }
        Self { cuts }
    }

    pub fn n_bins(&self) -> usize {
        self.cuts.len() + 1
    }

    pub fn bin(&self, x: f64) -> u8 {
        self.cuts.partition_point(|&c| c < x) as u8
    }

    /// Raw threshold for a split that sends bins `0..=b` left.
    pub fn threshold(&self, b: usize) -> f64 {
        self.cuts[b]
    }
}

/// Column-major binned copy of a row-major feature matrix.
#[derive(Debug, Clone)]
pub struct BinnedMatrix {
    features: Vec<FeatureBins>,
    columns: Vec<Vec<u8>>,
    n_rows: usize,
}

impl BinnedMatrix {
    pub fn fit(rows: &[Vec<f64>], max_bins: usize) -> Result<Self> {
        let n_features = match rows.first() {
            Some(r) if !r.is_empty() => r.len(),
            Some(_) => return Err(CoastError::Training("feature rows are empty".into())),
            None => return Err(CoastError::Training("no training rows".into())),
        };
        for (i, r) in rows.iter().enumerate() {
            if r.len() != n_features {
                return Err(CoastError::Training(format!(
                    "row {i} has {} features, expected {n_features}",
                    r.len()
                )));
            }
            if let Some(v) = r.iter().find(|v| !v.is_finite()) {
                return Err(CoastError::Training(format!("row {i} contains non-finite value {v}")));
            }
        }

        let mut features = Vec::with_capacity(n_features);
        let mut columns = Vec::with_capacity(n_features);
        for f in 0..n_features {
            let values: Vec<f64> = rows.iter().map(|r| r[f]).collect();
            let bins = FeatureBins::fit(&values, max_bins);
            columns.push(values.iter().map(|&v| bins.bin(v)).collect());
            features.push(bins);
        }

        Ok(Self { features, columns, n_rows: rows.len() })
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_features(&self) -> usize {
        self.features.len()
    }

    pub fn feature(&self, f: usize) -> &FeatureBins {
        &self.features[f]
    }

    #[inline]
    pub fn code(&self, f: usize, row: usize) -> u8 {
        self.columns[f][row]
    }
}
