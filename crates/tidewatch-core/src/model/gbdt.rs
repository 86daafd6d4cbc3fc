//! Gradient-boosted regression trees with squared loss.
//!
//! F₀ = mean(y); each round fits a tree to the residuals y − F on a row
//! subsample and adds `learning_rate × tree` to every row's prediction.

use rand::seq::index;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::binning::BinnedMatrix;
use super::cart::{grow, Regression, Tree, TreeParams};
use crate::error::{CoastError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GbdtParams {
    pub n_trees: usize,
    pub max_depth: usize,
    pub learning_rate: f64,
    /// Fraction of rows drawn (without replacement) per round.
    pub subsample: f64,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl Default for GbdtParams {
    fn default() -> Self {
        Self {
            n_trees: 200,
            max_depth: 8,
            learning_rate: 0.1,
            subsample: 0.8,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

impl GbdtParams {
    pub fn validate(&self) -> Result<()> {
        if self.n_trees == 0 {
            return Err(CoastError::Training("gbdt needs at least one tree".into()));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(CoastError::Training(format!("learning rate {} outside (0, 1]", self.learning_rate)));
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return Err(CoastError::Training(format!("subsample {} outside (0, 1]", self.subsample)));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostedRegressor {
    base: f64,
    learning_rate: f64,
    trees: Vec<Tree<f64>>,
    /// Normalized total split gain per feature.
    importances: Vec<f64>,
}

impl GradientBoostedRegressor {
    pub fn fit<R: Rng + ?Sized>(
        data: &BinnedMatrix,
        targets: &[f64],
        params: &GbdtParams,
        rng: &mut R,
    ) -> Result<Self> {
        params.validate()?;
        let n = data.n_rows();
        if targets.len() != n {
            return Err(CoastError::Training(format!("{} targets for {n} rows", targets.len())));
        }
        if let Some(y) = targets.iter().find(|y| !y.is_finite()) {
            return Err(CoastError::Training(format!("non-finite target {y}")));
        }

        let base = targets.iter().sum::<f64>() / n as f64;
        let mut pred = vec![base; n];
        let mut residuals = vec![0.0; n];
        let mut gains = vec![0.0; data.n_features()];
        let mut trees = Vec::with_capacity(params.n_trees);
        let n_sub = ((n as f64 * params.subsample).round() as usize).clamp(1, n);
        let tree_params = TreeParams {
            max_depth: params.max_depth,
            min_samples_split: params.min_samples_split,
            min_samples_leaf: params.min_samples_leaf,
            max_features: None,
        };

        for round in 0..params.n_trees {
            for i in 0..n {
                residuals[i] = targets[i] - pred[i];
            }
            let rows = if n_sub < n { index::sample(rng, n, n_sub).into_vec() } else { (0..n).collect() };
            let grown = grow(data, rows, &Regression { targets: &residuals }, tree_params, rng);

            for (i, p) in pred.iter_mut().enumerate() {
                *p += params.learning_rate * grown.tree.leaf_binned(data, i);
            }
            for (g, t) in gains.iter_mut().zip(&grown.gains) {
                *g += t;
            }
            trees.push(grown.tree);

            if (round + 1) % 50 == 0 {
                let mse = targets.iter().zip(&pred).map(|(y, p)| (y - p).powi(2)).sum::<f64>() / n as f64;
                tracing::debug!(round = round + 1, mse, "gbdt progress");
            }
        }

        let total: f64 = gains.iter().sum();
        let importances = if total > 0.0 {
            gains.iter().map(|g| g / total).collect()
        } else {
            vec![0.0; gains.len()]
        };

        Ok(Self { base, learning_rate: params.learning_rate, trees, importances })
    }

    pub fn predict(&self, x: &[f64]) -> f64 {
        self.base + self.learning_rate * self.trees.iter().map(|t| *t.leaf(x)).sum::<f64>()
    }

    pub fn feature_importances(&self) -> &[f64] {
        &self.importances
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}
