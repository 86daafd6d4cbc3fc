//! Random-forest classifier: bootstrap rows, √p features per split, Gini.
//!
//! Tree `i` is grown from its own `StdRng` seeded with `seed + i`, so the
//! fitted forest is the same whether trees are grown serially or in parallel.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

#[cfg(feature = "threading")]
use rayon::prelude::*;

use super::binning::BinnedMatrix;
use super::cart::{grow, Gini, Tree, TreeParams};
use crate::error::{CoastError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// `None` uses ⌊√p⌋ features per split.
    pub max_features: Option<usize>,
    pub bootstrap: bool,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 150,
            max_depth: 12,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            bootstrap: true,
        }
    }
}

impl ForestParams {
    pub fn validate(&self) -> Result<()> {
        if self.n_trees == 0 {
            return Err(CoastError::Training("forest needs at least one tree".into()));
        }
        if self.max_features == Some(0) {
            return Err(CoastError::Training("max_features must be at least 1".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestClassifier {
    n_classes: usize,
    trees: Vec<Tree<Vec<f64>>>,
}

impl RandomForestClassifier {
    pub fn fit(
        data: &BinnedMatrix,
        labels: &[usize],
        n_classes: usize,
        params: &ForestParams,
        seed: u64,
    ) -> Result<Self> {
        let n = data.n_rows();
        params.validate()?;
        if labels.len() != n {
            return Err(CoastError::Training(format!("{} labels for {n} rows", labels.len())));
        }
        if n_classes == 0 {
            return Err(CoastError::Training("classifier needs at least one class".into()));
        }
        if let Some(&c) = labels.iter().find(|&&c| c >= n_classes) {
            return Err(CoastError::Training(format!("label {c} outside 0..{n_classes}")));
        }

        let p = data.n_features();
        let tree_params = TreeParams {
            max_depth: params.max_depth,
            min_samples_split: params.min_samples_split,
            min_samples_leaf: params.min_samples_leaf,
            max_features: Some(params.max_features.unwrap_or_else(|| sqrt_features(p))),
        };
        let criterion = Gini { labels, n_classes };

        let grow_one = |i: usize| {
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(i as u64));
            let rows: Vec<usize> = if params.bootstrap {
                (0..n).map(|_| rng.gen_range(0..n)).collect()
            } else {
                (0..n).collect()
            };
            grow(data, rows, &criterion, tree_params, &mut rng).tree
        };

        #[cfg(feature = "threading")]
        let trees: Vec<Tree<Vec<f64>>> = (0..params.n_trees).into_par_iter().map(grow_one).collect();
        #[cfg(not(feature = "threading"))]
        let trees: Vec<Tree<Vec<f64>>> = (0..params.n_trees).map(grow_one).collect();

        tracing::debug!(trees = trees.len(), n_classes, max_features = ?tree_params.max_features, "fitted random forest");
        Ok(Self { n_classes, trees })
    }

    /// Mean of the trees' leaf class distributions.
    pub fn predict_proba(&self, x: &[f64]) -> Vec<f64> {
        let mut acc = vec![0.0; self.n_classes];
        for t in &self.trees {
            for (a, p) in acc.iter_mut().zip(t.leaf(x)) {
                *a += p;
            }
        }
        let k = self.trees.len().max(1) as f64;
        acc.iter_mut().for_each(|a| *a /= k);
        acc
    }

    /// Most probable class; ties go to the lower index.
    pub fn predict(&self, x: &[f64]) -> usize {
        argmax(&self.predict_proba(x))
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

fn sqrt_features(p: usize) -> usize {
    ((p as f64).sqrt().floor() as usize).max(1)
}

pub(crate) fn argmax(v: &[f64]) -> usize {
    v.iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |(bi, bv), (i, &x)| if x > bv { (i, x) } else { (bi, bv) })
        .0
}
