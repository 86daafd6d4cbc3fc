//! Tree-ensemble learners used by the hazard ensemble.
//!
//! - `binning`: quantile bins shared by every tree of one fit
//! - `cart`:    histogram CART growth, generic over the split criterion
//! - `gbdt`:    boosted regression trees (risk score)
//! - `forest`:  random-forest classifiers (severity, intensity)

pub mod binning;
pub mod cart;
pub mod forest;
pub mod gbdt;

pub use binning::{BinnedMatrix, MAX_BINS};
pub use cart::{Tree, TreeParams};
pub use forest::{ForestParams, RandomForestClassifier};
pub use gbdt::{GbdtParams, GradientBoostedRegressor};
