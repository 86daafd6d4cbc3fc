//! Coastal hazard risk for the Indian coastline: synthetic training data and
//! a three-model ensemble for point queries.
//!
//! Pipeline:
//!   grid + temporal windows → feature synthesis (ocean, geology) →
//!   risk labeling → training table → categorical codec + feature schema →
//!   ensemble fit (GBDT risk, RF severity, RF intensity) → snapshot.
//!
//! At query time the service rebuilds the same feature row for an arbitrary
//! point from the current date and runs the three heads.

pub mod codec;
pub mod config;
pub mod coords;
pub mod dataset;
pub mod ensemble;
pub mod error;
pub mod grid;
pub mod hazard;
pub mod inference;
pub mod labeling;
pub mod locations;
pub mod model;
pub mod schema;
pub mod service;
pub mod synthesis;
pub mod temporal;

pub use config::ServiceConfig;
pub use coords::LatLon;
pub use dataset::{DatasetAssembler, DatasetSummary, GenerationConfig, GeologyMode, TrainingRecord};
pub use ensemble::{EnsemblePredictor, ModelConfig, ModelSnapshot};
pub use error::{CoastError, Result};
pub use grid::Region;
pub use hazard::HazardType;
pub use labeling::{IntensityBin, Severity};
pub use service::{HazardService, PredictionResult, TrainOutcome};
pub use temporal::{Clock, FixedClock, Season, SystemClock};
