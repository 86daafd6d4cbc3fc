//! Service configuration: generation, model and persistence settings.
//!
//! Every section has a `Default` carrying the documented constants, and
//! partial JSON files override only the keys they name.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::hazard::HazardWeights;

pub use crate::dataset::{GenerationConfig, GeologyMode};
pub use crate::ensemble::ModelConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub data_dir: PathBuf,
    pub snapshot_file: String,
    /// Write a snapshot after training.
    pub persist: bool,
    pub generation: GenerationConfig,
    /// Hazard draw weights for batch queries.
    pub batch_hazard_weights: HazardWeights,
    pub model: ModelConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            snapshot_file: "ensemble_snapshot.json".to_string(),
            persist: true,
            generation: GenerationConfig::default(),
            batch_hazard_weights: HazardWeights::batch(),
            model: ModelConfig::default(),
        }
    }
}

impl ServiceConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join(&self.snapshot_file)
    }

    pub fn validate(&self) -> Result<()> {
        self.generation.validate()?;
        self.batch_hazard_weights.validate()?;
        self.model.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoastError;
    use std::io::Write;

    #[test]
    fn defaults_carry_documented_constants() {
        let c = ServiceConfig::default();
        assert_eq!(c.generation.samples_per_cell, 3);
        assert_eq!(c.generation.temporal_sampling_rate, 0.15);
        assert_eq!(c.generation.max_cells, 150);
        assert_eq!(c.generation.geology_mode, GeologyMode::PerCell);
        assert_eq!(c.model.risk.n_trees, 200);
        assert_eq!(c.model.severity.min_samples_split, 5);
        assert_eq!(c.model.intensity.max_depth, 10);
        assert!(c.model.include_geology);
        assert_eq!(c.snapshot_path(), PathBuf::from("data/ensemble_snapshot.json"));
        assert!(c.validate().is_ok());
    }

    #[test]
    fn partial_file_overrides_named_keys() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(
            f,
            r#"{{ "data_dir": "/tmp/tw", "generation": {{ "seed": 7, "geology_mode": "per_draw" }}, "model": {{ "include_geology": false }} }}"#
        )
        .unwrap();
        let c = ServiceConfig::from_json_file(f.path()).unwrap();
        assert_eq!(c.data_dir, PathBuf::from("/tmp/tw"));
        assert_eq!(c.generation.seed, Some(7));
        assert_eq!(c.generation.geology_mode, GeologyMode::PerDraw);
        assert_eq!(c.generation.num_days, 730);
        assert!(!c.model.include_geology);
        assert_eq!(c.model.risk.learning_rate, 0.1);
    }

    #[test]
    fn model_and_batch_sections_validated_up_front() {
        let mut c = ServiceConfig::default();
        c.model.severity.n_trees = 0;
        assert!(matches!(c.validate(), Err(CoastError::Training(_))));

        let c = ServiceConfig { model: ModelConfig { max_bins: 65, ..ModelConfig::default() }, ..ServiceConfig::default() };
        assert!(matches!(c.validate(), Err(CoastError::Training(_))));

        let mut c = ServiceConfig::default();
        c.batch_hazard_weights.arabian_sea[5] = 0.5;
        assert!(matches!(c.validate(), Err(CoastError::GenerationConfig(_))));
    }

    #[test]
    fn batch_weights_default_and_override() {
        assert_eq!(ServiceConfig::default().batch_hazard_weights, HazardWeights::batch());
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(
            f,
            r#"{{ "batch_hazard_weights": {{
                "bay_of_bengal": [0, 1, 0, 0, 0, 0, 0],
                "arabian_sea": [0, 0, 1, 0, 0, 0, 0],
                "andaman_sea": [1, 0, 0, 0, 0, 0, 0] }} }}"#
        )
        .unwrap();
        let c = ServiceConfig::from_json_file(f.path()).unwrap();
        assert_eq!(c.batch_hazard_weights.andaman_sea[0], 1.0);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "{{ not json").unwrap();
        assert!(ServiceConfig::from_json_file(f.path()).is_err());
    }
}
