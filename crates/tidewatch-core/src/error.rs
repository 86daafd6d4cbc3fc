use thiserror::Error;

/// Errors surfaced by the generation pipeline, the ensemble and the service facade.
#[derive(Debug, Error)]
pub enum CoastError {
    /// Missing or invalid coordinates, malformed request payloads.
    #[error("validation error: {0}")]
    Validation(String),

    /// `predict` called before `train_or_load` completed.
    #[error("models are not trained; call train_or_load first")]
    UntrainedModel,

    /// Illegal sampling parameters or incomplete lookup tables.
    #[error("generation config error: {0}")]
    GenerationConfig(String),

    /// Fit-time failure on malformed training data.
    #[error("training error: {0}")]
    Training(String),

    /// The fitted column layout differs from the featurizer's layout.
    #[error("feature schema mismatch: expected {expected:?}, found {found:?}")]
    SchemaMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("snapshot error: {0}")]
    Snapshot(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, CoastError>;
