use crate::types::metric::TargetMetric;
use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("Model directory '{0}' is not usable")]
    ArtifactDir(PathBuf, #[source] std::io::Error),

    #[error("Failed to write model artifact '{0}'")]
    ArtifactWrite(PathBuf, #[source] std::io::Error),

    #[error("Failed to replace model artifact '{0}'")]
    ArtifactPersist(PathBuf, #[source] tempfile::PersistError),

    #[error("Failed to read model artifact '{0}'")]
    ArtifactRead(PathBuf, #[source] std::io::Error),

    #[error("Failed to encode model artifact for {area}/{metric}")]
    ArtifactEncode {
        area: String,
        metric: TargetMetric,
        #[source]
        source: Box<bincode::error::EncodeError>,
    },

    #[error("Failed to decode model artifact '{0}'")]
    ArtifactDecode(PathBuf, #[source] Box<bincode::error::DecodeError>),

    #[error("Fitting {metric} for {area} failed")]
    Fit {
        area: String,
        metric: TargetMetric,
        #[source]
        source: BoostingError,
    },

    #[error("Predicting {metric} for {area} failed")]
    Predict {
        area: String,
        metric: TargetMetric,
        #[source]
        source: BoostingError,
    },

    #[error("Column '{column}' contains missing or non-finite values")]
    NonFiniteInput { column: String },

    #[error("Failed processing feature frame: {0}")]
    Frame(#[from] PolarsError),

    #[error("Feature mismatch for {metric}: model expects {expected:?}, inference built {found:?}")]
    FeatureMismatch {
        metric: TargetMetric,
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("No usable {metric} history for {area}")]
    NoHistory { area: String, metric: TargetMetric },
}

#[derive(Debug, Error)]
pub enum BoostingError {
    #[error("Training set is empty")]
    EmptyTrainingSet,

    #[error("Expected {expected} feature values per row, found {found}")]
    ShapeMismatch { expected: usize, found: usize },

    #[error("Feature and target lengths differ ({rows} rows, {targets} targets)")]
    LengthMismatch { rows: usize, targets: usize },

    #[error("Input contains non-finite values")]
    NonFinite,

    #[error("Regression tree failed: {0}")]
    Tree(String),
}
