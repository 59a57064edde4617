//! Ошибки библиотеки

use std::path::PathBuf;

use thiserror::Error;

use crate::artifacts::ArtifactKind;

/// Ошибки загрузки и записи артефактов. Любая из них при старте фатальна.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("{kind} artifact not found at {}", path.display())]
    Missing { kind: ArtifactKind, path: PathBuf },

    #[error("failed to load {kind} artifact from {}: {reason}", path.display())]
    LoadFailure {
        kind: ArtifactKind,
        path: PathBuf,
        reason: String,
    },

    #[error(
        "{kind} artifact at {} was trained on columns {found:?}, expected {expected:?}",
        path.display()
    )]
    SchemaMismatch {
        kind: ArtifactKind,
        path: PathBuf,
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("artifacts are inconsistent: {0}")]
    Inconsistent(String),

    #[error("failed to serialize {kind} artifact: {source}")]
    Serialize {
        kind: ArtifactKind,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write {kind} artifact to {}: {source}", path.display())]
    Write {
        kind: ArtifactKind,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Ошибка одного запроса на предсказание. Состояние процесса не затрагивает.
#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("{model} does not support probability estimates")]
    UnsupportedCapability { model: &'static str },

    #[error("expected {expected} features, got {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("feature {name} is not a finite number")]
    NonFiniteFeature { name: &'static str },

    #[error("{model} produced unknown class index {index}")]
    UnknownClass { model: &'static str, index: usize },

    #[error("scaler is not fitted")]
    ScalerNotFitted,

    #[error("{model} has a malformed structure")]
    MalformedModel { model: &'static str },
}

/// Ошибки валидации ввода на границе HTTP / CLI
#[derive(Debug, Error, PartialEq)]
pub enum InputError {
    #[error("{field} must be within {min}..={max}, got {value}")]
    OutOfRange {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },

    #[error("{field} must be 0 or 1, got {value}")]
    NotBinary { field: &'static str, value: u8 },

    #[error("{field} must be a finite number")]
    NotFinite { field: &'static str },
}

#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("failed to read dataset {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("dataset is missing required column {0:?}")]
    MissingColumn(String),

    #[error("dataset has no usable rows")]
    EmptyDataset,

    #[error("not enough data: {0}")]
    InsufficientData(String),

    #[error("invalid training configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to fit {model}: {reason}")]
    Fit { model: &'static str, reason: String },

    #[error("evaluation failed: {0}")]
    Evaluation(#[from] PredictionError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

impl ArtifactError {
    pub fn kind(&self) -> Option<ArtifactKind> {
        match self {
            ArtifactError::Missing { kind, .. }
            | ArtifactError::LoadFailure { kind, .. }
            | ArtifactError::SchemaMismatch { kind, .. }
            | ArtifactError::Serialize { kind, .. }
            | ArtifactError::Write { kind, .. } => Some(*kind),
            ArtifactError::Inconsistent(_) => None,
        }
    }
}
