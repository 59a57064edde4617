//! Health Risk ML - Rust библиотека

pub mod api;
pub mod artifacts;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod predictor;
pub mod preprocessing;
pub mod training;
pub mod types;

pub use types::*;
pub use models::*;
pub use preprocessing::*;

// Re-export для удобства
pub use artifacts::{ArtifactPaths, ArtifactStore};
pub use error::{ArtifactError, InputError, PredictionError, TrainingError};
pub use predictor::DualPredictor;
