/// Модуль предобработки данных

pub mod dataset;
pub mod feature_engineering;
pub mod normalization;

pub use dataset::{CleaningStats, HealthDataset};
pub use feature_engineering::FeatureAssembler;
pub use normalization::StandardScaler;
