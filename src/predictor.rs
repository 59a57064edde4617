//! Двойное предсказание: ветка A (деревья, сырые признаки) и ветка B (scaler + KNN)

use std::sync::Arc;

use ndarray::ArrayView1;

use crate::artifacts::ArtifactStore;
use crate::error::PredictionError;
use crate::models::RiskClassifier;
use crate::preprocessing::FeatureAssembler;
use crate::types::{DualPrediction, FeatureVector, PathPrediction, FEATURE_NAMES};

#[derive(Debug, Clone)]
pub struct DualPredictor {
    store: Arc<ArtifactStore>,
}

impl DualPredictor {
    /// Предиктор существует только поверх загруженного хранилища
    pub fn new(store: Arc<ArtifactStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    pub fn predict(
        &self,
        features: &FeatureVector,
        include_probabilities: bool,
    ) -> Result<DualPrediction, PredictionError> {
        let raw = FeatureAssembler::assemble(features);
        if let Some(idx) = raw.iter().position(|v| !v.is_finite()) {
            return Err(PredictionError::NonFiniteFeature {
                name: FEATURE_NAMES[idx],
            });
        }

        // Ветка A: сырые признаки, без нормализации
        let tree = run_path(self.store.tree(), raw.view(), include_probabilities)?;

        // Ветка B: обязательная стандартизация перед KNN
        let scaled = self.store.scaler().transform_row(raw.view())?;
        let knn = run_path(self.store.knn(), scaled.view(), include_probabilities)?;

        Ok(DualPrediction { tree, knn })
    }

    /// Отдает ли древесная модель вероятности (KNN отдает всегда)
    pub fn probability_support(&self) -> bool {
        self.store.tree().supports_probabilities()
    }
}

fn run_path(
    model: &dyn RiskClassifier,
    input: ArrayView1<f64>,
    include_probabilities: bool,
) -> Result<PathPrediction, PredictionError> {
    let label = model.predict_label(input)?;

    let probabilities = if include_probabilities {
        match model.predict_proba(input) {
            Ok(probabilities) => Some(probabilities),
            Err(PredictionError::UnsupportedCapability { model }) => {
                tracing::debug!(model, "Probabilities not supported, skipping");
                None
            }
            Err(err) => return Err(err),
        }
    } else {
        None
    };

    Ok(PathPrediction {
        model: model.name().to_string(),
        label,
        probabilities,
    })
}
