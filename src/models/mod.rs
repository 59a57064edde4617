/// Модели классификации риска

pub mod forest;
pub mod knn;
pub mod metrics;
pub mod tree;

pub use forest::{ForestParams, RandomForest};
pub use knn::KnnClassifier;
pub use metrics::{accuracy, ConfusionMatrix};
pub use tree::{DecisionTreeModel, TreeModel, TreeModelKind};

use ndarray::{Array2, ArrayView1};

use crate::error::PredictionError;
use crate::types::{ClassProbabilities, RiskLabel};

/// Общий интерфейс обеих ветвей предсказания
pub trait RiskClassifier {
    fn name(&self) -> &'static str;

    fn n_features(&self) -> usize;

    fn predict_label(&self, features: ArrayView1<f64>) -> Result<RiskLabel, PredictionError>;

    fn supports_probabilities(&self) -> bool {
        false
    }

    /// Вероятности классов. По умолчанию модель их не поддерживает.
    fn predict_proba(
        &self,
        _features: ArrayView1<f64>,
    ) -> Result<ClassProbabilities, PredictionError> {
        Err(PredictionError::UnsupportedCapability { model: self.name() })
    }

    fn predict_batch(&self, records: &Array2<f64>) -> Result<Vec<RiskLabel>, PredictionError> {
        records
            .rows()
            .into_iter()
            .map(|row| self.predict_label(row))
            .collect()
    }
}

/// Проверка размерности входа перед предсказанием
pub(crate) fn check_dimensions(expected: usize, features: &ArrayView1<f64>) -> Result<(), PredictionError> {
    if features.len() != expected {
        return Err(PredictionError::DimensionMismatch {
            expected,
            found: features.len(),
        });
    }
    Ok(())
}

/// Индекс класса с максимальным значением; при равенстве побеждает меньший индекс
pub(crate) fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &value) in values.iter().enumerate().skip(1) {
        if value > values[best] {
            best = i;
        }
    }
    best
}
