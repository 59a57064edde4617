//! k ближайших соседей (евклидово расстояние, равные веса голосов).
//! Ожидает уже стандартизированные признаки.

#![allow(non_snake_case)]

use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};

use crate::error::{PredictionError, TrainingError};
use crate::models::{argmax, check_dimensions, RiskClassifier};
use crate::types::{ClassProbabilities, RiskLabel, N_CLASSES};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnnClassifier {
    k: usize,
    records: Array2<f64>,
    labels: Vec<usize>,
}

impl KnnClassifier {
    pub fn fit(X: &Array2<f64>, y: &Array1<usize>, k: usize) -> Result<Self, TrainingError> {
        if X.nrows() == 0 || X.ncols() == 0 {
            return Err(TrainingError::EmptyDataset);
        }
        if y.len() != X.nrows() {
            return Err(TrainingError::InvalidConfig(format!(
                "{} rows but {} targets",
                X.nrows(),
                y.len()
            )));
        }
        if k == 0 {
            return Err(TrainingError::InvalidConfig("k must be positive".to_string()));
        }
        if X.nrows() < k {
            return Err(TrainingError::InsufficientData(format!(
                "{} training rows for k = {}",
                X.nrows(),
                k
            )));
        }
        if y.iter().any(|&label| label >= N_CLASSES) {
            return Err(TrainingError::InvalidConfig("unknown class index in targets".to_string()));
        }

        Ok(Self {
            k,
            records: X.clone(),
            labels: y.to_vec(),
        })
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Структурная проверка после десериализации
    pub fn validate(&self) -> Result<(), String> {
        let rows = self.records.nrows();
        if rows == 0 || self.records.ncols() == 0 {
            return Err("knn model holds no training points".to_string());
        }
        if self.k == 0 || self.k > rows {
            return Err(format!("k = {} is invalid for {} training points", self.k, rows));
        }
        if self.labels.len() != rows {
            return Err(format!("{} labels for {} training points", self.labels.len(), rows));
        }
        if let Some(label) = self.labels.iter().find(|&&label| label >= N_CLASSES) {
            return Err(format!("unknown class index {label}"));
        }
        if self.records.iter().any(|v| !v.is_finite()) {
            return Err("training points contain non-finite values".to_string());
        }
        Ok(())
    }

    /// Голоса `k` ближайших соседей. При равных расстояниях раньше идет сосед
    /// с меньшим индексом, так что результат детерминирован.
    fn votes(&self, features: &ArrayView1<f64>) -> Result<[usize; N_CLASSES], PredictionError> {
        check_dimensions(self.records.ncols(), features)?;

        let mut distances: Vec<(f64, usize)> = self
            .records
            .rows()
            .into_iter()
            .enumerate()
            .map(|(i, row)| {
                let dist: f64 = row
                    .iter()
                    .zip(features.iter())
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum();
                (dist, i)
            })
            .collect();
        distances.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        let mut votes = [0usize; N_CLASSES];
        for &(_, i) in distances.iter().take(self.k) {
            let slot = self
                .labels
                .get(i)
                .and_then(|&label| votes.get_mut(label))
                .ok_or(PredictionError::MalformedModel { model: self.name() })?;
            *slot += 1;
        }
        if votes.iter().sum::<usize>() == 0 {
            return Err(PredictionError::MalformedModel { model: self.name() });
        }
        Ok(votes)
    }
}

impl RiskClassifier for KnnClassifier {
    fn name(&self) -> &'static str {
        "knn"
    }

    fn n_features(&self) -> usize {
        self.records.ncols()
    }

    fn predict_label(&self, features: ArrayView1<f64>) -> Result<RiskLabel, PredictionError> {
        let votes = self.votes(&features)?;
        let index = argmax(&votes.map(|v| v as f64));
        RiskLabel::from_class_index(index).ok_or(PredictionError::UnknownClass {
            model: self.name(),
            index,
        })
    }

    fn supports_probabilities(&self) -> bool {
        true
    }

    fn predict_proba(&self, features: ArrayView1<f64>) -> Result<ClassProbabilities, PredictionError> {
        let votes = self.votes(&features)?;
        let total = votes.iter().sum::<usize>() as f64;
        Ok(ClassProbabilities::from_distribution(votes.map(|v| v as f64 / total)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn clusters() -> (Array2<f64>, Array1<usize>) {
        let X = array![
            [0.0, 0.0],
            [0.1, 0.2],
            [0.2, 0.1],
            [5.0, 5.0],
            [5.1, 4.9],
            [4.9, 5.2],
        ];
        let y = array![0, 0, 0, 1, 1, 1];
        (X, y)
    }

    #[test]
    fn votes_by_nearest_neighbours() {
        let (X, y) = clusters();
        let knn = KnnClassifier::fit(&X, &y, 3).unwrap();

        assert_eq!(knn.predict_label(array![0.1, 0.1].view()).unwrap(), RiskLabel::HighRisk);
        assert_eq!(knn.predict_label(array![5.0, 5.1].view()).unwrap(), RiskLabel::LowRisk);
    }

    #[test]
    fn probabilities_are_vote_fractions() {
        let (X, y) = clusters();
        let knn = KnnClassifier::fit(&X, &y, 5).unwrap();

        // 3 соседа из HighRisk, 2 из LowRisk
        let proba = knn.predict_proba(array![0.0, 0.0].view()).unwrap();
        assert!((proba.high_risk - 0.6).abs() < 1e-12);
        assert!((proba.low_risk - 0.4).abs() < 1e-12);
        assert!((proba.total() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn ties_resolve_deterministically() {
        let X = array![[1.0], [-1.0]];
        let y = array![1, 0];
        let knn = KnnClassifier::fit(&X, &y, 2).unwrap();

        // Равные голоса: побеждает меньший индекс класса
        let label = knn.predict_label(array![0.0].view()).unwrap();
        assert_eq!(label, RiskLabel::HighRisk);
        assert_eq!(label, knn.predict_label(array![0.0].view()).unwrap());
    }

    #[test]
    fn rejects_bad_configuration() {
        let (X, y) = clusters();
        assert!(KnnClassifier::fit(&X, &y, 0).is_err());
        assert!(matches!(
            KnnClassifier::fit(&X, &y, 7),
            Err(TrainingError::InsufficientData(_))
        ));

        let knn = KnnClassifier::fit(&X, &y, 3).unwrap();
        assert!(knn.predict_label(array![1.0, 2.0, 3.0].view()).is_err());
    }

    #[test]
    fn validate_rejects_corrupt_models() {
        let (X, y) = clusters();
        let knn = KnnClassifier::fit(&X, &y, 3).unwrap();
        assert!(knn.validate().is_ok());

        let mut bad_labels = knn.clone();
        bad_labels.labels = vec![7; 6];
        assert!(bad_labels.validate().unwrap_err().contains("class index 7"));
        assert!(matches!(
            bad_labels.predict_label(array![0.0, 0.0].view()),
            Err(PredictionError::MalformedModel { model: "knn" })
        ));

        let mut short_labels = knn.clone();
        short_labels.labels.truncate(2);
        assert!(short_labels.validate().is_err());

        let mut zero_k = knn.clone();
        zero_k.k = 0;
        assert!(zero_k.validate().is_err());
        assert!(zero_k.predict_proba(array![0.0, 0.0].view()).is_err());

        let mut large_k = knn;
        large_k.k = 10;
        assert!(large_k.validate().is_err());
    }
}
