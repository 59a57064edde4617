//! Метрики качества на отложенной выборке

use serde::{Deserialize, Serialize};

use crate::types::{RiskLabel, N_CLASSES};

/// Доля совпавших меток
pub fn accuracy(truth: &[RiskLabel], predicted: &[RiskLabel]) -> f64 {
    if truth.is_empty() || truth.len() != predicted.len() {
        return 0.0;
    }
    let correct = truth
        .iter()
        .zip(predicted.iter())
        .filter(|(t, p)| t == p)
        .count();
    correct as f64 / truth.len() as f64
}

/// Матрица ошибок 2x2: строки — истинный класс, столбцы — предсказанный
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub counts: [[u32; N_CLASSES]; N_CLASSES],
}

impl ConfusionMatrix {
    pub fn from_predictions(truth: &[RiskLabel], predicted: &[RiskLabel]) -> Self {
        let mut matrix = Self::default();
        for (t, p) in truth.iter().zip(predicted.iter()) {
            matrix.add(*t, *p);
        }
        matrix
    }

    pub fn add(&mut self, truth: RiskLabel, predicted: RiskLabel) {
        let cell = &mut self.counts[truth.class_index()][predicted.class_index()];
        *cell = cell.saturating_add(1);
    }

    pub fn get(&self, truth: RiskLabel, predicted: RiskLabel) -> u32 {
        self.counts[truth.class_index()][predicted.class_index()]
    }

    pub fn total(&self) -> u32 {
        self.counts.iter().flatten().sum()
    }
}
