//! Стандартизация признаков (mean / std) для модели KNN

#![allow(non_snake_case)]

use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{PredictionError, TrainingError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Option<Array1<f64>>,
    std: Option<Array1<f64>>,
    is_fitted: bool,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self {
            mean: None,
            std: None,
            is_fitted: false,
        }
    }

    /// Параметры заданы явно (используется при сборке хранилища вручную)
    pub fn from_parameters(mean: Array1<f64>, std: Array1<f64>) -> Result<Self, TrainingError> {
        if mean.len() != std.len() {
            return Err(TrainingError::InvalidConfig(format!(
                "scaler mean has {} entries, std has {}",
                mean.len(),
                std.len()
            )));
        }
        if std.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(TrainingError::InvalidConfig(
                "scaler std must be positive".to_string(),
            ));
        }
        Ok(Self {
            mean: Some(mean),
            std: Some(std),
            is_fitted: true,
        })
    }

    pub fn fit(&mut self, X: &Array2<f64>) -> Result<(), TrainingError> {
        if X.nrows() == 0 {
            return Err(TrainingError::EmptyDataset);
        }

        // Среднее и стандартное отклонение (ddof = 0) по каждому признаку
        self.mean = Some(X.mean_axis(Axis(0)).ok_or(TrainingError::EmptyDataset)?);
        self.std = Some(X.std_axis(Axis(0), 0.0));

        // Избегаем деления на ноль
        if let Some(ref mut std) = self.std {
            for val in std.iter_mut() {
                if *val < 1e-10 {
                    *val = 1.0;
                }
            }
        }

        self.is_fitted = true;
        Ok(())
    }

    pub fn transform(&self, X: &Array2<f64>) -> Result<Array2<f64>, PredictionError> {
        let (mean, std) = self.parameters()?;
        if X.ncols() != mean.len() {
            return Err(PredictionError::DimensionMismatch {
                expected: mean.len(),
                found: X.ncols(),
            });
        }

        // Нормализация: (X - mean) / std
        let mut normalized = X.clone();
        for mut row in normalized.rows_mut() {
            for (i, val) in row.iter_mut().enumerate() {
                *val = (*val - mean[i]) / std[i];
            }
        }

        Ok(normalized)
    }

    /// Преобразование одного вектора признаков
    pub fn transform_row(&self, x: ArrayView1<f64>) -> Result<Array1<f64>, PredictionError> {
        let (mean, std) = self.parameters()?;
        if x.len() != mean.len() {
            return Err(PredictionError::DimensionMismatch {
                expected: mean.len(),
                found: x.len(),
            });
        }
        Ok((&x - mean) / std)
    }

    pub fn fit_transform(&mut self, X: &Array2<f64>) -> Result<Array2<f64>, TrainingError> {
        self.fit(X)?;
        Ok(self.transform(X)?)
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    pub fn n_features(&self) -> Option<usize> {
        self.mean.as_ref().map(|mean| mean.len())
    }

    pub fn mean(&self) -> Option<&Array1<f64>> {
        self.mean.as_ref()
    }

    pub fn std(&self) -> Option<&Array1<f64>> {
        self.std.as_ref()
    }

    /// Структурная проверка после десериализации
    pub fn validate(&self) -> Result<(), String> {
        let (Some(mean), Some(std)) = (&self.mean, &self.std) else {
            return Err("scaler is not fitted".to_string());
        };
        if !self.is_fitted {
            return Err("scaler is not fitted".to_string());
        }
        if mean.is_empty() || mean.len() != std.len() {
            return Err(format!(
                "scaler mean has {} entries, std has {}",
                mean.len(),
                std.len()
            ));
        }
        if mean.iter().any(|m| !m.is_finite()) {
            return Err("scaler mean contains non-finite values".to_string());
        }
        if std.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err("scaler std must be finite and positive".to_string());
        }
        Ok(())
    }

    fn parameters(&self) -> Result<(&Array1<f64>, &Array1<f64>), PredictionError> {
        if !self.is_fitted {
            return Err(PredictionError::ScalerNotFitted);
        }
        match (&self.mean, &self.std) {
            (Some(mean), Some(std)) if mean.len() == std.len() => Ok((mean, std)),
            (Some(_), Some(_)) => Err(PredictionError::MalformedModel { model: "scaler" }),
            _ => Err(PredictionError::ScalerNotFitted),
        }
    }
}

impl Default for StandardScaler {
    fn default() -> Self {
        Self::new()
    }
}
