/// Типы данных для модуля оценки риска

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::InputError;

pub const N_FEATURES: usize = 6;
pub const N_CLASSES: usize = 2;

/// Порядок колонок при обучении. Артефакты хранят этот список и сверяют его при загрузке.
pub const FEATURE_NAMES: [&str; N_FEATURES] =
    ["age", "bmi", "smoking", "alcohol", "sleep", "sugar_intake"];

/// Колонка с целевой переменной в обучающем CSV
pub const TARGET_COLUMN: &str = "health_risk";

// Диапазоны полей ввода (как у слайдеров исходной формы)
pub const AGE_RANGE: (i32, i32) = (0, 100);
pub const BMI_RANGE: (f64, f64) = (10.0, 60.0);
pub const SLEEP_RANGE: (f64, f64) = (0.0, 24.0);
pub const SUGAR_RANGE: (f64, f64) = (0.0, 200.0);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub age: i32,
    pub bmi: f64,
    pub smoking: u8, // 0 | 1
    pub alcohol: u8, // 0 | 1
    pub sleep: f64,  // часы
    pub sugar_intake: f64,
}

impl FeatureVector {
    /// Проверка диапазонов на границе ввода (HTTP / CLI).
    /// Сам сборщик признаков ничего не проверяет.
    pub fn validate(&self) -> Result<(), InputError> {
        if self.age < AGE_RANGE.0 || self.age > AGE_RANGE.1 {
            return Err(InputError::OutOfRange {
                field: "age",
                min: AGE_RANGE.0 as f64,
                max: AGE_RANGE.1 as f64,
                value: self.age as f64,
            });
        }
        check_range("bmi", self.bmi, BMI_RANGE)?;
        check_binary("smoking", self.smoking)?;
        check_binary("alcohol", self.alcohol)?;
        check_range("sleep", self.sleep, SLEEP_RANGE)?;
        check_range("sugar_intake", self.sugar_intake, SUGAR_RANGE)?;
        Ok(())
    }
}

fn check_range(field: &'static str, value: f64, (min, max): (f64, f64)) -> Result<(), InputError> {
    if !value.is_finite() {
        return Err(InputError::NotFinite { field });
    }
    if value < min || value > max {
        return Err(InputError::OutOfRange { field, min, max, value });
    }
    Ok(())
}

fn check_binary(field: &'static str, value: u8) -> Result<(), InputError> {
    if value > 1 {
        return Err(InputError::NotBinary { field, value });
    }
    Ok(())
}

/// Бинарный исход. В хранилище: 0 = HighRisk, 1 = LowRisk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLabel {
    HighRisk,
    LowRisk,
}

impl RiskLabel {
    pub const ALL: [RiskLabel; N_CLASSES] = [RiskLabel::HighRisk, RiskLabel::LowRisk];

    pub fn from_class_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn class_index(self) -> usize {
        match self {
            RiskLabel::HighRisk => 0,
            RiskLabel::LowRisk => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RiskLabel::HighRisk => "High Risk",
            RiskLabel::LowRisk => "Low Risk",
        }
    }

    /// Разбор значения колонки `health_risk`: `0`/`1`, `high`/`low`,
    /// `high risk`, `low_risk` и т.п. без учета регистра.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase().replace(['_', '-'], " ");
        match normalized.as_str() {
            "0" | "high" | "high risk" => Some(RiskLabel::HighRisk),
            "1" | "low" | "low risk" => Some(RiskLabel::LowRisk),
            _ => None,
        }
    }
}

impl fmt::Display for RiskLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassProbabilities {
    pub high_risk: f64,
    pub low_risk: f64,
}

impl ClassProbabilities {
    /// Распределение по индексам классов
    pub fn from_distribution(distribution: [f64; N_CLASSES]) -> Self {
        Self {
            high_risk: distribution[0],
            low_risk: distribution[1],
        }
    }

    pub fn get(&self, label: RiskLabel) -> f64 {
        match label {
            RiskLabel::HighRisk => self.high_risk,
            RiskLabel::LowRisk => self.low_risk,
        }
    }

    pub fn total(&self) -> f64 {
        self.high_risk + self.low_risk
    }
}

/// Результат одной ветки (деревья или KNN)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathPrediction {
    pub model: String,
    pub label: RiskLabel,
    pub probabilities: Option<ClassProbabilities>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DualPrediction {
    pub tree: PathPrediction,
    pub knn: PathPrediction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictRequest {
    pub age: i32,
    pub bmi: f64,
    pub smoking: u8,
    pub alcohol: u8,
    pub sleep: f64,
    pub sugar_intake: f64,
    #[serde(default = "default_include_probabilities")]
    pub include_probabilities: bool,
}

fn default_include_probabilities() -> bool { true }

impl PredictRequest {
    pub fn features(&self) -> FeatureVector {
        FeatureVector {
            age: self.age,
            bmi: self.bmi,
            smoking: self.smoking,
            alcohol: self.alcohol,
            sleep: self.sleep,
            sugar_intake: self.sugar_intake,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathOutput {
    pub model: String,
    pub label: RiskLabel,
    pub label_text: String,
    pub probabilities: Option<ClassProbabilities>,
}

impl From<PathPrediction> for PathOutput {
    fn from(prediction: PathPrediction) -> Self {
        Self {
            model: prediction.model,
            label: prediction.label,
            label_text: prediction.label.as_str().to_string(),
            probabilities: prediction.probabilities,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    pub tree: PathOutput,
    pub knn: PathOutput,
}

impl From<DualPrediction> for PredictResponse {
    fn from(prediction: DualPrediction) -> Self {
        Self {
            tree: prediction.tree.into(),
            knn: prediction.knn.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FeatureVector {
        FeatureVector {
            age: 30,
            bmi: 22.0,
            smoking: 0,
            alcohol: 0,
            sleep: 7.0,
            sugar_intake: 30.0,
        }
    }

    #[test]
    fn label_encoding_matches_storage() {
        assert_eq!(RiskLabel::from_class_index(0), Some(RiskLabel::HighRisk));
        assert_eq!(RiskLabel::from_class_index(1), Some(RiskLabel::LowRisk));
        assert_eq!(RiskLabel::from_class_index(2), None);
        assert_eq!(RiskLabel::LowRisk.class_index(), 1);
        assert_eq!(RiskLabel::HighRisk.to_string(), "High Risk");
    }

    #[test]
    fn parses_target_spellings() {
        assert_eq!(RiskLabel::parse(" High "), Some(RiskLabel::HighRisk));
        assert_eq!(RiskLabel::parse("low_risk"), Some(RiskLabel::LowRisk));
        assert_eq!(RiskLabel::parse("HIGH-RISK"), Some(RiskLabel::HighRisk));
        assert_eq!(RiskLabel::parse("1"), Some(RiskLabel::LowRisk));
        assert_eq!(RiskLabel::parse("medium"), None);
        assert_eq!(RiskLabel::parse(""), None);
    }

    #[test]
    fn accepts_range_boundaries() {
        let mut features = sample();
        assert!(features.validate().is_ok());
        features.age = 100;
        features.bmi = 60.0;
        features.sleep = 0.0;
        features.sugar_intake = 200.0;
        assert!(features.validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_fields() {
        let mut features = sample();
        features.bmi = 9.5;
        assert!(matches!(
            features.validate(),
            Err(InputError::OutOfRange { field: "bmi", .. })
        ));

        let mut features = sample();
        features.smoking = 2;
        assert!(matches!(
            features.validate(),
            Err(InputError::NotBinary { field: "smoking", value: 2 })
        ));

        let mut features = sample();
        features.sleep = f64::NAN;
        assert!(matches!(
            features.validate(),
            Err(InputError::NotFinite { field: "sleep" })
        ));

        let mut features = sample();
        features.age = -1;
        assert!(features.validate().is_err());
    }

    #[test]
    fn request_defaults_to_probabilities() {
        let request: PredictRequest = serde_json::from_str(
            r#"{"age":30,"bmi":22.0,"smoking":0,"alcohol":0,"sleep":7.0,"sugar_intake":30.0}"#,
        )
        .unwrap();
        assert!(request.include_probabilities);
        assert_eq!(request.features(), sample());
    }
}
