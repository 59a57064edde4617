//! Сборка вектора признаков в порядке колонок обучения

use ndarray::{Array1, Array2};

use crate::types::{FeatureVector, FEATURE_NAMES, N_FEATURES};

pub struct FeatureAssembler;

impl FeatureAssembler {
    /// Канонический порядок колонок: `[age, bmi, smoking, alcohol, sleep, sugar_intake]`
    pub fn columns() -> &'static [&'static str; N_FEATURES] {
        &FEATURE_NAMES
    }

    pub fn column_names() -> Vec<String> {
        FEATURE_NAMES.iter().map(|name| name.to_string()).collect()
    }

    /// Совпадает ли сохраненный список колонок с текущим порядком
    pub fn matches_schema(names: &[String]) -> bool {
        names.len() == N_FEATURES && names.iter().zip(FEATURE_NAMES.iter()).all(|(a, b)| a == b)
    }

    pub fn assemble(features: &FeatureVector) -> Array1<f64> {
        Array1::from_vec(Self::row(features).to_vec())
    }

    pub fn assemble_batch(rows: &[FeatureVector]) -> Array2<f64> {
        let mut batch = Array2::zeros((rows.len(), N_FEATURES));
        for (i, features) in rows.iter().enumerate() {
            for (j, value) in Self::row(features).into_iter().enumerate() {
                batch[[i, j]] = value;
            }
        }
        batch
    }

    fn row(features: &FeatureVector) -> [f64; N_FEATURES] {
        [
            features.age as f64,
            features.bmi,
            features.smoking as f64,
            features.alcohol as f64,
            features.sleep,
            features.sugar_intake,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn assembles_in_training_order() {
        let features = FeatureVector {
            age: 30,
            bmi: 22.5,
            smoking: 1,
            alcohol: 0,
            sleep: 7.0,
            sugar_intake: 30.0,
        };
        assert_eq!(
            FeatureAssembler::assemble(&features),
            array![30.0, 22.5, 1.0, 0.0, 7.0, 30.0]
        );

        let batch = FeatureAssembler::assemble_batch(&[features, features]);
        assert_eq!(batch.dim(), (2, N_FEATURES));
        assert_eq!(batch.row(1), FeatureAssembler::assemble(&features));
    }

    #[test]
    fn schema_check_is_order_sensitive() {
        assert!(FeatureAssembler::matches_schema(&FeatureAssembler::column_names()));

        let mut swapped = FeatureAssembler::column_names();
        swapped.swap(0, 1);
        assert!(!FeatureAssembler::matches_schema(&swapped));
        assert!(!FeatureAssembler::matches_schema(&swapped[..5]));
    }
}
