//! Древесная модель ветки A: случайный лес или одиночное дерево linfa.
//! Работает с исходными (не нормализованными) признаками.

#![allow(non_snake_case)]

use linfa::prelude::*;
use linfa_tree::{DecisionTree, SplitQuality};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{PredictionError, TrainingError};
use crate::models::forest::{ForestParams, RandomForest};
use crate::models::{check_dimensions, RiskClassifier};
use crate::types::{ClassProbabilities, RiskLabel};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum TreeModelKind {
    RandomForest,
    DecisionTree,
}

/// Одиночное дерево решений linfa. Вероятности классов не отдает.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTreeModel {
    n_features: usize,
    tree: DecisionTree<f64, usize>,
}

impl DecisionTreeModel {
    pub fn fit(X: &Array2<f64>, y: &Array1<usize>, max_depth: Option<usize>) -> Result<Self, TrainingError> {
        if X.nrows() == 0 {
            return Err(TrainingError::EmptyDataset);
        }

        let dataset = Dataset::new(X.clone(), y.clone());
        let tree = DecisionTree::<f64, usize>::params()
            .split_quality(SplitQuality::Gini)
            .max_depth(max_depth)
            .fit(&dataset)
            .map_err(|err| TrainingError::Fit {
                model: "decision_tree",
                reason: err.to_string(),
            })?;

        Ok(Self {
            n_features: X.ncols(),
            tree,
        })
    }

    /// Дерево не должно ссылаться на признаки за пределами входного вектора
    pub fn validate(&self) -> Result<(), String> {
        if self.n_features == 0 {
            return Err("decision tree has no features".to_string());
        }
        if let Some(feature) = self.tree.features().into_iter().find(|&f| f >= self.n_features) {
            return Err(format!(
                "decision tree splits on feature {feature}, model has {}",
                self.n_features
            ));
        }
        Ok(())
    }
}

impl RiskClassifier for DecisionTreeModel {
    fn name(&self) -> &'static str {
        "decision_tree"
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_label(&self, features: ArrayView1<f64>) -> Result<RiskLabel, PredictionError> {
        check_dimensions(self.n_features, &features)?;

        let sample = features.to_owned().insert_axis(Axis(0));
        let predicted: Array1<usize> = self.tree.predict(&sample);
        let index = predicted[0];
        RiskLabel::from_class_index(index).ok_or(PredictionError::UnknownClass {
            model: self.name(),
            index,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "snake_case")]
pub enum TreeModel {
    RandomForest(RandomForest),
    DecisionTree(DecisionTreeModel),
}

impl TreeModel {
    pub fn fit(
        kind: TreeModelKind,
        X: &Array2<f64>,
        y: &Array1<usize>,
        params: &ForestParams,
    ) -> Result<Self, TrainingError> {
        match kind {
            TreeModelKind::RandomForest => Ok(TreeModel::RandomForest(RandomForest::fit(X, y, params)?)),
            TreeModelKind::DecisionTree => Ok(TreeModel::DecisionTree(DecisionTreeModel::fit(
                X,
                y,
                params.max_depth,
            )?)),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        match self {
            TreeModel::RandomForest(forest) => forest.validate(),
            TreeModel::DecisionTree(tree) => tree.validate(),
        }
    }

    pub fn kind(&self) -> TreeModelKind {
        match self {
            TreeModel::RandomForest(_) => TreeModelKind::RandomForest,
            TreeModel::DecisionTree(_) => TreeModelKind::DecisionTree,
        }
    }

    fn inner(&self) -> &dyn RiskClassifier {
        match self {
            TreeModel::RandomForest(forest) => forest as &dyn RiskClassifier,
            TreeModel::DecisionTree(tree) => tree as &dyn RiskClassifier,
        }
    }
}

impl RiskClassifier for TreeModel {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    fn n_features(&self) -> usize {
        self.inner().n_features()
    }

    fn supports_probabilities(&self) -> bool {
        self.inner().supports_probabilities()
    }

    fn predict_label(&self, features: ArrayView1<f64>) -> Result<RiskLabel, PredictionError> {
        self.inner().predict_label(features)
    }

    fn predict_proba(&self, features: ArrayView1<f64>) -> Result<ClassProbabilities, PredictionError> {
        self.inner().predict_proba(features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn data() -> (Array2<f64>, Array1<usize>) {
        let X = array![
            [25.0, 21.0],
            [30.0, 22.0],
            [35.0, 23.0],
            [60.0, 34.0],
            [65.0, 36.0],
            [70.0, 38.0],
        ];
        let y = array![1, 1, 1, 0, 0, 0];
        (X, y)
    }

    #[test]
    fn decision_tree_predicts_without_probabilities() {
        let (X, y) = data();
        let model = TreeModel::fit(TreeModelKind::DecisionTree, &X, &y, &ForestParams::default()).unwrap();
        assert_eq!(model.kind(), TreeModelKind::DecisionTree);
        assert_eq!(model.name(), "decision_tree");

        let label = model.predict_label(array![28.0, 21.5].view()).unwrap();
        assert_eq!(label, RiskLabel::LowRisk);
        assert!(matches!(
            model.predict_proba(array![28.0, 21.5].view()),
            Err(PredictionError::UnsupportedCapability { model: "decision_tree" })
        ));
    }

    #[test]
    fn forest_variant_exposes_probabilities() {
        let (X, y) = data();
        let params = ForestParams {
            n_trees: 10,
            ..ForestParams::default()
        };
        let model = TreeModel::fit(TreeModelKind::RandomForest, &X, &y, &params).unwrap();
        assert_eq!(model.kind(), TreeModelKind::RandomForest);
        assert_eq!(model.n_features(), 2);

        let proba = model.predict_proba(array![68.0, 37.0].view()).unwrap();
        assert!(proba.high_risk > proba.low_risk);
    }

    #[test]
    fn serialized_model_keeps_its_algorithm() {
        let (X, y) = data();
        let model = TreeModel::fit(TreeModelKind::DecisionTree, &X, &y, &ForestParams::default()).unwrap();

        let json = serde_json::to_value(&model).unwrap();
        assert_eq!(json["algorithm"], "decision_tree");

        let restored: TreeModel = serde_json::from_value(json).unwrap();
        assert!(restored.validate().is_ok());
        let row = array![66.0, 35.0];
        assert_eq!(
            restored.predict_label(row.view()).unwrap(),
            model.predict_label(row.view()).unwrap()
        );
    }
}
