//! Конфигурация бинарников: аргументы командной строки с fallback на переменные окружения

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser};

use crate::artifacts::{
    ArtifactPaths, DEFAULT_KNN_MODEL_FILE, DEFAULT_SCALER_FILE, DEFAULT_TREE_MODEL_FILE,
};
use crate::models::TreeModelKind;
use crate::training::TrainingConfig;
use crate::types::FeatureVector;

/// Расположение трех артефактов
#[derive(Debug, Clone, Args)]
pub struct ArtifactArgs {
    /// Каталог с артефактами
    #[arg(long, env = "HEALTH_RISK_MODEL_DIR", default_value = "models")]
    pub model_dir: PathBuf,

    #[arg(long, env = "HEALTH_RISK_TREE_MODEL_FILE", default_value = DEFAULT_TREE_MODEL_FILE)]
    pub tree_model_file: String,

    #[arg(long, env = "HEALTH_RISK_KNN_MODEL_FILE", default_value = DEFAULT_KNN_MODEL_FILE)]
    pub knn_model_file: String,

    #[arg(long, env = "HEALTH_RISK_SCALER_FILE", default_value = DEFAULT_SCALER_FILE)]
    pub scaler_file: String,
}

impl ArtifactArgs {
    pub fn paths(&self) -> ArtifactPaths {
        ArtifactPaths {
            tree_model: self.model_dir.join(&self.tree_model_file),
            knn_model: self.model_dir.join(&self.knn_model_file),
            scaler: self.model_dir.join(&self.scaler_file),
        }
    }
}

/// API сервер
#[derive(Debug, Clone, Parser)]
#[command(name = "health-risk-ml", version, about = "Health risk prediction API")]
pub struct ServeArgs {
    #[arg(long, env = "HEALTH_RISK_BIND", default_value = "0.0.0.0:8000")]
    pub bind: SocketAddr,

    #[command(flatten)]
    pub artifacts: ArtifactArgs,
}

/// Обучение моделей
#[derive(Debug, Clone, Parser)]
#[command(name = "health-risk-train", version, about = "Train the health risk models from a CSV dataset")]
pub struct TrainArgs {
    /// CSV с колонками age, bmi, smoking, alcohol, sleep, sugar_intake, health_risk
    #[arg(long, env = "HEALTH_RISK_DATASET")]
    pub dataset: PathBuf,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Доля отложенной выборки
    #[arg(long, default_value_t = 0.3)]
    pub test_size: f64,

    #[arg(long, value_enum, default_value = "random-forest")]
    pub tree_model: TreeModelKind,

    #[arg(long, default_value_t = 100)]
    pub n_trees: usize,

    #[arg(long)]
    pub max_depth: Option<usize>,

    #[arg(long, default_value_t = 5)]
    pub n_neighbors: usize,

    /// Куда записать отчет об обучении (JSON)
    #[arg(long)]
    pub report: Option<PathBuf>,

    #[command(flatten)]
    pub artifacts: ArtifactArgs,
}

impl TrainArgs {
    pub fn training_config(&self) -> TrainingConfig {
        let mut config = TrainingConfig::new(&self.dataset, self.artifacts.paths());
        config.seed = self.seed;
        config.test_size = self.test_size;
        config.tree_model = self.tree_model;
        config.n_trees = self.n_trees;
        config.max_depth = self.max_depth;
        config.n_neighbors = self.n_neighbors;
        config
    }
}

/// Разовое предсказание из командной строки
#[derive(Debug, Clone, Parser)]
#[command(name = "health-risk-predict", version, about = "Predict health risk for one person")]
pub struct PredictArgs {
    #[arg(long, default_value_t = 30)]
    pub age: i32,

    #[arg(long, default_value_t = 22.0)]
    pub bmi: f64,

    #[arg(long, default_value_t = 0)]
    pub smoking: u8,

    #[arg(long, default_value_t = 0)]
    pub alcohol: u8,

    /// Сон, часов в сутки
    #[arg(long, default_value_t = 7.0)]
    pub sleep: f64,

    #[arg(long, default_value_t = 30.0)]
    pub sugar_intake: f64,

    /// Не выводить вероятности классов
    #[arg(long)]
    pub no_probabilities: bool,

    #[command(flatten)]
    pub artifacts: ArtifactArgs,
}

impl PredictArgs {
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn train_args_map_to_config() {
        let args = TrainArgs::try_parse_from([
            "health-risk-train",
            "--dataset",
            "data.csv",
            "--tree-model",
            "decision-tree",
            "--model-dir",
            "out",
            "--seed",
            "7",
        ])
        .unwrap();
        let config = args.training_config();

        assert_eq!(config.dataset_path, Path::new("data.csv"));
        assert_eq!(config.seed, 7);
        assert_eq!(config.test_size, 0.3);
        assert_eq!(config.n_trees, 100);
        assert_eq!(config.n_neighbors, 5);
        assert_eq!(config.tree_model, TreeModelKind::DecisionTree);
        assert_eq!(config.output, ArtifactPaths::in_dir("out"));
    }

    #[test]
    fn predict_defaults_match_reference_input() {
        let args = PredictArgs::try_parse_from(["health-risk-predict"]).unwrap();
        let features = args.features();
        assert_eq!(features.age, 30);
        assert_eq!(features.bmi, 22.0);
        assert_eq!(features.sleep, 7.0);
        assert_eq!(features.sugar_intake, 30.0);
        assert!(!args.no_probabilities);
    }

    #[test]
    fn artifact_files_can_be_renamed() {
        let args = ServeArgs::try_parse_from([
            "health-risk-ml",
            "--model-dir",
            "/srv/models",
            "--scaler-file",
            "scaler-v2.json",
        ])
        .unwrap();
        let paths = args.artifacts.paths();
        assert_eq!(paths.scaler, Path::new("/srv/models/scaler-v2.json"));
        assert_eq!(paths.tree_model, Path::new("/srv/models/rf_model.json"));
    }
}
