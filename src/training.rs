//! Обучение обеих моделей и scaler по CSV, оценка на отложенной выборке, сохранение артефактов

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::artifacts::{ArtifactPaths, ArtifactStore};
use crate::error::TrainingError;
use crate::models::{
    accuracy, ConfusionMatrix, ForestParams, KnnClassifier, RiskClassifier, TreeModel, TreeModelKind,
};
use crate::preprocessing::{CleaningStats, HealthDataset, StandardScaler};
use crate::types::RiskLabel;

#[derive(Debug, Clone)]
pub struct TrainingConfig {
    pub dataset_path: PathBuf,
    pub output: ArtifactPaths,
    pub seed: u64,
    pub test_size: f64,
    pub tree_model: TreeModelKind,
    pub n_trees: usize,
    pub max_depth: Option<usize>,
    pub n_neighbors: usize,
}

impl TrainingConfig {
    pub fn new(dataset_path: impl Into<PathBuf>, output: ArtifactPaths) -> Self {
        Self {
            dataset_path: dataset_path.into(),
            output,
            seed: 42,
            test_size: 0.3,
            tree_model: TreeModelKind::RandomForest,
            n_trees: 100,
            max_depth: None,
            n_neighbors: 5,
        }
    }

    fn forest_params(&self) -> ForestParams {
        ForestParams {
            n_trees: self.n_trees,
            max_depth: self.max_depth,
            seed: self.seed,
            ..ForestParams::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEvaluation {
    pub model: String,
    pub accuracy: f64,
    pub confusion: ConfusionMatrix,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub cleaning: CleaningStats,
    pub train_rows: usize,
    pub test_rows: usize,
    pub seed: u64,
    pub tree: ModelEvaluation,
    pub knn: ModelEvaluation,
    pub scaler_mean: Vec<f64>,
    pub scaler_std: Vec<f64>,
}

/// Обученные модели до сохранения на диск
#[derive(Debug, Clone)]
pub struct TrainedModels {
    pub tree: TreeModel,
    pub knn: KnnClassifier,
    pub scaler: StandardScaler,
}

impl TrainedModels {
    pub fn into_store(self) -> Result<ArtifactStore, TrainingError> {
        Ok(ArtifactStore::new(self.tree, self.knn, self.scaler)?)
    }
}

/// Полный цикл: чтение, очистка, разбиение, обучение, оценка, сохранение
pub fn run(config: &TrainingConfig) -> Result<TrainingReport, TrainingError> {
    let (dataset, cleaning) = HealthDataset::from_csv_path(&config.dataset_path)?;
    tracing::info!(
        rows_read = cleaning.rows_read,
        rows_kept = cleaning.rows_kept,
        dropped_features = cleaning.dropped_features,
        dropped_target = cleaning.dropped_target,
        "Dataset loaded from {}",
        config.dataset_path.display()
    );

    let (trained, report) = train_and_evaluate(&dataset, cleaning, config)?;

    let store = trained.into_store()?;
    store.save(&config.output)?;

    // Сохраненные артефакты должны загружаться так же, как при старте сервера
    ArtifactStore::load(&config.output)?;
    tracing::info!(
        tree_model = %config.output.tree_model.display(),
        knn_model = %config.output.knn_model.display(),
        scaler = %config.output.scaler.display(),
        "Artifacts saved"
    );

    Ok(report)
}

/// Обучение и оценка без ввода-вывода
pub fn train_and_evaluate(
    dataset: &HealthDataset,
    cleaning: CleaningStats,
    config: &TrainingConfig,
) -> Result<(TrainedModels, TrainingReport), TrainingError> {
    // Перемешивание, затем стратифицированное разбиение с тем же seed
    let shuffled = dataset.shuffled(config.seed);
    let (train, test) = shuffled.stratified_split(config.test_size, config.seed)?;
    tracing::info!(
        train_rows = train.len(),
        test_rows = test.len(),
        "Train/test split ready"
    );

    let trained = fit_models(&train, config)?;
    let truth: Vec<RiskLabel> = test
        .targets
        .iter()
        .filter_map(|&idx| RiskLabel::from_class_index(idx))
        .collect();

    // Деревья: исходные признаки
    let tree_pred = trained.tree.predict_batch(&test.records)?;
    let tree = evaluation(trained.tree.name(), &truth, &tree_pred);
    tracing::info!(model = %tree.model, accuracy = tree.accuracy, "Tree model evaluated");

    // KNN: признаки через scaler, обученный только на train
    let test_scaled = trained.scaler.transform(&test.records)?;
    let knn_pred = trained.knn.predict_batch(&test_scaled)?;
    let knn = evaluation(trained.knn.name(), &truth, &knn_pred);
    tracing::info!(model = %knn.model, accuracy = knn.accuracy, "KNN model evaluated");

    let report = TrainingReport {
        cleaning,
        train_rows: train.len(),
        test_rows: test.len(),
        seed: config.seed,
        tree,
        knn,
        scaler_mean: trained.scaler.mean().map(|m| m.to_vec()).unwrap_or_default(),
        scaler_std: trained.scaler.std().map(|s| s.to_vec()).unwrap_or_default(),
    };
    Ok((trained, report))
}

/// Фиксированные гиперпараметры: 100 деревьев, k = 5
pub fn fit_models(train: &HealthDataset, config: &TrainingConfig) -> Result<TrainedModels, TrainingError> {
    let tree = TreeModel::fit(
        config.tree_model,
        &train.records,
        &train.targets,
        &config.forest_params(),
    )?;

    let mut scaler = StandardScaler::new();
    let train_scaled = scaler.fit_transform(&train.records)?;
    let knn = KnnClassifier::fit(&train_scaled, &train.targets, config.n_neighbors)?;

    Ok(TrainedModels { tree, knn, scaler })
}

fn evaluation(model: &str, truth: &[RiskLabel], predicted: &[RiskLabel]) -> ModelEvaluation {
    ModelEvaluation {
        model: model.to_string(),
        accuracy: accuracy(truth, predicted),
        confusion: ConfusionMatrix::from_predictions(truth, predicted),
    }
}
