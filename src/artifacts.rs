//! Сохранение и загрузка обученных артефактов (модели + scaler)

use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ArtifactError;
use crate::models::{KnnClassifier, RiskClassifier, TreeModel};
use crate::preprocessing::{FeatureAssembler, StandardScaler};

pub const FORMAT_VERSION: u32 = 1;

pub const DEFAULT_TREE_MODEL_FILE: &str = "rf_model.json";
pub const DEFAULT_KNN_MODEL_FILE: &str = "knn_model.json";
pub const DEFAULT_SCALER_FILE: &str = "scaler.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    TreeModel,
    KnnModel,
    Scaler,
}

impl ArtifactKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactKind::TreeModel => "tree_model",
            ArtifactKind::KnnModel => "knn_model",
            ArtifactKind::Scaler => "scaler",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Обертка, в которой артефакт лежит на диске
#[derive(Debug, Serialize, Deserialize)]
pub struct ArtifactEnvelope<T> {
    pub kind: ArtifactKind,
    pub format_version: u32,
    pub feature_names: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub payload: T,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub tree_model: PathBuf,
    pub knn_model: PathBuf,
    pub scaler: PathBuf,
}

impl ArtifactPaths {
    /// Имена файлов по умолчанию в одном каталоге
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            tree_model: dir.join(DEFAULT_TREE_MODEL_FILE),
            knn_model: dir.join(DEFAULT_KNN_MODEL_FILE),
            scaler: dir.join(DEFAULT_SCALER_FILE),
        }
    }

    pub fn path(&self, kind: ArtifactKind) -> &Path {
        match kind {
            ArtifactKind::TreeModel => &self.tree_model,
            ArtifactKind::KnnModel => &self.knn_model,
            ArtifactKind::Scaler => &self.scaler,
        }
    }
}

/// Содержимое артефакта, которое можно проверить после разбора JSON.
/// Артефакт, не прошедший проверку, считается поврежденным.
pub trait ArtifactPayload {
    fn validate(&self) -> Result<(), String>;
}

impl ArtifactPayload for TreeModel {
    fn validate(&self) -> Result<(), String> {
        TreeModel::validate(self)
    }
}

impl ArtifactPayload for KnnClassifier {
    fn validate(&self) -> Result<(), String> {
        KnnClassifier::validate(self)
    }
}

impl ArtifactPayload for StandardScaler {
    fn validate(&self) -> Result<(), String> {
        StandardScaler::validate(self)
    }
}

/// Запись через временный файл + rename, чтобы читатель не увидел половину файла
pub fn save_artifact<T: Serialize>(
    path: &Path,
    kind: ArtifactKind,
    payload: &T,
) -> Result<(), ArtifactError> {
    let envelope = ArtifactEnvelope {
        kind,
        format_version: FORMAT_VERSION,
        feature_names: FeatureAssembler::column_names(),
        created_at: Utc::now(),
        payload,
    };
    let data = serde_json::to_vec(&envelope)
        .map_err(|source| ArtifactError::Serialize { kind, source })?;

    let write_err = |source| ArtifactError::Write {
        kind,
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, data).map_err(write_err)?;
    fs::rename(&tmp, path).map_err(write_err)?;

    tracing::debug!(kind = %kind, path = %path.display(), "Artifact saved");
    Ok(())
}

pub fn load_artifact<T>(path: &Path, kind: ArtifactKind) -> Result<T, ArtifactError>
where
    T: DeserializeOwned + ArtifactPayload,
{
    let load_failure = |reason: String| ArtifactError::LoadFailure {
        kind,
        path: path.to_path_buf(),
        reason,
    };

    let data = fs::read(path).map_err(|err| match err.kind() {
        ErrorKind::NotFound => ArtifactError::Missing {
            kind,
            path: path.to_path_buf(),
        },
        _ => load_failure(err.to_string()),
    })?;

    let envelope: ArtifactEnvelope<T> =
        serde_json::from_slice(&data).map_err(|err| load_failure(err.to_string()))?;

    if envelope.kind != kind {
        return Err(load_failure(format!("file contains a {} artifact", envelope.kind)));
    }
    if envelope.format_version != FORMAT_VERSION {
        return Err(load_failure(format!(
            "unsupported format version {} (expected {})",
            envelope.format_version, FORMAT_VERSION
        )));
    }
    if !FeatureAssembler::matches_schema(&envelope.feature_names) {
        return Err(ArtifactError::SchemaMismatch {
            kind,
            path: path.to_path_buf(),
            expected: FeatureAssembler::column_names(),
            found: envelope.feature_names,
        });
    }
    envelope.payload.validate().map_err(load_failure)?;

    tracing::debug!(
        kind = %kind,
        path = %path.display(),
        created_at = %envelope.created_at,
        "Artifact loaded"
    );
    Ok(envelope.payload)
}

/// Неизменяемый набор артефактов на все время жизни процесса.
/// Существует только полностью загруженным: частичной загрузки нет.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    tree: TreeModel,
    knn: KnnClassifier,
    scaler: StandardScaler,
}

impl ArtifactStore {
    pub fn new(tree: TreeModel, knn: KnnClassifier, scaler: StandardScaler) -> Result<Self, ArtifactError> {
        let expected = FeatureAssembler::columns().len();

        for (name, check) in [
            ("tree model", tree.validate()),
            ("knn model", knn.validate()),
            ("scaler", scaler.validate()),
        ] {
            check.map_err(|reason| ArtifactError::Inconsistent(format!("{name}: {reason}")))?;
        }
        let checks = [
            ("tree model", tree.n_features()),
            ("knn model", knn.n_features()),
            ("scaler", scaler.n_features().unwrap_or(0)),
        ];
        for (name, n_features) in checks {
            if n_features != expected {
                return Err(ArtifactError::Inconsistent(format!(
                    "{name} expects {n_features} features, assembler produces {expected}"
                )));
            }
        }

        Ok(Self { tree, knn, scaler })
    }

    pub fn load(paths: &ArtifactPaths) -> Result<Self, ArtifactError> {
        let tree: TreeModel = load_artifact(&paths.tree_model, ArtifactKind::TreeModel)?;
        let knn: KnnClassifier = load_artifact(&paths.knn_model, ArtifactKind::KnnModel)?;
        let scaler: StandardScaler = load_artifact(&paths.scaler, ArtifactKind::Scaler)?;
        let store = Self::new(tree, knn, scaler)?;

        tracing::info!(
            tree_model = store.tree.name(),
            knn_k = store.knn.k(),
            "Model artifacts loaded"
        );
        Ok(store)
    }

    pub fn save(&self, paths: &ArtifactPaths) -> Result<(), ArtifactError> {
        save_artifact(&paths.tree_model, ArtifactKind::TreeModel, &self.tree)?;
        save_artifact(&paths.knn_model, ArtifactKind::KnnModel, &self.knn)?;
        save_artifact(&paths.scaler, ArtifactKind::Scaler, &self.scaler)?;
        Ok(())
    }

    pub fn tree(&self) -> &TreeModel {
        &self.tree
    }

    pub fn knn(&self) -> &KnnClassifier {
        &self.knn
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }
}
