/// HTTP API для предсказания риска

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};

use crate::artifacts::ArtifactStore;
use crate::error::{InputError, PredictionError};
use crate::models::RiskClassifier;
use crate::predictor::DualPredictor;
use crate::types::{PredictRequest, PredictResponse};

#[derive(Clone)]
pub struct AppState {
    predictor: Arc<DualPredictor>,
}

impl AppState {
    pub fn new(store: ArtifactStore) -> Self {
        Self {
            predictor: Arc::new(DualPredictor::new(Arc::new(store))),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/predict", post(predict))
        .with_state(state)
}

/// Ошибка одного запроса; на остальные запросы не влияет
#[derive(Debug)]
pub enum ApiError {
    Input(InputError),
    /// Тело запроса не разобрано: не JSON, нет поля или неверный тип
    Malformed(String),
    Prediction(PredictionError),
}

impl From<InputError> for ApiError {
    fn from(err: InputError) -> Self {
        ApiError::Input(err)
    }
}

impl From<PredictionError> for ApiError {
    fn from(err: PredictionError) -> Self {
        ApiError::Prediction(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Input(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            ApiError::Malformed(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Prediction(err) => {
                (StatusCode::INTERNAL_SERVER_ERROR, format!("Prediction error: {err}"))
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Health Risk ML API (Rust)",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "tree_model": state.predictor.store().tree().name(),
        "probability_support": state.predictor.probability_support(),
    }))
}

async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        let message = rejection.body_text();
        tracing::warn!(error = %message, "Rejected request body");
        ApiError::Malformed(message)
    })?;
    let features = request.features();
    tracing::info!(?features, "Predict request");

    if let Err(err) = features.validate() {
        tracing::warn!(error = %err, "Rejected input");
        return Err(err.into());
    }

    match state.predictor.predict(&features, request.include_probabilities) {
        Ok(prediction) => {
            tracing::info!(
                tree = %prediction.tree.label,
                knn = %prediction.knn.label,
                "Prediction complete"
            );
            Ok(Json(prediction.into()))
        }
        Err(err) => {
            tracing::error!(error = %err, "Prediction failed");
            Err(err.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ForestParams, KnnClassifier, TreeModel, TreeModelKind};
    use crate::preprocessing::StandardScaler;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use ndarray::{array, Array2};
    use tower::ServiceExt;

    fn state() -> AppState {
        let records: Array2<f64> = array![
            [25.0, 21.0, 0.0, 0.0, 8.0, 30.0],
            [32.0, 23.0, 0.0, 1.0, 7.5, 45.0],
            [41.0, 24.5, 0.0, 0.0, 7.0, 40.0],
            [29.0, 22.0, 0.0, 0.0, 8.5, 25.0],
            [58.0, 34.0, 1.0, 1.0, 5.0, 140.0],
            [63.0, 36.5, 1.0, 0.0, 4.5, 160.0],
            [49.0, 31.0, 1.0, 1.0, 5.5, 120.0],
            [55.0, 38.0, 1.0, 1.0, 4.0, 150.0],
        ];
        let targets = array![1, 1, 1, 1, 0, 0, 0, 0];
        let params = ForestParams { n_trees: 10, ..ForestParams::default() };
        let tree = TreeModel::fit(TreeModelKind::RandomForest, &records, &targets, &params).unwrap();
        let mut scaler = StandardScaler::new();
        let scaled = scaler.fit_transform(&records).unwrap();
        let knn = KnnClassifier::fit(&scaled, &targets, 3).unwrap();
        AppState::new(ArtifactStore::new(tree, knn, scaler).unwrap())
    }

    async fn post_json(body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method("POST")
            .uri("/api/predict")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = router(state()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn predict_returns_both_labels() {
        let (status, body) = post_json(serde_json::json!({
            "age": 30, "bmi": 22.0, "smoking": 0, "alcohol": 0, "sleep": 7.0, "sugar_intake": 30.0
        }))
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tree"]["model"], "random_forest");
        assert_eq!(body["tree"]["label"], "LowRisk");
        assert_eq!(body["tree"]["label_text"], "Low Risk");
        assert_eq!(body["knn"]["label"], "LowRisk");

        let high = body["knn"]["probabilities"]["high_risk"].as_f64().unwrap();
        let low = body["knn"]["probabilities"]["low_risk"].as_f64().unwrap();
        assert!((high + low - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn probabilities_are_optional() {
        let (status, body) = post_json(serde_json::json!({
            "age": 60, "bmi": 35.0, "smoking": 1, "alcohol": 1, "sleep": 5.0,
            "sugar_intake": 150.0, "include_probabilities": false
        }))
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(body["tree"]["probabilities"].is_null());
        assert!(body["knn"]["probabilities"].is_null());
        assert_eq!(body["knn"]["label"], "HighRisk");
    }

    #[tokio::test]
    async fn out_of_range_input_is_a_bad_request() {
        let (status, body) = post_json(serde_json::json!({
            "age": 30, "bmi": 22.0, "smoking": 3, "alcohol": 0, "sleep": 7.0, "sugar_intake": 30.0
        }))
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("smoking"));
    }

    #[tokio::test]
    async fn mistyped_fields_are_a_bad_request() {
        let (status, body) = post_json(serde_json::json!({
            "age": 30, "bmi": 22.0, "smoking": -1, "alcohol": 0, "sleep": 7.0, "sugar_intake": 30.0
        }))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("smoking"));

        let (status, body) = post_json(serde_json::json!({
            "age": 30.5, "bmi": 22.0, "smoking": 0, "alcohol": 0, "sleep": 7.0, "sugar_intake": 30.0
        }))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("age"));
    }

    #[tokio::test]
    async fn missing_fields_are_a_bad_request() {
        let (status, body) = post_json(serde_json::json!({ "age": 30, "bmi": 22.0 })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("smoking"));
    }

    #[tokio::test]
    async fn health_reports_loaded_models() {
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = router(state()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["tree_model"], "random_forest");
        assert_eq!(body["probability_support"], true);
    }
}
