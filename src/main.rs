/// API сервер для моделей оценки риска

use anyhow::Context;
use axum::http::Method;
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};

use health_risk_ml::{
    api::{self, AppState},
    config::ServeArgs,
    logging, ArtifactStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_tracing();
    let args = ServeArgs::parse();

    // Артефакты загружаются один раз; без них сервер не стартует
    let paths = args.artifacts.paths();
    let store = match ArtifactStore::load(&paths) {
        Ok(store) => store,
        Err(err) => {
            tracing::error!(error = %err, "Failed to load model artifacts, refusing to serve");
            return Err(err).context("model artifacts are required; run health-risk-train first");
        }
    };

    // CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    let app = api::router(AppState::new(store)).layer(cors);

    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("failed to bind {}", args.bind))?;
    tracing::info!("Server listening on http://{}", args.bind);
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
