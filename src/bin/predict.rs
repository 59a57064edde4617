//! Разовое предсказание риска из командной строки

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use health_risk_ml::{
    config::PredictArgs, logging, ArtifactStore, DualPredictor, PathPrediction,
};

fn main() -> anyhow::Result<()> {
    logging::init_tracing();
    let args = PredictArgs::parse();

    let features = args.features();
    features.validate()?;

    let store = ArtifactStore::load(&args.artifacts.paths())
        .context("model artifacts are required; run health-risk-train first")?;
    let predictor = DualPredictor::new(Arc::new(store));

    let prediction = predictor.predict(&features, !args.no_probabilities)?;
    print_path("Tree model", &prediction.tree);
    print_path("KNN", &prediction.knn);
    Ok(())
}

fn print_path(title: &str, prediction: &PathPrediction) {
    println!("{title} ({}): {}", prediction.model, prediction.label);
    if let Some(probabilities) = prediction.probabilities {
        println!(
            "    High Risk {:.1}% / Low Risk {:.1}%",
            probabilities.high_risk * 100.0,
            probabilities.low_risk * 100.0
        );
    }
}
