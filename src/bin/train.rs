//! Обучение моделей по CSV и сохранение артефактов

use anyhow::Context;
use clap::Parser;

use health_risk_ml::{config::TrainArgs, logging, training};

fn main() -> anyhow::Result<()> {
    logging::init_tracing();
    let args = TrainArgs::parse();
    let config = args.training_config();

    let report = training::run(&config)
        .with_context(|| format!("training on {} failed", config.dataset_path.display()))?;

    println!(
        "Rows: {} read, {} dropped, {} train / {} test",
        report.cleaning.rows_read,
        report.cleaning.rows_dropped(),
        report.train_rows,
        report.test_rows
    );
    println!("{} Accuracy: {:.3}", display_name(&report.tree.model), report.tree.accuracy);
    println!("{} Accuracy: {:.3}", display_name(&report.knn.model), report.knn.accuracy);

    if let Some(path) = &args.report {
        let data = serde_json::to_vec_pretty(&report).context("failed to serialize report")?;
        std::fs::write(path, data)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        tracing::info!("Report written to {}", path.display());
    }

    Ok(())
}

fn display_name(model: &str) -> &str {
    match model {
        "random_forest" => "Random Forest",
        "decision_tree" => "Decision Tree",
        "knn" => "KNN",
        other => other,
    }
}
