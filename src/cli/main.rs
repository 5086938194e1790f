use clap::Parser;
use retail_demand_forecaster::{config::Config, ml::TrainingPipeline};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "demand-trainer")]
#[command(about = "Fit the demand model from a historical sales dataset", long_about = None)]
struct Cli {
    /// Path to the training dataset (overrides configuration)
    #[arg(short, long)]
    dataset: Option<PathBuf>,

    /// Output path for the model artifact (overrides configuration)
    #[arg(short, long)]
    artifact: Option<PathBuf>,

    /// Number of trees in the forest
    #[arg(long)]
    n_trees: Option<u16>,

    /// Random seed for the split and the forest
    #[arg(long)]
    seed: Option<u64>,

    /// Fraction of rows held out for evaluation
    #[arg(long)]
    holdout_fraction: Option<f64>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = Config::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        eprintln!("Using default configuration");
        Config::default()
    });

    if let Some(dataset) = cli.dataset {
        config.training.dataset_path = dataset;
    }
    if let Some(n_trees) = cli.n_trees {
        config.training.n_trees = n_trees;
    }
    if let Some(seed) = cli.seed {
        config.training.seed = seed;
    }
    if let Some(holdout_fraction) = cli.holdout_fraction {
        config.training.holdout_fraction = holdout_fraction;
    }
    let artifact_path = cli.artifact.unwrap_or(config.model.artifact_path);

    let pipeline = TrainingPipeline::new(config.training, artifact_path);
    let report = pipeline.run()?;

    println!("Training complete");
    println!(
        "  rows: {} loaded, {} skipped, {} duplicates",
        report.n_rows_loaded, report.n_rows_skipped, report.n_duplicates
    );
    println!(
        "  imputed: {} units_sold (mean {:.2}), {} flags",
        report.imputation.n_units_sold_imputed,
        report.imputation.units_sold_mean,
        report.imputation.n_flags_imputed
    );
    println!(
        "  split: {} train / {} holdout",
        report.n_train, report.n_holdout
    );
    println!("  train R^2: {:.4}", report.train_r2);
    match report.holdout_r2 {
        Some(r2) => println!("  holdout R^2: {:.4}", r2),
        None => println!("  holdout R^2: n/a (no holdout rows)"),
    }
    println!("  artifact: {}", report.artifact_path.display());

    Ok(())
}
