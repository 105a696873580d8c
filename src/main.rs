//! Diabetes Prediction Pipeline - Command-Line Entry Point
//!
//! `preprocess` runs the batch CSV path; `predict` stands in for the
//! external caller and runs a single prediction.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use diabetes_prediction_pipeline::{
    config::AppConfig,
    dataset::Dataset,
    inference::{InferenceService, PatientRecord},
    models::{loader::ModelLoader, registry::ModelRegistry},
    transform,
};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "diabetes-pipeline")]
#[command(about = "CSV preprocessing and classifier inference for diabetes risk assessment")]
struct Cli {
    /// Configuration file; built-in defaults apply when omitted
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pre-process a CSV dataset and write it back with a `_processed` suffix
    Preprocess {
        #[arg(value_name = "DATA_PATH")]
        data_path: PathBuf,
    },
    /// Run a single prediction from named measurements
    Predict {
        #[arg(long, default_value_t = 0.0)]
        pregnancies: f64,
        #[arg(long, default_value_t = 100.0)]
        glucose: f64,
        #[arg(long, default_value_t = 80.0)]
        blood_pressure: f64,
        #[arg(long, default_value_t = 20.0)]
        skin_thickness: f64,
        #[arg(long, default_value_t = 100.0)]
        insulin: f64,
        #[arg(long, default_value_t = 25.0)]
        bmi: f64,
        #[arg(long, default_value_t = 0.5)]
        diabetes_pedigree: f64,
        #[arg(long, default_value_t = 30.0)]
        age: f64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::default(),
    };

    init_logging(&config)?;

    match cli.command {
        Commands::Preprocess { data_path } => run_preprocess(&data_path),
        Commands::Predict {
            pregnancies,
            glucose,
            blood_pressure,
            skin_thickness,
            insulin,
            bmi,
            diabetes_pedigree,
            age,
        } => {
            let patient = PatientRecord {
                pregnancies,
                glucose,
                blood_pressure,
                skin_thickness,
                insulin,
                bmi,
                diabetes_pedigree,
                age,
            };
            run_predict(&config, &patient)
        }
    }
}

fn init_logging(config: &AppConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(
        format!("diabetes_prediction_pipeline={}", config.logging.level).parse()?,
    );

    if config.logging.format == "json" {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    Ok(())
}

fn run_preprocess(data_path: &Path) -> Result<()> {
    let mut dataset = Dataset::load(data_path)
        .with_context(|| format!("Failed to load dataset from {}", data_path.display()))?;

    transform::preprocess(&mut dataset);

    let written = dataset.save(data_path)?;
    info!(
        path = %written.display(),
        rows = dataset.n_rows(),
        columns = dataset.columns().len(),
        "Processed dataset written"
    );

    Ok(())
}

fn run_predict(config: &AppConfig, patient: &PatientRecord) -> Result<()> {
    let loader = ModelLoader::with_threads(config.models.onnx_threads)?;
    let registry = ModelRegistry::load_from_dir(
        &config.models.models_dir,
        std::slice::from_ref(&config.models.model_key),
        &loader,
    )?;

    let service = InferenceService::from_config(registry, config);
    let label = service.predict(patient)?;

    println!("{label}");
    Ok(())
}
