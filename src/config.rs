//! Configuration management for the prediction pipeline

use anyhow::{Context, Result};
use config::{Config, File};
use serde::Deserialize;
use std::path::Path;

/// Handling of schema columns that cannot be derived from the caller's inputs
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MissingFeaturePolicy {
    /// Fail the prediction with an error naming the missing columns
    #[default]
    Strict,
    /// Default missing columns to zero and emit one batched warning
    Lenient,
}

/// Label strings for the two outcome classes
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct OutcomeLabels {
    pub positive: String,
    pub negative: String,
}

impl OutcomeLabels {
    /// Map a classifier's integer class output to its label.
    ///
    /// Class `1` is the positive class; everything else is negative.
    pub fn for_class(&self, class: i64) -> &str {
        if class == 1 {
            &self.positive
        } else {
            &self.negative
        }
    }
}

impl Default for OutcomeLabels {
    fn default() -> Self {
        Self {
            positive: "Positive".to_string(),
            negative: "Negative".to_string(),
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub models: ModelsConfig,
    #[serde(default)]
    pub prediction: PredictionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Model artifact configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ModelsConfig {
    /// Directory containing ONNX model files and their feature-schema sidecars
    #[serde(default = "default_models_dir")]
    pub models_dir: String,
    /// Registry key of the model used for predictions
    #[serde(default = "default_model_key")]
    pub model_key: String,
    /// Number of threads for ONNX inference (default: 1)
    #[serde(default = "default_onnx_threads")]
    pub onnx_threads: usize,
}

fn default_models_dir() -> String {
    "models".to_string()
}

fn default_model_key() -> String {
    "random_forest_diabetes".to_string()
}

fn default_onnx_threads() -> usize {
    1
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            models_dir: default_models_dir(),
            model_key: default_model_key(),
            onnx_threads: default_onnx_threads(),
        }
    }
}

/// Prediction behavior configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct PredictionConfig {
    /// How to treat schema columns absent from the assembled row
    #[serde(default)]
    pub missing_features: MissingFeaturePolicy,
    /// Outcome label strings
    #[serde(default)]
    pub labels: OutcomeLabels,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (json, pretty)
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default file location
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/config.toml")
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.models.models_dir, "models");
        assert_eq!(config.models.model_key, "random_forest_diabetes");
        assert_eq!(config.models.onnx_threads, 1);
        assert_eq!(
            config.prediction.missing_features,
            MissingFeaturePolicy::Strict
        );
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_default_labels() {
        let labels = OutcomeLabels::default();
        assert_eq!(labels.for_class(1), "Positive");
        assert_eq!(labels.for_class(0), "Negative");
        assert_eq!(labels.for_class(-1), "Negative");
    }
}
