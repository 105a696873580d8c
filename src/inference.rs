//! Model inference over named patient measurements

use crate::config::{AppConfig, MissingFeaturePolicy, OutcomeLabels};
use crate::models::registry::{ModelRegistry, RegistryError};
use crate::transform::{log1p, LOG_COLUMNS};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors raised by the prediction path
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("model {model} requires features missing from the inputs: {columns:?}")]
    MissingFeatures { model: String, columns: Vec<String> },
    #[error("classifier failed")]
    Classifier(#[source] anyhow::Error),
}

/// Named measurements for a single prediction subject.
///
/// Field aliases match the training data's column names so records can be
/// deserialized straight from dataset-shaped JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    #[serde(alias = "Pregnancies")]
    pub pregnancies: f64,
    #[serde(alias = "Glucose")]
    pub glucose: f64,
    #[serde(alias = "BloodPressure")]
    pub blood_pressure: f64,
    #[serde(alias = "SkinThickness")]
    pub skin_thickness: f64,
    #[serde(alias = "Insulin")]
    pub insulin: f64,
    #[serde(alias = "BMI")]
    pub bmi: f64,
    #[serde(alias = "DiabetesPedigreeFunction")]
    pub diabetes_pedigree: f64,
    #[serde(alias = "Age")]
    pub age: f64,
}

impl PatientRecord {
    /// One row keyed by the training column names
    fn named_values(&self) -> HashMap<String, f64> {
        HashMap::from([
            ("Pregnancies".to_string(), self.pregnancies),
            ("Glucose".to_string(), self.glucose),
            ("BloodPressure".to_string(), self.blood_pressure),
            ("SkinThickness".to_string(), self.skin_thickness),
            ("Insulin".to_string(), self.insulin),
            ("BMI".to_string(), self.bmi),
            ("DiabetesPedigreeFunction".to_string(), self.diabetes_pedigree),
            ("Age".to_string(), self.age),
        ])
    }
}

impl Default for PatientRecord {
    /// Typical healthy-range starting values for an assessment form
    fn default() -> Self {
        Self {
            pregnancies: 0.0,
            glucose: 100.0,
            blood_pressure: 80.0,
            skin_thickness: 20.0,
            insulin: 100.0,
            bmi: 25.0,
            diabetes_pedigree: 0.5,
            age: 30.0,
        }
    }
}

/// Stateless prediction service over an injected model registry.
///
/// Each call builds a single-row record, applies the same log transform
/// as the batch path, reconciles the row against the model's feature
/// schema, and maps the class output to a label.
pub struct InferenceService {
    registry: ModelRegistry,
    model_key: String,
    policy: MissingFeaturePolicy,
    labels: OutcomeLabels,
}

impl InferenceService {
    pub fn new(
        registry: ModelRegistry,
        model_key: impl Into<String>,
        policy: MissingFeaturePolicy,
        labels: OutcomeLabels,
    ) -> Self {
        Self {
            registry,
            model_key: model_key.into(),
            policy,
            labels,
        }
    }

    /// Build a service from configuration and a loaded registry
    pub fn from_config(registry: ModelRegistry, config: &AppConfig) -> Self {
        Self::new(
            registry,
            config.models.model_key.clone(),
            config.prediction.missing_features,
            config.prediction.labels.clone(),
        )
    }

    /// Predict the outcome label for one patient record.
    pub fn predict(&self, patient: &PatientRecord) -> Result<String, InferenceError> {
        let mut row = patient.named_values();

        // Same log step as the batch preprocessing path
        for col in LOG_COLUMNS {
            if let Some(&value) = row.get(col) {
                row.insert(format!("log_{col}"), log1p(value));
            }
        }

        let artifact = self.registry.retrieve(&self.model_key)?;

        // Reconcile the row against the model's declared schema
        let missing: Vec<String> = artifact
            .features
            .iter()
            .filter(|name| !row.contains_key(name.as_str()))
            .cloned()
            .collect();

        if !missing.is_empty() {
            match self.policy {
                MissingFeaturePolicy::Strict => {
                    return Err(InferenceError::MissingFeatures {
                        model: artifact.key.clone(),
                        columns: missing,
                    });
                }
                MissingFeaturePolicy::Lenient => {
                    warn!(model = %artifact.key, columns = ?missing, "Added missing columns with default value 0");
                    for name in &missing {
                        row.insert(name.clone(), 0.0);
                    }
                }
            }
        }

        // Restrict and order the row to exactly the schema's columns
        let features: Vec<f32> = artifact
            .features
            .iter()
            .map(|name| row.get(name).copied().unwrap_or(0.0) as f32)
            .collect();

        let class = artifact
            .classifier
            .predict_class(&features)
            .map_err(InferenceError::Classifier)?;

        debug!(model = %artifact.key, class = class, "Prediction complete");

        Ok(self.labels.for_class(class).to_string())
    }
}
