//! Keyed lookup of trained classifiers and their feature schemas

use crate::models::loader::{Classifier, ModelLoader};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

/// Errors that can occur during registry operations
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("model not found: {0}")]
    ModelNotFound(String),
    #[error("no model artifacts loaded from {0}")]
    NoArtifacts(String),
}

/// A trained classifier plus the feature schema it expects.
///
/// Immutable once loaded; the schema is the ordered column list the
/// model must be fed at prediction time.
pub struct ModelArtifact {
    pub key: String,
    pub classifier: Box<dyn Classifier>,
    pub features: Vec<String>,
}

impl std::fmt::Debug for ModelArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelArtifact")
            .field("key", &self.key)
            .field("features", &self.features)
            .finish_non_exhaustive()
    }
}

impl ModelArtifact {
    pub fn new(key: impl Into<String>, classifier: Box<dyn Classifier>, features: Vec<String>) -> Self {
        Self {
            key: key.into(),
            classifier,
            features,
        }
    }
}

/// Registry of model artifacts, keyed by name.
///
/// Loaded once at startup and injected into the inference service;
/// read-only afterwards.
#[derive(Debug, Default)]
pub struct ModelRegistry {
    models: HashMap<String, ModelArtifact>,
}

impl ModelRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an artifact directly (tests and embedders)
    pub fn register(&mut self, artifact: ModelArtifact) {
        self.models.insert(artifact.key.clone(), artifact);
    }

    /// Look up an artifact by key
    pub fn retrieve(&self, key: &str) -> Result<&ModelArtifact, RegistryError> {
        self.models
            .get(key)
            .ok_or_else(|| RegistryError::ModelNotFound(key.to_string()))
    }

    /// Registered model keys
    pub fn keys(&self) -> Vec<&str> {
        self.models.keys().map(|k| k.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Load the named artifacts from a directory.
    ///
    /// Each key maps to `<key>.onnx` plus a `<key>.features.json` sidecar
    /// holding the ordered feature schema. A key whose files are missing
    /// or unreadable is logged and skipped; an empty registry after the
    /// pass is an error.
    pub fn load_from_dir<P: AsRef<Path>>(
        models_dir: P,
        keys: &[String],
        loader: &ModelLoader,
    ) -> Result<Self, RegistryError> {
        let models_dir = models_dir.as_ref();
        let mut registry = Self::new();

        for key in keys {
            let model_path = models_dir.join(format!("{key}.onnx"));
            let schema_path = models_dir.join(format!("{key}.features.json"));

            if !model_path.exists() {
                warn!(model = %key, path = %model_path.display(), "Model file not found");
                continue;
            }

            let features = match read_feature_schema(&schema_path) {
                Ok(features) => features,
                Err(e) => {
                    warn!(model = %key, path = %schema_path.display(), error = %e, "Failed to read feature schema, skipping");
                    continue;
                }
            };

            match loader.load_model(&model_path, key) {
                Ok(classifier) => {
                    registry.register(ModelArtifact::new(key.clone(), Box::new(classifier), features));
                }
                Err(e) => {
                    warn!(model = %key, error = %e, "Failed to load model, skipping");
                }
            }
        }

        if registry.is_empty() {
            return Err(RegistryError::NoArtifacts(
                models_dir.display().to_string(),
            ));
        }

        info!(
            count = registry.len(),
            models = ?registry.keys(),
            "Model registry loaded"
        );

        Ok(registry)
    }
}

fn read_feature_schema(path: &Path) -> anyhow::Result<Vec<String>> {
    let raw = fs::read_to_string(path)?;
    let features: Vec<String> = serde_json::from_str(&raw)?;
    Ok(features)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    struct FixedClassifier(i64);

    impl Classifier for FixedClassifier {
        fn predict_class(&self, _features: &[f32]) -> Result<i64> {
            Ok(self.0)
        }
    }

    #[test]
    fn test_retrieve_registered_model() {
        let mut registry = ModelRegistry::new();
        registry.register(ModelArtifact::new(
            "random_forest_diabetes",
            Box::new(FixedClassifier(1)),
            vec!["Pregnancies".to_string(), "log_Glucose".to_string()],
        ));

        let artifact = registry.retrieve("random_forest_diabetes").unwrap();
        assert_eq!(artifact.features.len(), 2);
        assert_eq!(artifact.classifier.predict_class(&[0.0, 0.0]).unwrap(), 1);
    }

    #[test]
    fn test_retrieve_unknown_key_fails() {
        let registry = ModelRegistry::new();
        let err = registry.retrieve("no_such_model").unwrap_err();
        assert!(matches!(err, RegistryError::ModelNotFound(key) if key == "no_such_model"));
    }

    #[test]
    fn test_load_from_empty_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let loader = ModelLoader::new().unwrap();
        let err = ModelRegistry::load_from_dir(
            dir.path(),
            &["random_forest_diabetes".to_string()],
            &loader,
        )
        .unwrap_err();
        assert!(matches!(err, RegistryError::NoArtifacts(_)));
    }
}
