//! Model loading and registry components

pub mod loader;
pub mod registry;

pub use loader::{Classifier, ModelLoader, OnnxClassifier};
pub use registry::{ModelArtifact, ModelRegistry};
