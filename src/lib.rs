//! Diabetes Prediction Pipeline Library
//!
//! A small decision-support pipeline: CSV preprocessing, a trained
//! ONNX classifier behind a keyed model registry, and a stateless
//! inference service that maps patient measurements to an outcome label.

pub mod config;
pub mod dataset;
pub mod inference;
pub mod models;
pub mod transform;

pub use config::AppConfig;
pub use dataset::Dataset;
pub use inference::{InferenceService, PatientRecord};
pub use models::registry::ModelRegistry;
