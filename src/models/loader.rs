//! ONNX model loading behind the `Classifier` seam

use anyhow::{Context, Result};
use ort::memory::Allocator;
use ort::session::{builder::GraphOptimizationLevel, Session, SessionOutputs};
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType};
use std::path::Path;
use std::sync::RwLock;
use tracing::{debug, info};

/// A trained binary classifier.
///
/// The registry stores classifiers behind this trait so the inference
/// service can be exercised without model files on disk.
pub trait Classifier: Send + Sync {
    /// Predicted class index for a single feature row (`1` = positive class).
    fn predict_class(&self, features: &[f32]) -> Result<i64>;
}

/// A loaded ONNX classifier session
pub struct OnnxClassifier {
    /// Model name, used in logs and error messages
    name: String,
    /// ONNX Runtime session; `run` needs `&mut`, hence the lock
    session: RwLock<Session>,
    /// Input name resolved from the model graph
    input_name: String,
}

impl OnnxClassifier {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Classifier for OnnxClassifier {
    fn predict_class(&self, features: &[f32]) -> Result<i64> {
        use ort::value::Tensor;

        // Input tensor shape [1, num_features]
        let shape = vec![1_i64, features.len() as i64];
        let input_tensor = Tensor::from_array((shape, features.to_vec()))
            .context("Failed to create input tensor")?;

        let mut session = self
            .session
            .write()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;

        let outputs = session.run(ort::inputs![self.input_name.as_str() => input_tensor])?;

        extract_class(&outputs, &self.name)
    }
}

/// Extract the predicted class index from model outputs.
///
/// Handles the output shapes produced by sklearn-style ONNX exports:
/// a dedicated integer `label` tensor, a `[1, num_classes]` probability
/// tensor, or seq(map(int64, float)) class-probability maps.
fn extract_class(outputs: &SessionOutputs, model_name: &str) -> Result<i64> {
    // Preferred: the exporter's integer label output
    for (name, output) in outputs.iter() {
        if !name.contains("label") {
            continue;
        }
        if let Ok((_, data)) = output.try_extract_tensor::<i64>() {
            if let Some(&class) = data.first() {
                debug!(model = %model_name, class = class, "Extracted from label tensor");
                return Ok(class);
            }
        }
    }

    // Otherwise take the argmax over class probabilities
    for (name, output) in outputs.iter() {
        if name.contains("label") {
            continue;
        }

        let dtype = output.dtype();

        if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
            let dims: Vec<i64> = shape.iter().copied().collect();
            if let Some(class) = class_from_probabilities(&dims, data) {
                debug!(model = %model_name, output = %name, class = class, "Extracted from probability tensor");
                return Ok(class);
            }
        }

        if DynSequenceValueType::can_downcast(&dtype) {
            if let Ok(class) = class_from_sequence_map(&output) {
                debug!(model = %model_name, output = %name, class = class, "Extracted from seq(map)");
                return Ok(class);
            }
        }
    }

    anyhow::bail!("No class output found in model {}", model_name)
}

/// Argmax over a `[1, num_classes]` or `[num_classes]` probability tensor.
/// A single-value output is treated as the positive-class probability.
fn class_from_probabilities(dims: &[i64], data: &[f32]) -> Option<i64> {
    let num_classes = match dims {
        [_, n] => *n as usize,
        [n] => *n as usize,
        _ => return None,
    };

    match num_classes {
        0 => None,
        1 => Some(if data[0] >= 0.5 { 1 } else { 0 }),
        n => data[..n]
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(idx, _)| idx as i64),
    }
}

/// Class with the highest probability in a seq(map(int64, float)) output,
/// the shape used by CatBoost and LightGBM ONNX exports.
fn class_from_sequence_map(output: &ort::value::DynValue) -> Result<i64> {
    let allocator = Allocator::default();

    let sequence = output
        .downcast_ref::<DynSequenceValueType>()
        .map_err(|e| anyhow::anyhow!("Failed to downcast to sequence: {}", e))?;

    let maps = sequence.try_extract_sequence::<DynMapValueType>(&allocator)?;
    let map_value = maps.first().ok_or_else(|| anyhow::anyhow!("Empty sequence"))?;

    let kv_pairs = map_value.try_extract_key_values::<i64, f32>()?;

    kv_pairs
        .iter()
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(class, _)| *class)
        .ok_or_else(|| anyhow::anyhow!("No class probabilities in map output"))
}

/// Loader for ONNX classifier artifacts
pub struct ModelLoader {
    /// Number of threads for ONNX inference
    onnx_threads: usize,
}

impl ModelLoader {
    /// Create a new model loader with default settings (1 thread)
    pub fn new() -> Result<Self> {
        Self::with_threads(1)
    }

    /// Create a new model loader with specified number of threads
    pub fn with_threads(onnx_threads: usize) -> Result<Self> {
        ort::init().commit()?;
        info!(onnx_threads = onnx_threads, "ONNX Runtime initialized");
        Ok(Self { onnx_threads })
    }

    /// Load a single ONNX classifier from file
    pub fn load_model<P: AsRef<Path>>(&self, path: P, name: &str) -> Result<OnnxClassifier> {
        let path = path.as_ref();

        info!(model = %name, path = %path.display(), threads = self.onnx_threads, "Loading ONNX model");

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(self.onnx_threads)?
            .commit_from_file(path)
            .context(format!("Failed to load model from {:?}", path))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "float_input".to_string());

        info!(model = %name, input = %input_name, "Model loaded successfully");

        Ok(OnnxClassifier {
            name: name.to_string(),
            session: RwLock::new(session),
            input_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_from_probabilities_two_classes() {
        assert_eq!(class_from_probabilities(&[1, 2], &[0.3, 0.7]), Some(1));
        assert_eq!(class_from_probabilities(&[1, 2], &[0.9, 0.1]), Some(0));
        assert_eq!(class_from_probabilities(&[2], &[0.2, 0.8]), Some(1));
    }

    #[test]
    fn test_class_from_probabilities_single_value() {
        assert_eq!(class_from_probabilities(&[1, 1], &[0.72]), Some(1));
        assert_eq!(class_from_probabilities(&[1, 1], &[0.12]), Some(0));
    }

    #[test]
    fn test_class_from_probabilities_unsupported_shape() {
        assert_eq!(class_from_probabilities(&[1, 2, 2], &[0.1; 4]), None);
    }
}
