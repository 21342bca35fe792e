use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Mutex;

use ort::session::Session;
use ort::value::Tensor;

use super::error::LabelerError;
use super::input::image_to_tensor;
use super::utils::{parse_labels, softmax};
use crate::models::Preprocessing;
use crate::runtime::{create_session_builder, RuntimeConfig};

/// A loaded image classifier: one score per label for one encoded image.
///
/// Implementations are shared across worker tasks, so they must be `Send + Sync`.
pub trait ImageModel: Send + Sync {
    /// Labels in the order of the score vector returned by `predict`
    fn labels(&self) -> &[String];

    /// Scores one encoded image (JPEG, PNG, ...). The result has one entry per label.
    fn predict(&self, image: &[u8]) -> Result<Vec<f32>, LabelerError>;
}

/// An ONNX classification graph with its label list, loaded once and reused for every call.
///
/// Calls into the session are serialized by a mutex; decoding and
/// preprocessing run outside the lock.
#[derive(Debug)]
pub struct OnnxImageModel {
    pub model_path: String,
    pub labels_path: String,
    labels: Vec<String>,
    input_name: String,
    session: Mutex<Session>,
    preprocessing: Preprocessing,
}

// Compile-time verification of thread-safety
const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn verify_thread_safety() {
        assert_send_sync::<OnnxImageModel>();
    }
};

impl OnnxImageModel {
    /// Loads the graph at `model_path` and the label file at `labels_path`.
    pub fn load(
        model_path: &Path,
        labels_path: &Path,
        runtime_config: &RuntimeConfig,
        preprocessing: Preprocessing,
    ) -> Result<Self, LabelerError> {
        let labels = parse_labels(&fs::read_to_string(labels_path)?);
        if labels.is_empty() {
            return Err(LabelerError::BuildError(format!(
                "Label file {:?} contains no labels",
                labels_path
            )));
        }
        log::info!("Loaded {} labels from {:?}", labels.len(), labels_path);

        let session = create_session_builder(runtime_config)?.commit_from_file(model_path)?;
        Self::validate_model(&session)?;
        let input_name = session.inputs[0].name.clone();
        log::info!("Model {:?} loaded, feeding input '{}'", model_path, input_name);

        Ok(Self {
            model_path: model_path.to_string_lossy().to_string(),
            labels_path: labels_path.to_string_lossy().to_string(),
            labels,
            input_name,
            session: Mutex::new(session),
            preprocessing,
        })
    }

    pub fn preprocessing(&self) -> &Preprocessing {
        &self.preprocessing
    }

    fn validate_model(session: &Session) -> Result<(), LabelerError> {
        if session.inputs.is_empty() {
            return Err(LabelerError::InferenceError(
                "Model must have at least 1 input for the image tensor".to_string(),
            ));
        }
        if session.outputs.is_empty() {
            return Err(LabelerError::InferenceError(
                "Model must have at least 1 output for class scores".to_string(),
            ));
        }
        Ok(())
    }
}

impl ImageModel for OnnxImageModel {
    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn predict(&self, image: &[u8]) -> Result<Vec<f32>, LabelerError> {
        let input = image_to_tensor(image, &self.preprocessing)?.into_dyn();
        let input = input.as_standard_layout();

        let mut input_tensors = HashMap::new();
        input_tensors.insert(
            self.input_name.as_str(),
            Tensor::from_array(&input)
                .map_err(|e| LabelerError::InferenceError(format!("Failed to create input tensor: {}", e)))?,
        );

        let session = self
            .session
            .lock()
            .map_err(|_| LabelerError::InferenceError("Session lock poisoned".into()))?;
        let outputs = session
            .run(input_tensors)
            .map_err(|e| LabelerError::InferenceError(format!("Failed to run model: {}", e)))?;
        let output = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| LabelerError::InferenceError(format!("Failed to extract output tensor: {}", e)))?;

        // Batch of one: the output flattens to a single score row.
        let mut scores: Vec<f32> = output.iter().copied().collect();
        if scores.len() != self.labels.len() {
            return Err(LabelerError::PredictionError(format!(
                "Model produced {} scores for {} labels",
                scores.len(),
                self.labels.len()
            )));
        }
        if self.preprocessing.apply_softmax {
            softmax(&mut scores);
        }
        Ok(scores)
    }
}
