use ort::Error as OrtError;
use reqwest::StatusCode;
use std::fmt;
use std::io;

use crate::acquisition::AcquireError;
use crate::model_manager::ModelError;

/// Represents the different types of errors that can occur while labeling images.
#[derive(Debug)]
pub enum LabelerError {
    /// Error occurred while configuring or building the labeler
    BuildError(String),
    /// Error occurred while loading or running the ONNX model
    InferenceError(String),
    /// The model produced output that does not line up with the label list
    PredictionError(String),
    /// Image bytes could not be decoded
    DecodeError(String),
    /// Error occurred due to invalid input parameters
    ValidationError(String),
    /// The server answered an image request with a non-200 status
    AcquisitionFailed { url: String, status: StatusCode },
    /// Transport or filesystem failure while acquiring an image
    Acquire(AcquireError),
    /// Reading a cached image or a label file failed
    Io(io::Error),
}

impl fmt::Display for LabelerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BuildError(msg) => write!(f, "Build error: {}", msg),
            Self::InferenceError(msg) => write!(f, "Inference error: {}", msg),
            Self::PredictionError(msg) => write!(f, "Prediction error: {}", msg),
            Self::DecodeError(msg) => write!(f, "Decode error: {}", msg),
            Self::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            Self::AcquisitionFailed { url, status } => {
                write!(f, "Failed to acquire {}: status {}", url, status)
            }
            Self::Acquire(err) => write!(f, "Acquire error: {}", err),
            Self::Io(err) => write!(f, "IO error: {}", err),
        }
    }
}

impl std::error::Error for LabelerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Acquire(err) => Some(err),
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<OrtError> for LabelerError {
    fn from(err: OrtError) -> Self {
        LabelerError::BuildError(err.to_string())
    }
}

impl From<AcquireError> for LabelerError {
    fn from(err: AcquireError) -> Self {
        LabelerError::Acquire(err)
    }
}

impl From<io::Error> for LabelerError {
    fn from(err: io::Error) -> Self {
        LabelerError::Io(err)
    }
}

impl From<image::ImageError> for LabelerError {
    fn from(err: image::ImageError) -> Self {
        LabelerError::DecodeError(err.to_string())
    }
}

impl From<ModelError> for LabelerError {
    fn from(err: ModelError) -> Self {
        LabelerError::BuildError(err.to_string())
    }
}
