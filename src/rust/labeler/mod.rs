use std::collections::HashMap;
use std::path::PathBuf;

use serde::Serialize;

mod error;
mod input;
mod model;
mod utils;
pub mod batch;
pub mod builder;

pub use batch::{BatchLabeler, DEFAULT_POOL_SIZE};
pub use builder::LabelerBuilder;
pub use error::LabelerError;
pub use model::{ImageModel, OnnxImageModel};

/// Ranked scores for one image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelScores {
    /// The URL the image was requested from
    pub url: String,
    /// `(label, confidence)` pairs sorted by descending confidence.
    /// Whitespace in labels is replaced with underscores.
    pub scores: Vec<(String, f32)>,
}

impl LabelScores {
    /// Pairs `labels` with `scores` and ranks them by descending confidence.
    ///
    /// Fails with `PredictionError` unless there is exactly one score per label.
    pub fn rank(url: impl Into<String>, labels: &[String], scores: &[f32]) -> Result<Self, LabelerError> {
        let url = url.into();
        if scores.len() != labels.len() {
            return Err(LabelerError::PredictionError(format!(
                "Model returned {} scores for {} labels ({})",
                scores.len(),
                labels.len(),
                url
            )));
        }
        Ok(Self {
            scores: utils::rank_scores(labels, scores),
            url,
        })
    }

    /// The most confident label, if the model has any labels
    pub fn top(&self) -> Option<(&str, f32)> {
        self.scores.first().map(|(label, score)| (label.as_str(), *score))
    }

    pub fn get(&self, label: &str) -> Option<f32> {
        self.scores.iter().find(|(l, _)| l == label).map(|(_, s)| *s)
    }

    pub fn to_map(&self) -> HashMap<String, f32> {
        self.scores.iter().cloned().collect()
    }
}

/// Information about the current configuration of a labeler
#[derive(Debug, Clone)]
pub struct LabelerInfo {
    /// Number of labels the model scores
    pub num_labels: usize,
    /// Labels as read from the label file
    pub labels: Vec<String>,
    /// Maximum number of images acquired or scored at once
    pub pool_size: usize,
    /// Directory holding downloaded images
    pub cache_dir: PathBuf,
}
