use serde::{Deserialize, Serialize};

/// Where a model bundle can be fetched from and how to verify it.
///
/// A bundle is an ONNX graph plus a plain-text label file with one label per
/// line, in the order of the model's output vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub model_url: String,
    pub labels_url: String,
    /// Lowercase hex SHA-256 of the model file, checked after download when set
    pub model_hash: Option<String>,
    /// Lowercase hex SHA-256 of the label file, checked after download when set
    pub labels_hash: Option<String>,
}

impl ModelInfo {
    pub fn new(
        name: impl Into<String>,
        model_url: impl Into<String>,
        labels_url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            model_url: model_url.into(),
            labels_url: labels_url.into(),
            model_hash: None,
            labels_hash: None,
        }
    }

    pub fn with_hashes(mut self, model_hash: Option<String>, labels_hash: Option<String>) -> Self {
        self.model_hash = model_hash;
        self.labels_hash = labels_hash;
        self
    }
}

/// Memory order of the image tensor fed to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputLayout {
    /// `[1, height, width, 3]`, the TensorFlow convention
    Nhwc,
    /// `[1, 3, height, width]`, the PyTorch convention
    Nchw,
}

/// How raw image bytes become the model's input tensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preprocessing {
    /// Images are resized to `input_size` x `input_size`
    pub input_size: u32,
    pub layout: InputLayout,
    /// Per-channel (R, G, B) value subtracted from each 0..=255 pixel
    pub mean: [f32; 3],
    /// Per-channel (R, G, B) divisor applied after mean subtraction
    pub std: [f32; 3],
    /// Apply softmax to the model output; leave off for graphs that end in one
    pub apply_softmax: bool,
}

impl Default for Preprocessing {
    /// Matches a retrained Inception-v3 graph: 299px NHWC input scaled to [-1, 1],
    /// with a softmax already at the end of the graph.
    fn default() -> Self {
        Self {
            input_size: 299,
            layout: InputLayout::Nhwc,
            mean: [128.0; 3],
            std: [128.0; 3],
            apply_softmax: false,
        }
    }
}

impl Preprocessing {
    /// ImageNet-style 224px NCHW input with torchvision normalization.
    pub fn imagenet() -> Self {
        Self {
            input_size: 224,
            layout: InputLayout::Nchw,
            mean: [123.675, 116.28, 103.53],
            std: [58.395, 57.12, 57.375],
            apply_softmax: true,
        }
    }

    pub fn input_shape(&self) -> [usize; 4] {
        let side = self.input_size as usize;
        match self.layout {
            InputLayout::Nhwc => [1, side, side, 3],
            InputLayout::Nchw => [1, 3, side, side],
        }
    }
}
