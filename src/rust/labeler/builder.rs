use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::info;

use super::batch::{BatchLabeler, DEFAULT_POOL_SIZE};
use super::error::LabelerError;
use super::model::{ImageModel, OnnxImageModel};
use crate::acquisition::ImageCache;
use crate::models::Preprocessing;
use crate::runtime::RuntimeConfig;
use crate::ModelManager;

/// A builder for constructing a BatchLabeler over an ONNX model with a fluent interface.
///
/// The model is loaded when `build` is called, so the runtime configuration
/// and preprocessing may be set in any order.
#[derive(Debug, Default)]
pub struct LabelerBuilder {
    model_path: Option<PathBuf>,
    labels_path: Option<PathBuf>,
    cache: Option<ImageCache>,
    pool_size: Option<usize>,
    preprocessing: Preprocessing,
    runtime_config: RuntimeConfig,
}

impl LabelerBuilder {
    /// Creates a new empty LabelerBuilder instance with default configuration
    ///
    /// # Example
    /// ```
    /// use image_labeler::LabelerBuilder;
    ///
    /// let builder = LabelerBuilder::new();
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the runtime configuration for ONNX model execution
    pub fn with_runtime_config(mut self, config: RuntimeConfig) -> Self {
        self.runtime_config = config;
        self
    }

    /// Sets how image bytes are turned into the model's input tensor
    ///
    /// # Example
    /// ```
    /// use image_labeler::{LabelerBuilder, Preprocessing};
    ///
    /// let builder = LabelerBuilder::new()
    ///     .with_preprocessing(Preprocessing::imagenet());
    /// ```
    pub fn with_preprocessing(mut self, preprocessing: Preprocessing) -> Self {
        self.preprocessing = preprocessing;
        self
    }

    /// Sets the ONNX graph and label file to load
    ///
    /// # Returns
    /// * `Result<Self, LabelerError>` - The builder instance if successful, or an error if:
    ///   - Either path is empty
    ///   - The paths are already set
    ///   - Either file doesn't exist
    pub fn with_model_files(
        mut self,
        model_path: impl AsRef<Path>,
        labels_path: impl AsRef<Path>,
    ) -> Result<Self, LabelerError> {
        let model_path = model_path.as_ref();
        let labels_path = labels_path.as_ref();

        if model_path.as_os_str().is_empty() || labels_path.as_os_str().is_empty() {
            return Err(LabelerError::BuildError("Model and labels paths cannot be empty".to_string()));
        }
        if self.model_path.is_some() || self.labels_path.is_some() {
            return Err(LabelerError::BuildError("Model and labels paths already set".to_string()));
        }
        if !model_path.exists() {
            return Err(LabelerError::BuildError(format!("Model file not found: {:?}", model_path)));
        }
        if !labels_path.exists() {
            return Err(LabelerError::BuildError(format!("Labels file not found: {:?}", labels_path)));
        }

        self.model_path = Some(model_path.to_path_buf());
        self.labels_path = Some(labels_path.to_path_buf());
        Ok(self)
    }

    /// Uses a bundle previously fetched into the given model store
    ///
    /// Fails with `BuildError` if the bundle has not been downloaded.
    pub fn with_managed_model(self, manager: &ModelManager, name: &str) -> Result<Self, LabelerError> {
        let (model_path, labels_path) = manager.resolve(name).map_err(|e| {
            LabelerError::BuildError(format!(
                "{}. Please download it first using ModelManager::download_model()",
                e
            ))
        })?;
        self.with_model_files(model_path, labels_path)
    }

    /// Sets the image cache; defaults to `ImageCache::new_default()`
    pub fn with_cache(mut self, cache: ImageCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Sets how many images are acquired or scored at once
    pub fn with_pool_size(mut self, pool_size: usize) -> Result<Self, LabelerError> {
        if pool_size == 0 {
            return Err(LabelerError::ValidationError("Pool size must be at least 1".into()));
        }
        self.pool_size = Some(pool_size);
        Ok(self)
    }

    fn validate_preprocessing(pre: &Preprocessing) -> Result<(), LabelerError> {
        if pre.input_size == 0 {
            return Err(LabelerError::ValidationError("Input size must be at least 1 pixel".into()));
        }
        if let Some(c) = pre.std.iter().position(|s| *s == 0.0 || !s.is_finite()) {
            return Err(LabelerError::ValidationError(format!(
                "Standard deviation for channel {} must be finite and non-zero",
                c
            )));
        }
        Ok(())
    }

    /// Loads the model and returns the ready labeler
    ///
    /// # Returns
    /// * `Result<BatchLabeler<OnnxImageModel>, LabelerError>` - or an error if:
    ///   - No model files are set
    ///   - The preprocessing settings are invalid
    ///   - The label file is empty or the model fails to load
    ///   - The default image cache cannot be created
    pub fn build(self) -> Result<BatchLabeler<OnnxImageModel>, LabelerError> {
        let (Some(model_path), Some(labels_path)) = (self.model_path, self.labels_path) else {
            return Err(LabelerError::BuildError("Model and labels paths must be set".to_string()));
        };
        Self::validate_preprocessing(&self.preprocessing)?;

        let model = OnnxImageModel::load(&model_path, &labels_path, &self.runtime_config, self.preprocessing)?;
        info!("Model ready with {} labels", model.labels().len());

        let cache = match self.cache {
            Some(cache) => cache,
            None => ImageCache::new_default()?,
        };

        BatchLabeler::new(Arc::new(model), cache, self.pool_size.unwrap_or(DEFAULT_POOL_SIZE))
    }
}
