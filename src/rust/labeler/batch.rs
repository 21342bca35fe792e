use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use log::{error, info};

use super::error::LabelerError;
use super::model::ImageModel;
use super::{LabelScores, LabelerInfo};
use crate::acquisition::{Acquisition, ImageCache};

/// Number of images acquired or scored at once unless configured otherwise.
pub const DEFAULT_POOL_SIZE: usize = 4;

/// Downloads images by URL and labels them with one shared, pre-loaded model.
///
/// ```no_run
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// use image_labeler::LabelerBuilder;
///
/// let labeler = LabelerBuilder::new()
///     .with_model_files("models/retrained_graph.onnx", "models/retrained_labels.txt")?
///     .build()?;
///
/// let results = labeler
///     .label_batch(&["https://example.com/a.jpg", "https://example.com/b.jpg"], true)
///     .await?;
/// for result in results {
///     println!("{} -> {:?}", result.url, result.top());
/// }
/// # Ok(())
/// # }
/// ```
pub struct BatchLabeler<M> {
    model: Arc<M>,
    cache: ImageCache,
    pool_size: usize,
}

impl<M> Clone for BatchLabeler<M> {
    fn clone(&self) -> Self {
        Self {
            model: Arc::clone(&self.model),
            cache: self.cache.clone(),
            pool_size: self.pool_size,
        }
    }
}

impl<M: ImageModel + 'static> BatchLabeler<M> {
    pub fn new(model: Arc<M>, cache: ImageCache, pool_size: usize) -> Result<Self, LabelerError> {
        if pool_size == 0 {
            return Err(LabelerError::ValidationError("Pool size must be at least 1".into()));
        }
        Ok(Self { model, cache, pool_size })
    }

    pub fn model(&self) -> &Arc<M> {
        &self.model
    }

    pub fn cache(&self) -> &ImageCache {
        &self.cache
    }

    pub fn info(&self) -> LabelerInfo {
        LabelerInfo {
            num_labels: self.model.labels().len(),
            labels: self.model.labels().to_vec(),
            pool_size: self.pool_size,
            cache_dir: self.cache.dir().to_path_buf(),
        }
    }

    /// Acquires and labels a single image.
    pub async fn label_image(&self, url: &str) -> Result<LabelScores, LabelerError> {
        let mut results = self.label_batch(&[url], false).await?;
        results
            .pop()
            .ok_or_else(|| LabelerError::PredictionError(format!("No result produced for {}", url)))
    }

    /// Acquires every URL through the worker pool, then scores each image.
    ///
    /// With `concurrent` set, scoring also runs up to `pool_size` images at a
    /// time; otherwise images are scored one after another and progress is
    /// logged after each. Results are in input order either way. The first
    /// failed acquisition aborts the whole batch.
    pub async fn label_batch<S: AsRef<str>>(
        &self,
        urls: &[S],
        concurrent: bool,
    ) -> Result<Vec<LabelScores>, LabelerError> {
        let urls: Vec<&str> = urls.iter().map(AsRef::as_ref).collect();
        if let Some(pos) = urls.iter().position(|u| u.trim().is_empty()) {
            return Err(LabelerError::ValidationError(format!("URL {} is empty", pos + 1)));
        }

        let paths = self.acquire_all(&urls).await?;
        let images = futures::future::try_join_all(paths.iter().map(|path| tokio::fs::read(path))).await?;

        let scores = if concurrent {
            self.score_concurrent(images).await?
        } else {
            self.score_sequential(images).await?
        };

        let labels = self.model.labels();
        urls.iter()
            .zip(scores)
            .map(|(url, scores)| LabelScores::rank(*url, labels, &scores))
            .collect()
    }

    // Each distinct URL is fetched once; duplicates share the cached path.
    async fn acquire_all(&self, urls: &[&str]) -> Result<Vec<PathBuf>, LabelerError> {
        let mut unique: Vec<&str> = Vec::with_capacity(urls.len());
        for &url in urls {
            if !unique.contains(&url) {
                unique.push(url);
            }
        }

        let acquired: Vec<_> = stream::iter(unique)
            .map(|url| async move { (url, self.cache.acquire(url).await) })
            .buffered(self.pool_size)
            .collect()
            .await;

        let mut paths: HashMap<&str, PathBuf> = HashMap::with_capacity(acquired.len());
        for (url, result) in acquired {
            match result? {
                Acquisition::Cached(path) | Acquisition::Downloaded(path) => {
                    paths.insert(url, path);
                }
                Acquisition::Failed { status } => {
                    error!("Aborting batch: {} returned status {}", url, status);
                    return Err(LabelerError::AcquisitionFailed { url: url.to_string(), status });
                }
            }
        }

        urls.iter()
            .map(|url| {
                paths.get(url).cloned().ok_or_else(|| {
                    LabelerError::ValidationError(format!("No acquisition recorded for {}", url))
                })
            })
            .collect()
    }

    async fn predict_blocking(&self, image: Vec<u8>) -> Result<Vec<f32>, LabelerError> {
        let model = Arc::clone(&self.model);
        tokio::task::spawn_blocking(move || model.predict(&image))
            .await
            .map_err(|e| LabelerError::InferenceError(format!("Inference task failed: {}", e)))?
    }

    async fn score_sequential(&self, images: Vec<Vec<u8>>) -> Result<Vec<Vec<f32>>, LabelerError> {
        let total = images.len();
        let mut all_scores = Vec::with_capacity(total);
        for (i, image) in images.into_iter().enumerate() {
            all_scores.push(self.predict_blocking(image).await?);
            info!(
                "Labeled {}/{} images ({:.1}%)",
                i + 1,
                total,
                (i + 1) as f64 / total as f64 * 100.0
            );
        }
        Ok(all_scores)
    }

    async fn score_concurrent(&self, images: Vec<Vec<u8>>) -> Result<Vec<Vec<f32>>, LabelerError> {
        let results: Vec<Result<Vec<f32>, LabelerError>> = stream::iter(images)
            .map(|image| self.predict_blocking(image))
            .buffered(self.pool_size)
            .collect()
            .await;
        results.into_iter().collect()
    }
}
