//! Image labeling with pre-trained ONNX classifiers, plus a scraper for the
//! LabelMe research image database.
//!
//! # Basic Usage
//!
//! ```no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use image_labeler::{ImageCache, LabelerBuilder};
//!
//! let labeler = LabelerBuilder::new()
//!     .with_model_files("models/retrained_graph.onnx", "models/retrained_labels.txt")?
//!     .with_cache(ImageCache::new("temp/images")?)
//!     .build()?;
//!
//! let scores = labeler.label_image("https://example.com/daisy.jpg").await?;
//! println!("Top label: {:?}", scores.top());
//! # Ok(())
//! # }
//! ```
//!
//! # Thread Safety
//!
//! The model is loaded once and shared behind an `Arc`. Batches download up
//! to `pool_size` images at a time and may score them concurrently; calls
//! into the ONNX session itself are serialized.
//!
//! # Scraping LabelMe
//!
//! ```no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use image_labeler::LabelMe;
//!
//! let mut labelme = LabelMe::connect_default().await?;
//! let stats = labelme.search_stats("street").await?;
//! println!("{} images in {} dirs", stats.total_number_of_images, stats.number_of_matching_dirs);
//!
//! let tally = labelme.download_images_from_dir("static_street_sf/", None).await?;
//! assert_eq!(tally.total(), tally.success + tally.skip + tally.fail);
//! # Ok(())
//! # }
//! ```

pub mod acquisition;
mod download;
pub mod labeler;
pub mod labelme;
pub mod model_manager;
pub mod models;
mod runtime;

pub use acquisition::{cache_key, AcquireError, Acquisition, ImageCache};
pub use download::DownloadError;
pub use labeler::{
    BatchLabeler, ImageModel, LabelScores, LabelerBuilder, LabelerError, LabelerInfo, OnnxImageModel,
    DEFAULT_POOL_SIZE,
};
pub use labelme::{DownloadStatus, DownloadTally, LabelMe, ScraperError, SearchStats, BASE_IMAGE_DIR_URL};
pub use model_manager::{ModelError, ModelManager};
pub use models::{InputLayout, ModelInfo, Preprocessing};
pub use runtime::{create_session_builder, RuntimeConfig};

pub fn init_logger() {
    env_logger::init();
}
