//! Listing, search and bulk download against the LabelMe image database.
//!
//! LabelMe serves its images as plain HTML directory listings, one
//! subdirectory per collection. For more info, visit
//! <http://labelme2.csail.mit.edu/Release3.0/index.php>.

use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;
use rand::Rng;
use reqwest::{Client, StatusCode};
use serde::Serialize;

use crate::download::{fetch_to_file, FetchOutcome};

mod listing;

pub use listing::{classify, is_valid_dir, is_valid_image, EntryKind, Listing, ListingEntry};

pub const BASE_IMAGE_DIR_URL: &str = "http://people.csail.mit.edu/brussell/research/LabelMe/Images/";

#[derive(Debug, thiserror::Error)]
pub enum ScraperError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Listing {url} returned status {status}")]
    BadStatus { url: String, status: StatusCode },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Outcome of downloading one image file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadStatus {
    Success,
    /// A file with the same name already existed locally
    Skip,
    Fail,
}

/// Per-status counts for one directory download.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DownloadTally {
    pub success: usize,
    pub skip: usize,
    pub fail: usize,
}

impl DownloadTally {
    pub fn record(&mut self, status: DownloadStatus) {
        match status {
            DownloadStatus::Success => self.success += 1,
            DownloadStatus::Skip => self.skip += 1,
            DownloadStatus::Fail => self.fail += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.success + self.skip + self.fail
    }
}

/// Totals for one search term.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchStats {
    pub number_of_matching_dirs: usize,
    pub total_number_of_images: usize,
    /// Image count per matching directory href
    pub images_per_dir: BTreeMap<String, usize>,
}

/// Client for one LabelMe image catalog.
///
/// The root listing is fetched once at construction; search results are
/// computed from it. Search stats are cached per term for the lifetime of the
/// value.
#[derive(Debug)]
pub struct LabelMe {
    base_url: String,
    client: Client,
    root: Listing,
    cached_search_stats: HashMap<String, SearchStats>,
}

fn with_trailing_slash(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{}/", url)
    }
}

impl LabelMe {
    /// Fetches the root listing of the public LabelMe catalog.
    pub async fn connect_default() -> Result<Self, ScraperError> {
        Self::connect(BASE_IMAGE_DIR_URL).await
    }

    /// Fetches the root listing of the catalog at `base_url`.
    pub async fn connect(base_url: &str) -> Result<Self, ScraperError> {
        let client = Client::new();
        let base_url = with_trailing_slash(base_url);
        let root = Self::fetch_listing_with(&client, &base_url).await?;
        log::info!("Loaded {} entries from {}", root.entries().len(), base_url);
        Ok(Self {
            base_url,
            client,
            root,
            cached_search_stats: HashMap::new(),
        })
    }

    /// Uses an already-fetched root listing instead of requesting one.
    pub fn with_listing(base_url: &str, html: &str) -> Result<Self, ScraperError> {
        Ok(Self {
            base_url: with_trailing_slash(base_url),
            client: Client::new(),
            root: Listing::parse(html)?,
            cached_search_stats: HashMap::new(),
        })
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn root(&self) -> &Listing {
        &self.root
    }

    fn dir_url(&self, dir_path: &str) -> String {
        with_trailing_slash(&format!("{}{}", self.base_url, dir_path.trim_start_matches('/')))
    }

    async fn fetch_listing_with(client: &Client, url: &str) -> Result<Listing, ScraperError> {
        let response = client.get(url).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(ScraperError::BadStatus { url: url.to_string(), status });
        }
        Listing::parse(&response.text().await?)
    }

    /// Fetches and parses the listing of a directory under the base URL.
    pub async fn fetch_listing(&self, dir_path: &str) -> Result<Listing, ScraperError> {
        Self::fetch_listing_with(&self.client, &self.dir_url(dir_path)).await
    }

    /// Returns the directory links whose anchor text contains `search_term`, in listing order.
    pub fn search_links(&self, search_term: &str) -> Vec<String> {
        self.root.matching_links(search_term)
    }

    /// Like `search_links`, shuffled with the given generator. Seed it for a repeatable order.
    pub fn search_links_shuffled<R: Rng + ?Sized>(&self, search_term: &str, rng: &mut R) -> Vec<String> {
        let mut links = self.search_links(search_term);
        links.shuffle(rng);
        links
    }

    /// Counts the images in every directory matching `search_term`.
    ///
    /// The result is cached per term; repeated calls make no requests.
    pub async fn search_stats(&mut self, search_term: &str) -> Result<SearchStats, ScraperError> {
        if let Some(stats) = self.cached_search_stats.get(search_term) {
            log::info!("{}: {:?}", search_term, stats);
            return Ok(stats.clone());
        }

        let found_dir_links = self.search_links(search_term);
        let mut stats = SearchStats {
            number_of_matching_dirs: found_dir_links.len(),
            ..SearchStats::default()
        };

        for dir_link in found_dir_links {
            let listing = self.fetch_listing(&dir_link).await?;
            let count = listing.image_files().len();
            stats.total_number_of_images += count;
            *stats.images_per_dir.entry(dir_link).or_insert(0) += count;
        }

        log::info!("{}: {:?}", search_term, stats);
        self.cached_search_stats.insert(search_term.to_string(), stats.clone());
        Ok(stats)
    }

    /// Downloads every valid image of a directory and returns the per-status counts.
    ///
    /// Files go to `target_dir`, or `images/<dir_path>` when none is given.
    /// The directory is created if missing.
    pub async fn download_images_from_dir(
        &self,
        dir_path: &str,
        target_dir: Option<&Path>,
    ) -> Result<DownloadTally, ScraperError> {
        let listing = self.fetch_listing(dir_path).await?;
        let image_files = listing.image_files();

        let local_dir = Self::local_dir(dir_path, target_dir);
        tokio::fs::create_dir_all(&local_dir).await?;

        let mut tally = DownloadTally::default();
        for image_file in image_files {
            tally.record(self.download_image(dir_path, image_file, Some(&local_dir)).await);
        }

        log::info!(
            "Downloaded: {}, Skipped: {}, Failed: {}",
            tally.success,
            tally.skip,
            tally.fail
        );
        Ok(tally)
    }

    /// Downloads one image of a directory, skipping it if a same-named file exists locally.
    ///
    /// Transport and filesystem errors are logged and reported as `Fail`.
    pub async fn download_image(
        &self,
        dir_path: &str,
        image_file: &str,
        target_dir: Option<&Path>,
    ) -> DownloadStatus {
        let Some(file_name) = image_file.rsplit('/').next().filter(|name| !name.is_empty()) else {
            log::warn!("Ignoring image link without a file name: {}", image_file);
            return DownloadStatus::Fail;
        };
        let local_path = Self::local_dir(dir_path, target_dir).join(file_name);

        if local_path.is_file() {
            log::info!("Duplicate file detected, skipping image file: {}", image_file);
            return DownloadStatus::Skip;
        }

        let source = format!("{}{}", self.dir_url(dir_path), image_file);
        match fetch_to_file(&self.client, &source, &local_path).await {
            Ok(FetchOutcome::Written(_)) => DownloadStatus::Success,
            Ok(FetchOutcome::Rejected(status)) => {
                log::warn!("Failed to download {}: status {}", source, status);
                DownloadStatus::Fail
            }
            Err(e) => {
                log::warn!("Failed to download {}: {}", source, e);
                DownloadStatus::Fail
            }
        }
    }

    fn local_dir(dir_path: &str, target_dir: Option<&Path>) -> PathBuf {
        match target_dir {
            Some(dir) => dir.to_path_buf(),
            None => Path::new("images").join(dir_path.trim_matches('/')),
        }
    }
}
