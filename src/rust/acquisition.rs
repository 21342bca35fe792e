use std::env;
use std::io;
use std::path::{Path, PathBuf};

use reqwest::{Client, StatusCode};
use sha2::{Digest, Sha256};

use crate::download::{fetch_to_file, DownloadError, FetchOutcome};

#[derive(Debug, thiserror::Error)]
pub enum AcquireError {
    #[error("Download error: {0}")]
    Download(#[from] DownloadError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// What happened when an image URL was requested from the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acquisition {
    /// The file already existed; no request was made
    Cached(PathBuf),
    /// The file was fetched and written
    Downloaded(PathBuf),
    /// The server answered with something other than 200; nothing was written
    Failed { status: StatusCode },
}

impl Acquisition {
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Cached(path) | Self::Downloaded(path) => Some(path),
            Self::Failed { .. } => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Hex SHA-256 of the URL. The same URL maps to the same key on every run and machine.
pub fn cache_key(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// On-disk image cache keyed by URL digest.
///
/// Entries never expire and are never re-validated against the remote source.
#[derive(Debug, Clone)]
pub struct ImageCache {
    dir: PathBuf,
    client: Client,
}

impl ImageCache {
    /// Creates a cache in the default images directory
    pub fn new_default() -> io::Result<Self> {
        Self::new(Self::default_dir())
    }

    /// Returns the default images directory path
    pub fn default_dir() -> PathBuf {
        if let Ok(path) = env::var("IMAGE_LABELER_CACHE") {
            return PathBuf::from(path).join("images");
        }

        if let Some(cache_dir) = dirs::cache_dir() {
            return cache_dir.join("image-labeler").join("images");
        }

        if let Some(home_dir) = dirs::home_dir() {
            return home_dir.join(".cache").join("image-labeler").join("images");
        }

        env::temp_dir().join("image-labeler").join("images")
    }

    pub fn new<P: AsRef<Path>>(dir: P) -> io::Result<Self> {
        Self::with_client(dir, Client::new())
    }

    pub fn with_client<P: AsRef<Path>>(dir: P, client: Client) -> io::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir, client })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, url: &str) -> PathBuf {
        self.dir.join(format!("{}.jpg", cache_key(url)))
    }

    /// Returns the local copy of `url`, downloading it first if it is not cached.
    ///
    /// The existence check and the write are not locked against each other; two
    /// callers racing on one URL may both download it.
    pub async fn acquire(&self, url: &str) -> Result<Acquisition, AcquireError> {
        let path = self.path_for(url);
        if tokio::fs::try_exists(&path).await? {
            log::debug!("Cache hit for {} at {:?}", url, path);
            return Ok(Acquisition::Cached(path));
        }

        match fetch_to_file(&self.client, url, &path).await? {
            FetchOutcome::Written(bytes) => {
                log::info!("Downloaded {} ({} bytes) to {:?}", url, bytes, path);
                Ok(Acquisition::Downloaded(path))
            }
            FetchOutcome::Rejected(status) => {
                log::warn!("Failed to download {}: status {}", url, status);
                Ok(Acquisition::Failed { status })
            }
        }
    }
}
