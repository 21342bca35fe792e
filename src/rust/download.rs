use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use reqwest::{Client, StatusCode};
use tokio::fs;
use tokio::io::AsyncWriteExt;

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Result of a GET whose body is meant for a file on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Status 200; the body was written and holds this many bytes
    Written(u64),
    /// Any other status; nothing was written
    Rejected(StatusCode),
}

/// Streams the body of `url` into `dest`.
///
/// The body goes to a uniquely named sibling first and is renamed onto `dest`
/// once complete, so `dest` never holds a truncated download. The partial file
/// is removed if the transfer fails.
pub async fn fetch_to_file(client: &Client, url: &str, dest: &Path) -> Result<FetchOutcome, DownloadError> {
    let mut response = client.get(url).send().await?;
    let status = response.status();
    log::debug!("GET {} -> {}", url, status);
    if status != StatusCode::OK {
        return Ok(FetchOutcome::Rejected(status));
    }

    let partial = partial_path(dest);
    let mut file = fs::File::create(&partial).await?;
    let mut written = 0u64;

    let transfer = async {
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        Ok::<_, DownloadError>(())
    }
    .await;

    drop(file);
    if let Err(e) = transfer {
        let _ = fs::remove_file(&partial).await;
        return Err(e);
    }

    fs::rename(&partial, dest).await?;
    Ok(FetchOutcome::Written(written))
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = OsString::from(dest.as_os_str());
    name.push(format!(".part-{:08x}", rand::random::<u32>()));
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_path_is_sibling() {
        let dest = Path::new("/tmp/cache/abc.jpg");
        let partial = partial_path(dest);
        assert_eq!(partial.parent(), dest.parent());
        assert!(partial.to_string_lossy().starts_with("/tmp/cache/abc.jpg.part-"));
    }

    #[test]
    fn test_partial_paths_differ() {
        let dest = Path::new("img.png");
        assert_ne!(partial_path(dest), partial_path(dest));
    }
}
