//! Streaming downloads into the raw directory.
//!
//! The body is written to `<name>.partial` and renamed once complete, so a
//! file carrying the real name is always whole.

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::StreamExt;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};

use crate::error::FetchError;
use crate::http::RetryingClient;

/// Timeout for a whole download, body included.
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Suffix of in-flight downloads.
pub const PARTIAL_SUFFIX: &str = ".partial";

/// What a download attempt ended with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// The file was fetched and stored at this path.
    Downloaded { path: PathBuf, bytes: u64 },
    /// A file with that name was already present; nothing was fetched.
    AlreadyPresent(PathBuf),
}

#[derive(Debug, Clone)]
pub struct Downloader {
    client: RetryingClient,
    timeout: Duration,
}

impl Downloader {
    pub fn new(client: RetryingClient) -> Self {
        Self {
            client,
            timeout: DOWNLOAD_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Download `url` to `raw_dir/name`.
    ///
    /// On failure the partial file is removed.
    #[instrument(skip(self, raw_dir), fields(url = %url))]
    pub async fn download(
        &self,
        url: &str,
        raw_dir: &Path,
        name: &str,
    ) -> Result<DownloadOutcome, FetchError> {
        let final_path = raw_dir.join(name);
        if fs::try_exists(&final_path).await.unwrap_or(false) {
            info!(path = %final_path.display(), "File already exists, skipping download");
            return Ok(DownloadOutcome::AlreadyPresent(final_path));
        }

        let partial_path = raw_dir.join(format!("{}{}", name, PARTIAL_SUFFIX));
        let result = match self.fetch_to(url, &partial_path).await {
            Ok(bytes) => fs::rename(&partial_path, &final_path)
                .await
                .map(|()| bytes)
                .map_err(|e| FetchError::io(&final_path, e)),
            Err(e) => Err(e),
        };

        match result {
            Ok(bytes) => {
                info!(path = %final_path.display(), bytes, "Download completed");
                Ok(DownloadOutcome::Downloaded {
                    path: final_path,
                    bytes,
                })
            }
            Err(e) => {
                discard_partial(&partial_path).await;
                Err(e)
            }
        }
    }

    async fn fetch_to(&self, url: &str, path: &Path) -> Result<u64, FetchError> {
        let response = self.client.get(url, self.timeout).await?;

        let mut file = File::create(path)
            .await
            .map_err(|e| FetchError::io(path, e))?;
        let mut stream = response.bytes_stream();
        let mut bytes = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| FetchError::Request {
                url: url.to_string(),
                source: e,
            })?;
            file.write_all(&chunk)
                .await
                .map_err(|e| FetchError::io(path, e))?;
            bytes += chunk.len() as u64;
        }

        file.flush().await.map_err(|e| FetchError::io(path, e))?;
        file.sync_all().await.map_err(|e| FetchError::io(path, e))?;
        debug!(path = %path.display(), bytes, "Body written");

        Ok(bytes)
    }
}

async fn discard_partial(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(
                path = %path.display(),
                error = %e,
                "Failed to remove partial download"
            );
        }
    }
}
