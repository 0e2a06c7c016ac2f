//! Remote source downloads
//!
//! Streams source archives to disk while hashing them, retries with
//! exponential backoff, and reuses an existing file when its checksum
//! already matches.

use futures::StreamExt;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::config::defaults;
use crate::error::DownloadError;

/// A downloaded or reused file
#[derive(Debug)]
pub struct DownloadResult {
    /// Path to the file
    pub path: PathBuf,
    /// SHA256 checksum of the content
    pub checksum: String,
    /// Whether an existing file was reused
    pub cached: bool,
}

/// Fetches remote sources with retry
#[derive(Debug, Clone)]
pub struct DownloadManager {
    client: reqwest::Client,
    max_retries: u32,
    base_delay_ms: u64,
}

impl DownloadManager {
    /// Create a download manager with default retry settings
    pub fn new() -> Self {
        Self::with_config(defaults::MAX_DOWNLOAD_RETRIES, 1000)
    }

    /// Create a download manager with custom retry settings
    pub fn with_config(max_retries: u32, base_delay_ms: u64) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(300))
                .connect_timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            max_retries: max_retries.max(1),
            base_delay_ms,
        }
    }

    /// Get max retries
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Make `dest` hold the content of `url` with the expected checksum
    ///
    /// An existing `dest` with a matching checksum is kept as is. A download
    /// whose checksum does not match is deleted.
    pub async fn fetch_verified(
        &self,
        url: &str,
        dest: &Path,
        expected_checksum: &str,
    ) -> Result<DownloadResult, DownloadError> {
        if dest.is_file() && verify_checksum_async(dest, expected_checksum).await? {
            tracing::debug!("Reusing {}", dest.display());
            return Ok(DownloadResult {
                path: dest.to_path_buf(),
                checksum: expected_checksum.to_lowercase(),
                cached: true,
            });
        }

        let result = self.download(url, dest).await?;
        if !result.checksum.eq_ignore_ascii_case(expected_checksum) {
            let _ = tokio::fs::remove_file(dest).await;
            return Err(DownloadError::ChecksumFailed {
                file: dest.display().to_string(),
            });
        }
        Ok(result)
    }

    /// Download a file with retry logic
    pub async fn download(&self, url: &str, dest: &Path) -> Result<DownloadResult, DownloadError> {
        let mut last_error = None;
        let mut delay_ms = self.base_delay_ms;

        for attempt in 1..=self.max_retries {
            match self.download_once(url, dest).await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    tracing::warn!("Download attempt {attempt} of {url} failed: {e}");
                    last_error = Some(e);

                    if attempt < self.max_retries {
                        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                        delay_ms = (delay_ms * 2).min(30_000);
                    }
                }
            }
        }

        let _ = tokio::fs::remove_file(dest).await;

        Err(last_error.unwrap_or_else(|| DownloadError::MaxRetriesExceeded {
            url: url.to_string(),
            retries: self.max_retries,
        }))
    }

    async fn download_once(&self, url: &str, dest: &Path) -> Result<DownloadResult, DownloadError> {
        let network_error = |error: String| DownloadError::NetworkError {
            url: url.to_string(),
            error,
        };
        let io_error = |path: &Path, e: std::io::Error| DownloadError::IoError {
            path: path.to_path_buf(),
            error: e.to_string(),
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| network_error(e.to_string()))?;

        if !response.status().is_success() {
            return Err(network_error(format!("HTTP {}", response.status())));
        }

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(parent, e))?;
        }

        let mut file = File::create(dest).await.map_err(|e| io_error(dest, e))?;
        let mut hasher = Sha256::new();
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| network_error(e.to_string()))?;
            file.write_all(&chunk).await.map_err(|e| io_error(dest, e))?;
            hasher.update(&chunk);
        }
        file.flush().await.map_err(|e| io_error(dest, e))?;

        Ok(DownloadResult {
            path: dest.to_path_buf(),
            checksum: hex::encode(hasher.finalize()),
            cached: false,
        })
    }
}

impl Default for DownloadManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Check the SHA256 checksum of a file
pub async fn verify_checksum_async(path: &Path, expected: &str) -> Result<bool, DownloadError> {
    let content = tokio::fs::read(path)
        .await
        .map_err(|e| DownloadError::IoError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

    Ok(compute_checksum(&content).eq_ignore_ascii_case(expected))
}

/// Compute SHA256 checksum of data
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
