//! Per-item fetch-to-file operations
//!
//! This module implements the single-item download path: collision-safe
//! target naming, transport retries with exponential backoff, atomic writes,
//! and the optional per-task courtesy delay toward the remote host.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::app::client::HostClient;
use crate::constants::download::{
    COLLISION_SUFFIX, MAX_RETRIES, RETRY_BASE_DELAY_MS, TEMP_FILE_SUFFIX,
};
use crate::errors::{DownloadError, DownloadResult};

/// Fetch-to-file operations handler borrowing a plugin's host client
pub struct FileFetcher<'a> {
    client: &'a HostClient,
}

impl<'a> FileFetcher<'a> {
    /// Creates a new FileFetcher with the given host client
    pub fn new(client: &'a HostClient) -> Self {
        Self { client }
    }

    /// Downloads `host + locator` into `folder/name`
    ///
    /// Existing files are never overwritten: on collision the name grows a
    /// `_d` suffix until it is free. Transport failures, including non-2xx
    /// responses, are retried up to three times with exponential backoff
    /// before an error is surfaced for this single item. After a successful
    /// write the optional `delay` is awaited inside the calling task.
    ///
    /// Returns the path the file was written to.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError::MaxRetriesExceeded` once retries are spent;
    /// raw transport errors never escape this boundary unclassified.
    pub async fn fetch_to_file(
        &self,
        locator: &str,
        folder: &Path,
        name: &str,
        delay: Duration,
    ) -> DownloadResult<PathBuf> {
        let url = self.client.resolve(locator)?;
        let target = collision_free_path(folder, name);

        let mut retries = 0;
        loop {
            match self.fetch_attempt(&url, &target).await {
                Ok(()) => {
                    tracing::debug!("downloaded {} to {}", url, target.display());
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    return Ok(target);
                }
                Err(e) if retries < MAX_RETRIES => {
                    retries += 1;
                    let backoff =
                        Duration::from_millis(RETRY_BASE_DELAY_MS * 2_u64.pow(retries));
                    tracing::warn!(
                        "download failed (attempt {}/{}): {}. Retrying in {}ms",
                        retries,
                        MAX_RETRIES,
                        e,
                        backoff.as_millis()
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => {
                    tracing::warn!("download failed after {} retries: {}", MAX_RETRIES, e);
                    return Err(DownloadError::MaxRetriesExceeded {
                        max_retries: MAX_RETRIES,
                        url: url.to_string(),
                    });
                }
            }
        }
    }

    /// One download attempt: fetch, check status, write atomically
    async fn fetch_attempt(&self, url: &Url, target: &Path) -> DownloadResult<()> {
        let response = self.client.get_response(url).await?;

        if !response.status().is_success() {
            return Err(DownloadError::ServerStatus {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        let bytes = response.bytes().await?;

        // Temp file + rename keeps a torn write from counting as a download
        let temp_path = target.with_file_name(format!(
            "{}{}",
            target
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("download"),
            TEMP_FILE_SUFFIX
        ));

        let mut file = File::create(&temp_path).await?;
        file.write_all(&bytes).await?;
        file.flush().await?;
        drop(file);

        if let Err(e) = tokio::fs::rename(&temp_path, target).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(DownloadError::Io(e));
        }

        Ok(())
    }
}

/// Resolve a collision-free target path in `folder`
///
/// While the candidate name exists on disk a warning is logged and the
/// collision suffix is appended, repeatedly, until a free name is found.
fn collision_free_path(folder: &Path, name: &str) -> PathBuf {
    let mut candidate = name.to_string();
    while folder.join(&candidate).exists() {
        tracing::warn!("already exists: {}", candidate);
        candidate.push_str(COLLISION_SUFFIX);
    }
    folder.join(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_collision_free_path_prefers_original_name() {
        let dir = tempdir().unwrap();
        let path = collision_free_path(dir.path(), "file");
        assert_eq!(path, dir.path().join("file"));
    }

    #[test]
    fn test_collision_suffix_grows_until_free() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("file"), "a").unwrap();
        assert_eq!(
            collision_free_path(dir.path(), "file"),
            dir.path().join("file_d")
        );

        std::fs::write(dir.path().join("file_d"), "b").unwrap();
        assert_eq!(
            collision_free_path(dir.path(), "file"),
            dir.path().join("file_d_d")
        );
    }
}
