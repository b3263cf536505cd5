//! Bounded-concurrency download engine
//!
//! The engine fans one download task out per link item, bounded by the
//! configured concurrency limit, and joins them all before returning. A
//! single item's transport failure is contained to that item: it is logged
//! and excluded from the succeeded set, and never aborts sibling tasks or
//! the batch. The final succeeded/failed partition is reconstructed by disk
//! inspection in [`DownloadEngine::verify`], independent of completion
//! order.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use crate::app::client::{FileFetcher, HostClient};
use crate::app::models::{LinkItem, LinkItemCollection};
use crate::errors::DownloadResult;

pub mod config;
pub mod progress;

pub use config::{default_concurrency, EngineConfig};
pub use progress::{progress_channel, ProgressEvent, ProgressReceiver, ProgressSender};

/// Concurrent downloader for one plugin run
#[derive(Debug)]
pub struct DownloadEngine {
    client: Arc<HostClient>,
    config: EngineConfig,
    progress: Option<ProgressSender>,
}

impl DownloadEngine {
    /// Create a new engine over the given host client
    pub fn new(client: Arc<HostClient>, config: EngineConfig) -> Self {
        Self {
            client,
            config,
            progress: None,
        }
    }

    /// Attach a progress side channel
    pub fn with_progress(mut self, sender: ProgressSender) -> Self {
        self.progress = Some(sender);
        self
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Download every item of the collection into `target_dir`
    ///
    /// No-op on an empty collection. Each item is fetched from
    /// `host + locator` and written to `target_dir/name` under the collision
    /// policy of [`FileFetcher`]. The call blocks until all tasks have run
    /// to completion; per-item failures are logged as warnings and do not
    /// abort the batch. `description` and `unit` only feed the progress
    /// side channel.
    pub async fn download(
        &self,
        items: &LinkItemCollection,
        target_dir: &Path,
        description: &str,
        unit: &str,
    ) {
        if items.is_empty() {
            return;
        }

        let total = items.len();
        self.emit(ProgressEvent::Started {
            total,
            description: description.to_string(),
            unit: unit.to_string(),
        });
        info!("downloading {} {} ({})", total, unit, description);

        let completed = AtomicUsize::new(0);
        let outcomes: Vec<(&str, &LinkItem, DownloadResult<PathBuf>)> =
            stream::iter(items.iter())
                .map(|(locator, item)| {
                    let client = Arc::clone(&self.client);
                    let progress = self.progress.clone();
                    let delay = self.config.item_delay;
                    let completed = &completed;
                    async move {
                        let result = FileFetcher::new(&client)
                            .fetch_to_file(locator, target_dir, item.name(), delay)
                            .await;
                        let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                        send_event(
                            &progress,
                            ProgressEvent::ItemFinished {
                                name: item.name().to_string(),
                                completed: done,
                                total,
                                succeeded: result.is_ok(),
                            },
                        );
                        (locator, item, result)
                    }
                })
                .buffer_unordered(self.config.concurrency.max(1))
                .collect()
                .await;

        let mut succeeded = 0;
        let mut failed = 0;
        for (locator, item, result) in &outcomes {
            match result {
                Ok(_) => succeeded += 1,
                Err(e) => {
                    failed += 1;
                    warn!(
                        "failed to download {}{} - {}: {}",
                        self.client.host(),
                        locator,
                        item.name(),
                        e
                    );
                }
            }
        }

        self.emit(ProgressEvent::Finished { succeeded, failed });
        info!("{}/{} {} downloaded ({})", succeeded, total, unit, description);
    }

    /// Partition `expected` by on-disk presence under `target_dir`
    ///
    /// Returns `(succeeded, failed)`; together they cover `expected` exactly
    /// and share no entry. Every missing entry is logged. Existence is the
    /// only criterion; content correctness is out of scope.
    pub fn verify(
        &self,
        expected: &LinkItemCollection,
        target_dir: &Path,
    ) -> (LinkItemCollection, LinkItemCollection) {
        let mut on_disk = HashSet::new();
        for (_, item) in expected.iter() {
            if target_dir.join(item.name()).is_file() {
                on_disk.insert(item.name().to_string());
            }
        }

        let (succeeded, failed) = expected.split_by_presence(&on_disk);
        for (locator, item) in failed.iter() {
            warn!(
                "not downloaded: {}{} - {}",
                self.client.host(),
                locator,
                item.name()
            );
        }

        (succeeded, failed)
    }

    fn emit(&self, event: ProgressEvent) {
        send_event(&self.progress, event);
    }
}

/// Forward an event without ever stalling a download task
fn send_event(progress: &Option<ProgressSender>, event: ProgressEvent) {
    if let Some(sender) = progress {
        let _ = sender.try_send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::client::ClientConfig;
    use chrono::TimeZone;
    use chrono::Utc;
    use tempfile::tempdir;

    fn engine() -> DownloadEngine {
        let client =
            Arc::new(HostClient::new("example.com", &ClientConfig::default()).unwrap());
        DownloadEngine::new(client, EngineConfig::default())
    }

    fn two_items() -> LinkItemCollection {
        let mut items = LinkItemCollection::new();
        items.insert(
            "/archive/readme",
            LinkItem::new("One", Utc.with_ymd_and_hms(2001, 1, 1, 1, 1, 1).unwrap()).unwrap(),
        );
        items.insert(
            "/archive/missing",
            LinkItem::new("Two", Utc.with_ymd_and_hms(2002, 2, 2, 2, 2, 2).unwrap()).unwrap(),
        );
        items
    }

    /// Downloading an empty collection performs zero I/O and returns
    /// immediately, without touching the network or the progress channel.
    #[tokio::test]
    async fn test_download_empty_collection_is_noop() {
        let dir = tempdir().unwrap();
        let (tx, mut rx) = progress_channel();
        let engine = engine().with_progress(tx);

        engine
            .download(&LinkItemCollection::new(), dir.path(), "nothing", "item")
            .await;

        assert!(rx.try_recv().is_err());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    /// With only "One" present on disk, verify partitions the expected
    /// collection into succeeded = {readme} and failed = {missing}.
    #[test]
    fn test_verify_partition() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("One"), "test").unwrap();

        let expected = two_items();
        let (succeeded, failed) = engine().verify(&expected, dir.path());

        assert_eq!(succeeded.len(), 1);
        assert!(succeeded.contains("/archive/readme"));
        assert_eq!(failed.len(), 1);
        assert!(failed.contains("/archive/missing"));
        assert_eq!(succeeded.len() + failed.len(), expected.len());
    }

    #[test]
    fn test_verify_empty_collection() {
        let dir = tempdir().unwrap();
        let (succeeded, failed) = engine().verify(&LinkItemCollection::new(), dir.path());
        assert!(succeeded.is_empty());
        assert!(failed.is_empty());
    }

    /// A directory entry that is not a regular file does not count as a
    /// completed download.
    #[test]
    fn test_verify_ignores_directories() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("One")).unwrap();

        let (succeeded, failed) = engine().verify(&two_items(), dir.path());
        assert!(succeeded.is_empty());
        assert_eq!(failed.len(), 2);
    }
}
