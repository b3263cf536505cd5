//! End-to-end plugin run tests against a loopback HTTP stub
//!
//! These tests drive the full orchestration path: catalog fetch, staged
//! concurrent downloads, verification, save-state persistence, commit to the
//! download directory, and staging cleanup. The stub server is a plain TCP
//! listener speaking just enough HTTP/1.1 for reqwest.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tempfile::tempdir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use delta_fetcher::app::engine::{DownloadEngine, EngineConfig};
use delta_fetcher::app::{
    ClientConfig, DataSource, HostClient, LinkItem, LinkItemCollection, Plugin, PluginInfo,
    PluginOptions,
};
use delta_fetcher::config::Settings;
use delta_fetcher::errors::SourceResult;

/// Route table of the stub server: path -> (status, body)
type Routes = HashMap<String, (u16, String)>;

/// Spawn a minimal HTTP/1.1 server; returns its address and a request counter
async fn spawn_stub_server(routes: Routes) -> (SocketAddr, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    let routes = Arc::new(routes);

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let routes = Arc::clone(&routes);
            let counter = Arc::clone(&counter);
            tokio::spawn(async move {
                let mut buf = vec![0u8; 8192];
                let mut len = 0;
                while len < buf.len() {
                    match socket.read(&mut buf[len..]).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => len += n,
                    }
                    if buf[..len].windows(4).any(|w| w == b"\r\n\r\n") {
                        break;
                    }
                }

                let request = String::from_utf8_lossy(&buf[..len]);
                let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();
                counter.fetch_add(1, Ordering::SeqCst);

                let (status, body) = routes
                    .get(&path)
                    .cloned()
                    .unwrap_or((404, "not found".to_string()));
                let reason = if status == 200 { "OK" } else { "Error" };
                let response = format!(
                    "HTTP/1.1 {status} {reason}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (addr, hits)
}

fn host_for(addr: SocketAddr) -> String {
    format!("http://{addr}")
}

fn ts(year: i32, sec: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, 1, 1, 0, 0, sec).unwrap()
}

/// Data source with a fixed catalog pointed at the stub server
struct StubSource {
    info: PluginInfo,
    catalog: LinkItemCollection,
    freshness: DateTime<Utc>,
}

impl StubSource {
    fn new(host: &str, catalog: LinkItemCollection, freshness: DateTime<Utc>) -> Self {
        Self {
            info: PluginInfo::new("stub", "0.1.0", host).unwrap(),
            catalog,
            freshness,
        }
    }
}

#[async_trait]
impl DataSource for StubSource {
    fn info(&self) -> &PluginInfo {
        &self.info
    }

    async fn produce_catalog(&self, _client: &HostClient) -> SourceResult<LinkItemCollection> {
        Ok(self.catalog.clone())
    }

    async fn produce_freshness_time(&self, _client: &HostClient) -> SourceResult<DateTime<Utc>> {
        Ok(self.freshness)
    }
}

fn catalog_of(entries: &[(&str, &str, DateTime<Utc>)]) -> LinkItemCollection {
    entries
        .iter()
        .map(|(locator, name, time)| {
            (
                locator.to_string(),
                LinkItem::new(*name, *time).unwrap(),
            )
        })
        .collect()
}

/// A full run downloads what the server offers, isolates the item that keeps
/// failing, commits only verified files, and persists a save state the next
/// run resumes from.
#[tokio::test]
async fn test_full_run_is_incremental_across_failures() {
    let (addr, _) = spawn_stub_server(HashMap::from([(
        "/files/one".to_string(),
        (200, "payload one".to_string()),
    )]))
    .await;
    let host = host_for(addr);

    let dir = tempdir().unwrap();
    let settings = Settings::new(dir.path()).with_concurrency(2);
    settings.prepare().unwrap();

    let catalog = catalog_of(&[
        ("/files/one", "One", ts(2001, 1)),
        ("/files/missing", "Two", ts(2002, 2)),
    ]);

    // First run: "Two" is not on the server and exhausts its retries
    let source = StubSource::new(&host, catalog.clone(), ts(2003, 0));
    let mut plugin: Plugin =
        Plugin::new(Box::new(source), &settings, PluginOptions::default()).unwrap();
    let summary = plugin.run().await.unwrap();

    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 1);

    let committed = settings.download_dir.join("stub").join("One");
    assert_eq!(std::fs::read_to_string(&committed).unwrap(), "payload one");
    assert!(!settings.download_dir.join("stub").join("Two").exists());

    // Staging is cleaned up unconditionally
    assert!(!settings.temp_dir.join("stub").exists());

    // The save state records only the verified item
    let savestate_path = settings.savestate_dir.join("stub_save.json");
    let record: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&savestate_path).unwrap()).unwrap();
    assert_eq!(record["meta"]["version"], "1.0.0");
    assert_eq!(record["pluginInfo"]["name"], "stub");
    assert!(record["linkItems"]["/files/one"].is_object());
    assert!(record["linkItems"]["/files/missing"].is_null());
    assert_eq!(record["lastUpdate"], "20030101T000000.000000Z");

    // Second run: the server now carries the missing file as well
    let (addr, _) = spawn_stub_server(HashMap::from([
        ("/files/one".to_string(), (200, "payload one".to_string())),
        ("/files/missing".to_string(), (200, "payload two".to_string())),
    ]))
    .await;
    let host = host_for(addr);
    let source = StubSource::new(&host, catalog, ts(2004, 0));
    let mut plugin: Plugin =
        Plugin::new(Box::new(source), &settings, PluginOptions::default()).unwrap();
    let summary = plugin.run().await.unwrap();

    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 0);
    assert!(settings.download_dir.join("stub").join("Two").exists());

    let record: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&savestate_path).unwrap()).unwrap();
    assert!(record["linkItems"]["/files/one"].is_object());
    assert!(record["linkItems"]["/files/missing"].is_object());
    assert_eq!(record["lastUpdate"], "20040101T000000.000000Z");
}

/// Downloading the same target name three times never overwrites: the
/// collision suffix grows the name each time.
#[tokio::test]
async fn test_repeated_download_applies_collision_suffix() {
    let (addr, _) = spawn_stub_server(HashMap::from([(
        "/files/one".to_string(),
        (200, "payload".to_string()),
    )]))
    .await;

    let dir = tempdir().unwrap();
    let client = Arc::new(HostClient::new(&host_for(addr), &ClientConfig::default()).unwrap());
    let engine = DownloadEngine::new(client, EngineConfig::default());

    let items = catalog_of(&[("/files/one", "file", ts(2001, 1))]);
    for _ in 0..3 {
        engine.download(&items, dir.path(), "collisions", "item").await;
    }

    assert!(dir.path().join("file").is_file());
    assert!(dir.path().join("file_d").is_file());
    assert!(dir.path().join("file_d_d").is_file());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 3);
}

/// An empty collection performs zero network I/O
#[tokio::test]
async fn test_empty_download_touches_nothing() {
    let (addr, hits) = spawn_stub_server(HashMap::new()).await;

    let dir = tempdir().unwrap();
    let client = Arc::new(HostClient::new(&host_for(addr), &ClientConfig::default()).unwrap());
    let engine = DownloadEngine::new(client, EngineConfig::default());

    engine
        .download(&LinkItemCollection::new(), dir.path(), "nothing", "item")
        .await;

    assert_eq!(hits.load(Ordering::SeqCst), 0);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

/// Concurrent batches stay within the configured worker bound and all items
/// are attempted exactly once.
#[tokio::test]
async fn test_batch_attempts_every_item_once() {
    let routes: Routes = (0..12)
        .map(|i| (format!("/files/{i}"), (200, format!("payload {i}"))))
        .collect();
    let (addr, hits) = spawn_stub_server(routes).await;

    let dir = tempdir().unwrap();
    let client = Arc::new(HostClient::new(&host_for(addr), &ClientConfig::default()).unwrap());
    let engine = DownloadEngine::new(
        client,
        EngineConfig {
            concurrency: 3,
            ..Default::default()
        },
    );

    let items: LinkItemCollection = (0..12)
        .map(|i| {
            (
                format!("/files/{i}"),
                LinkItem::new(format!("file-{i}"), ts(2001, i)).unwrap(),
            )
        })
        .collect();

    engine.download(&items, dir.path(), "batch", "item").await;

    assert_eq!(hits.load(Ordering::SeqCst), 12);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 12);

    let (succeeded, failed) = engine.verify(&items, dir.path());
    assert_eq!(succeeded.len(), 12);
    assert!(failed.is_empty());
}
