//! Plugin orchestration
//!
//! A [`Plugin`] composes the save state, host client, and download engine
//! around a [`DataSource`] implementation. The engine only ever holds the
//! source as a trait object and never inspects the concrete type; the two
//! required capabilities are producing the current catalog and its freshness
//! time.
//!
//! A run stages the full fresh catalog into the plugin's temp directory,
//! verifies what actually arrived, merges only the verified items into the
//! save state, commits the files to the permanent download directory, and
//! persists the state. The staging directory is cleaned up unconditionally,
//! even when a later step failed.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::app::client::{ClientConfig, HostClient};
use crate::app::engine::{DownloadEngine, EngineConfig, ProgressSender};
use crate::app::models::{epoch, LinkItemCollection};
use crate::app::savestate::{savestate_file_name, Extension, NoExtension, SaveState};
use crate::config::Settings;
use crate::errors::{PluginError, PluginResult, SourceResult};

pub mod info;
pub mod options;
pub mod registry;

pub use info::PluginInfo;
pub use options::PluginOptions;
pub use registry::PluginRegistry;

/// Contract a data source has to fulfill
///
/// Both operations may perform arbitrary network and parsing work through
/// the provided client; failures surface as source errors and abort the
/// plugin run.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Identity of this data source
    fn info(&self) -> &PluginInfo;

    /// Produce the current remote catalog
    async fn produce_catalog(&self, client: &HostClient) -> SourceResult<LinkItemCollection>;

    /// Produce the newest update time of the referenced data
    async fn produce_freshness_time(&self, client: &HostClient) -> SourceResult<DateTime<Utc>>;
}

/// Outcome of a completed plugin run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Items verified on disk and committed
    pub succeeded: usize,
    /// Items attempted but not verified
    pub failed: usize,
}

/// Orchestrator for one data source
///
/// Generic over the save-state [`Extension`] so sources with extra persisted
/// fields round-trip them alongside the base record.
pub struct Plugin<E: Extension = NoExtension> {
    source: Box<dyn DataSource>,
    info: PluginInfo,
    options: PluginOptions,
    client: Arc<HostClient>,
    engine: DownloadEngine,
    temp_path: PathBuf,
    download_path: PathBuf,
    savestate_file: PathBuf,
    savestate: SaveState<E>,
    last_update: DateTime<Utc>,
    catalog: LinkItemCollection,
    unit: String,
}

impl<E: Extension> Plugin<E> {
    /// Create a plugin around a data source
    ///
    /// Creates the per-plugin temp and download directories and the shared
    /// savestate directory.
    ///
    /// # Errors
    ///
    /// Returns `PluginError::DirSetup` if the directories cannot be created
    /// (a permission failure here is fatal to the plugin), or a
    /// configuration error if the host client cannot be built.
    pub fn new(
        source: Box<dyn DataSource>,
        settings: &Settings,
        options: PluginOptions,
    ) -> PluginResult<Self> {
        let info = source.info().clone();

        let temp_path = settings.temp_dir.join(info.name());
        let download_path = settings.download_dir.join(info.name());
        let savestate_file = settings
            .savestate_dir
            .join(savestate_file_name(info.name()));

        for dir in [&temp_path, &download_path, &settings.savestate_dir] {
            std::fs::create_dir_all(dir).map_err(|source| PluginError::DirSetup {
                path: dir.clone(),
                source,
            })?;
        }

        let client = Arc::new(HostClient::new(info.host(), &ClientConfig::default())?);

        let engine_config = EngineConfig {
            concurrency: options.concurrency().unwrap_or(settings.concurrency),
            item_delay: options.delay(),
        };
        engine_config.validate()?;
        let engine = DownloadEngine::new(Arc::clone(&client), engine_config);

        let savestate = SaveState::new(info.clone());

        Ok(Self {
            source,
            info,
            options,
            client,
            engine,
            temp_path,
            download_path,
            savestate_file,
            savestate,
            last_update: epoch(),
            catalog: LinkItemCollection::new(),
            unit: "item".to_string(),
        })
    }

    /// Attach a progress side channel to the download engine
    pub fn with_progress(mut self, sender: ProgressSender) -> Self {
        self.engine = self.engine.with_progress(sender);
        self
    }

    /// Set the unit shown next to progress counters
    pub fn set_unit(&mut self, unit: impl Into<String>) {
        self.unit = unit.into();
    }

    /// Identity of the plugin
    pub fn info(&self) -> &PluginInfo {
        &self.info
    }

    /// Plugin name
    pub fn name(&self) -> &str {
        self.info.name()
    }

    /// Host the plugin downloads from
    pub fn host(&self) -> &str {
        self.info.host()
    }

    /// Parsed plugin options
    pub fn options(&self) -> &PluginOptions {
        &self.options
    }

    /// Host client of this run
    pub fn client(&self) -> &HostClient {
        &self.client
    }

    /// Current save state
    pub fn savestate(&self) -> &SaveState<E> {
        &self.savestate
    }

    /// Mutable save state, for sources maintaining extension fields
    pub fn savestate_mut(&mut self) -> &mut SaveState<E> {
        &mut self.savestate
    }

    /// Staging directory for in-progress downloads
    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Permanent download directory
    pub fn download_path(&self) -> &Path {
        &self.download_path
    }

    /// Save-state file of the plugin
    pub fn savestate_file(&self) -> &Path {
        &self.savestate_file
    }

    /// Freshness time fetched by the last catalog update
    pub fn last_update(&self) -> DateTime<Utc> {
        self.last_update
    }

    /// Catalog fetched by the last update
    pub fn catalog(&self) -> &LinkItemCollection {
        &self.catalog
    }

    /// Load the plugin's save state, or synthesize a fresh one
    ///
    /// # Errors
    ///
    /// Propagates malformed-state, version, and identity failures; the run
    /// must not proceed with a half-loaded state.
    pub fn load_savestate(&mut self) -> PluginResult<()> {
        self.savestate = SaveState::load_or_new(&self.savestate_file, &self.info)?;
        Ok(())
    }

    /// Refresh the catalog from the data source
    pub async fn update_catalog(&mut self) -> PluginResult<()> {
        self.catalog = self.source.produce_catalog(&self.client).await?;
        Ok(())
    }

    /// Refresh the freshness time from the data source
    pub async fn update_freshness(&mut self) -> PluginResult<()> {
        self.last_update = self.source.produce_freshness_time(&self.client).await?;
        Ok(())
    }

    /// Download a collection into a folder through the engine
    ///
    /// Usable aside of the normal run routine for source-specific fetches.
    pub async fn download(
        &self,
        items: &LinkItemCollection,
        folder: &Path,
        description: &str,
    ) {
        self.engine
            .download(items, folder, description, &self.unit)
            .await;
    }

    /// Partition a collection by on-disk presence in `folder`
    pub fn verify(
        &self,
        expected: &LinkItemCollection,
        folder: &Path,
    ) -> (LinkItemCollection, LinkItemCollection) {
        self.engine.verify(expected, folder)
    }

    /// Merge verified items into the save state
    pub fn update_savestate(&mut self, new_items: &LinkItemCollection) {
        self.savestate
            .update(self.info.clone(), self.last_update, new_items);
    }

    /// Persist the save state atomically
    pub fn save_savestate(&self) -> PluginResult<()> {
        self.savestate.store(&self.savestate_file)?;
        Ok(())
    }

    /// Execute a full incremental run
    ///
    /// The staging directory is cleaned up unconditionally, whether or not
    /// the run succeeded.
    pub async fn run(&mut self) -> PluginResult<RunSummary> {
        let result = self.run_inner().await;
        self.clean_up().await;
        result
    }

    async fn run_inner(&mut self) -> PluginResult<RunSummary> {
        self.load_savestate()?;

        self.update_catalog().await?;
        self.update_freshness().await?;
        info!(
            "{}: catalog holds {} {}, remote freshness {}",
            self.name(),
            self.catalog.len(),
            self.unit,
            self.last_update
        );

        // The full fresh catalog is staged rather than pre-filtered by
        // timestamp: a timestamp alone cannot guarantee the file is present.
        let description = format!("downloading {}", self.name());
        self.download(&self.catalog, &self.temp_path, &description)
            .await;

        let (succeeded, failed) = self.verify(&self.catalog, &self.temp_path);

        self.update_savestate(&succeeded);
        self.commit(&succeeded).await?;
        self.save_savestate()?;

        info!(
            "{}: run complete, {} succeeded, {} failed",
            self.name(),
            succeeded.len(),
            failed.len()
        );
        Ok(RunSummary {
            succeeded: succeeded.len(),
            failed: failed.len(),
        })
    }

    /// Move verified files from staging into the download directory
    async fn commit(&self, succeeded: &LinkItemCollection) -> PluginResult<()> {
        for (_, item) in succeeded.iter() {
            let staged = self.temp_path.join(item.name());
            let target = self.download_path.join(item.name());

            // Items sharing a target name are committed once
            if !staged.exists() {
                debug!("{} already committed", item.name());
                continue;
            }

            if target.exists() {
                tokio::fs::remove_file(&target)
                    .await
                    .map_err(|source| PluginError::Commit {
                        name: item.name().to_string(),
                        source,
                    })?;
            }
            tokio::fs::rename(&staged, &target)
                .await
                .map_err(|source| PluginError::Commit {
                    name: item.name().to_string(),
                    source,
                })?;
        }
        Ok(())
    }

    /// Delete the staging directory
    ///
    /// Failures are logged, not propagated; cleanup runs best-effort at the
    /// end of every run.
    pub async fn clean_up(&self) {
        match tokio::fs::remove_dir_all(&self.temp_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                "could not clean up staging directory {}: {}",
                self.temp_path.display(),
                e
            ),
        }
    }

    /// Delete everything related to the plugin: staging, downloads, save state
    ///
    /// Do not use unless you mean it.
    pub async fn delete_data(&self) {
        self.clean_up().await;
        for result in [
            tokio::fs::remove_dir_all(&self.download_path).await,
            tokio::fs::remove_file(&self.savestate_file).await,
        ] {
            match result {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("could not delete plugin data: {}", e),
            }
        }
    }
}

impl<E: Extension> PartialEq for Plugin<E> {
    fn eq(&self, other: &Self) -> bool {
        self.info == other.info
    }
}

impl<E: Extension> fmt::Debug for Plugin<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin")
            .field("info", &self.info)
            .field("options", &self.options)
            .field("temp_path", &self.temp_path)
            .field("download_path", &self.download_path)
            .field("savestate_file", &self.savestate_file)
            .field("last_update", &self.last_update)
            .field("unit", &self.unit)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::models::LinkItem;
    use chrono::TimeZone;
    use tempfile::tempdir;

    struct StubSource {
        info: PluginInfo,
    }

    impl StubSource {
        fn new() -> Self {
            Self {
                info: PluginInfo::new("stub", "0.1.0", "example.com").unwrap(),
            }
        }
    }

    #[async_trait]
    impl DataSource for StubSource {
        fn info(&self) -> &PluginInfo {
            &self.info
        }

        async fn produce_catalog(
            &self,
            _client: &HostClient,
        ) -> SourceResult<LinkItemCollection> {
            let mut items = LinkItemCollection::new();
            items.insert(
                "/archive/readme",
                LinkItem::new("One", Utc.with_ymd_and_hms(2001, 1, 1, 1, 1, 1).unwrap())
                    .unwrap(),
            );
            Ok(items)
        }

        async fn produce_freshness_time(
            &self,
            _client: &HostClient,
        ) -> SourceResult<DateTime<Utc>> {
            Ok(Utc.with_ymd_and_hms(1999, 9, 9, 9, 9, 9).unwrap())
        }
    }

    fn plugin_in(dir: &Path) -> Plugin {
        let settings = Settings::new(dir);
        Plugin::new(
            Box::new(StubSource::new()),
            &settings,
            PluginOptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_new_creates_plugin_directories() {
        let dir = tempdir().unwrap();
        let plugin = plugin_in(dir.path());

        assert!(plugin.temp_path().is_dir());
        assert!(plugin.download_path().is_dir());
        assert!(plugin.savestate_file().parent().unwrap().is_dir());
        assert_eq!(plugin.name(), "stub");
        assert_eq!(plugin.host(), "example.com");
        assert_eq!(plugin.last_update(), epoch());
        assert!(plugin.catalog().is_empty());
    }

    #[test]
    fn test_concurrency_option_overrides_settings() {
        let dir = tempdir().unwrap();
        let settings = Settings::new(dir.path());
        let options = PluginOptions::parse(&["delay=0", "concurrency=2"]);
        let plugin: Plugin =
            Plugin::new(Box::new(StubSource::new()), &settings, options).unwrap();
        assert_eq!(plugin.engine.config().concurrency, 2);
    }

    #[tokio::test]
    async fn test_catalog_and_freshness_updates() {
        let dir = tempdir().unwrap();
        let mut plugin = plugin_in(dir.path());

        plugin.update_catalog().await.unwrap();
        plugin.update_freshness().await.unwrap();

        assert_eq!(plugin.catalog().len(), 1);
        assert_eq!(
            plugin.last_update(),
            Utc.with_ymd_and_hms(1999, 9, 9, 9, 9, 9).unwrap()
        );
    }

    #[tokio::test]
    async fn test_savestate_round_trip_through_plugin() {
        let dir = tempdir().unwrap();
        let mut plugin = plugin_in(dir.path());
        plugin.update_catalog().await.unwrap();
        plugin.update_freshness().await.unwrap();

        let catalog = plugin.catalog().clone();
        plugin.update_savestate(&catalog);
        plugin.save_savestate().unwrap();

        let mut reloaded = plugin_in(dir.path());
        reloaded.load_savestate().unwrap();
        assert_eq!(reloaded.savestate(), plugin.savestate());
        assert_eq!(reloaded.savestate().link_items().len(), 1);
    }

    #[tokio::test]
    async fn test_clean_up_removes_staging() {
        let dir = tempdir().unwrap();
        let plugin = plugin_in(dir.path());
        std::fs::write(plugin.temp_path().join("leftover"), "x").unwrap();

        plugin.clean_up().await;
        assert!(!plugin.temp_path().exists());

        // A second clean up on the missing directory is silent
        plugin.clean_up().await;
    }

    #[tokio::test]
    async fn test_delete_data_removes_everything() {
        let dir = tempdir().unwrap();
        let plugin = plugin_in(dir.path());
        std::fs::write(plugin.download_path().join("kept"), "x").unwrap();
        plugin.save_savestate().unwrap();

        plugin.delete_data().await;
        assert!(!plugin.temp_path().exists());
        assert!(!plugin.download_path().exists());
        assert!(!plugin.savestate_file().exists());
    }

    #[test]
    fn test_plugin_equality_follows_identity() {
        let dir = tempdir().unwrap();
        let a = plugin_in(dir.path());
        let b = plugin_in(dir.path());
        assert_eq!(a, b);
    }
}
