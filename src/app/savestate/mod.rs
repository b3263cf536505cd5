//! Versioned save states
//!
//! A [`SaveState`] is the durable record of what a plugin has fetched and
//! when, enabling incremental resumption across runs. The persisted form is
//! a single UTF-8 JSON document carrying a format-version tag, the plugin
//! identity, the last-known update time, and the link-item map. Loading runs
//! a format-upgrade step and a plugin-identity check before any state is
//! adopted; a broken or foreign record never half-populates the engine.

use std::fmt;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use semver::Version;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::app::models::{compact_time, epoch, truncate_to_micros, LinkItemCollection};
use crate::app::plugin::PluginInfo;
use crate::constants::savestate::FILE_SUFFIX;
use crate::errors::{SaveStateError, SaveStateResult};

mod upgrade;

pub use upgrade::current_format_version;

/// Plugin-specific fields carried alongside the base save-state record
///
/// Extension fields are flattened into the same top-level JSON document and
/// must round-trip together with the base fields. The blanket implementation
/// covers any suitable serde type; [`NoExtension`] is the default for
/// plugins without extra state.
pub trait Extension:
    Serialize + DeserializeOwned + Default + Clone + PartialEq + fmt::Debug + Send
{
}

impl<T> Extension for T where
    T: Serialize + DeserializeOwned + Default + Clone + PartialEq + fmt::Debug + Send
{
}

/// Default extension carrying no additional fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoExtension {}

/// Format metadata of the persisted record
///
/// The version tag describes the save-state format itself and is independent
/// of the owning plugin's version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    version: Version,
}

/// Versioned snapshot of a plugin's fetched data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(bound(serialize = "E: Extension", deserialize = "E: Extension"))]
pub struct SaveState<E: Extension = NoExtension> {
    meta: Meta,
    plugin_info: PluginInfo,
    #[serde(with = "compact_time")]
    last_update: DateTime<Utc>,
    link_items: LinkItemCollection,
    #[serde(flatten)]
    extension: E,
}

/// File name of a plugin's save state under the savestate root
pub fn savestate_file_name(plugin_name: &str) -> String {
    format!("{plugin_name}{FILE_SUFFIX}")
}

impl<E: Extension> SaveState<E> {
    /// Create a fresh first-run state: empty collection, epoch update time
    pub fn new(plugin_info: PluginInfo) -> Self {
        Self::with_extension(plugin_info, E::default())
    }

    /// Create a fresh state with explicit extension data
    pub fn with_extension(plugin_info: PluginInfo, extension: E) -> Self {
        Self {
            meta: Meta {
                version: current_format_version(),
            },
            plugin_info,
            last_update: epoch(),
            link_items: LinkItemCollection::new(),
            extension,
        }
    }

    /// Format version the record was persisted with
    pub fn format_version(&self) -> &Version {
        &self.meta.version
    }

    /// Identity of the plugin owning this state
    pub fn plugin_info(&self) -> &PluginInfo {
        &self.plugin_info
    }

    /// Update time of the referenced data as of the last completed run
    pub fn last_update(&self) -> DateTime<Utc> {
        self.last_update
    }

    /// Fetched link items
    pub fn link_items(&self) -> &LinkItemCollection {
        &self.link_items
    }

    /// Plugin-specific extension fields
    pub fn extension(&self) -> &E {
        &self.extension
    }

    /// Mutable access to the extension fields
    pub fn extension_mut(&mut self) -> &mut E {
        &mut self.extension
    }

    /// Merge the result of a run into the state
    ///
    /// Refreshes the plugin identity and update time and merges `new_items`
    /// through the collection's `actualize` operation. Only the single
    /// orchestrating caller mutates the state; downloads never touch it.
    pub fn update(
        &mut self,
        plugin_info: PluginInfo,
        last_update: DateTime<Utc>,
        new_items: &LinkItemCollection,
    ) {
        self.plugin_info = plugin_info;
        self.last_update = truncate_to_micros(last_update);
        self.link_items.actualize(new_items);
    }

    /// Load a persisted state, or synthesize a fresh one if none exists
    ///
    /// An absent file signals a first run and is not an error. A present
    /// file must parse, pass the format-upgrade step, and belong to
    /// `current` before it is adopted.
    ///
    /// # Errors
    ///
    /// - `SaveStateError::Malformed` if the file is not valid JSON or lacks
    ///   required keys
    /// - `SaveStateError::UnsupportedVersion` if the declared format version
    ///   is unknown to this engine
    /// - `SaveStateError::PluginMismatch` if the record belongs to another
    ///   plugin
    pub fn load_or_new(path: &Path, current: &PluginInfo) -> SaveStateResult<Self> {
        if !path.exists() {
            info!("no save state file found, starting fresh");
            return Ok(Self::new(current.clone()));
        }

        let raw = std::fs::read_to_string(path)?;
        let record: serde_json::Value =
            serde_json::from_str(&raw).map_err(|e| SaveStateError::Malformed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let record = upgrade::upgrade_record(record, path)?;

        let state: Self =
            serde_json::from_value(record).map_err(|e| SaveStateError::Malformed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        if state.plugin_info.name() != current.name() {
            return Err(SaveStateError::PluginMismatch {
                found: state.plugin_info.name().to_string(),
                current: current.name().to_string(),
            });
        }

        debug!(
            "loaded save state with {} items, last update {}",
            state.link_items.len(),
            state.last_update
        );
        Ok(state)
    }

    /// Persist the state atomically
    ///
    /// Writes to a temporary file next to the target and renames it into
    /// place, so an interrupted run never leaves a truncated record behind.
    pub fn store(&self, path: &Path) -> SaveStateResult<()> {
        let payload = serde_json::to_string(self).map_err(|e| SaveStateError::Malformed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        let mut temp = NamedTempFile::new_in(parent)?;
        temp.write_all(payload.as_bytes())?;
        temp.flush()?;
        temp.persist(path).map_err(|e| SaveStateError::Io(e.error))?;

        debug!("persisted save state to {}", path.display());
        Ok(())
    }
}
