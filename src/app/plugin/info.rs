//! Plugin identity descriptor
//!
//! A [`PluginInfo`] names a data source, carries its semantic version, and
//! records the host it downloads from. All three fields are validated at
//! construction and the value is immutable afterwards.

use std::fmt;

use semver::Version;
use serde::{Deserialize, Serialize};

use crate::errors::{ModelError, ModelResult};

/// Identity and version descriptor of a data source
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "PluginInfoRecord", into = "PluginInfoRecord")]
pub struct PluginInfo {
    name: String,
    version: Version,
    host: String,
}

impl PluginInfo {
    /// Create a new plugin descriptor
    ///
    /// # Errors
    ///
    /// Returns `ModelError::EmptyField` if the name or host is empty, or
    /// `ModelError::InvalidVersion` if the version string fails
    /// semantic-version parsing.
    pub fn new(
        name: impl Into<String>,
        version: &str,
        host: impl Into<String>,
    ) -> ModelResult<Self> {
        let version = Version::parse(version).map_err(|source| ModelError::InvalidVersion {
            value: version.to_string(),
            source,
        })?;
        Self::with_version(name, version, host)
    }

    /// Create a new plugin descriptor from an already-parsed version
    pub fn with_version(
        name: impl Into<String>,
        version: Version,
        host: impl Into<String>,
    ) -> ModelResult<Self> {
        let name = name.into();
        let host = host.into();
        if name.is_empty() {
            return Err(ModelError::EmptyField {
                field: "plugin name",
            });
        }
        if host.is_empty() {
            return Err(ModelError::EmptyField {
                field: "plugin host",
            });
        }
        Ok(Self {
            name,
            version,
            host,
        })
    }

    /// Plugin name, used for save-state identity checks and directory names
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Plugin version
    pub fn version(&self) -> &Version {
        &self.version
    }

    /// Remote host the plugin downloads from
    pub fn host(&self) -> &str {
        &self.host
    }
}

impl fmt::Display for PluginInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {} : {}", self.name, self.version, self.host)
    }
}

/// Wire representation of a [`PluginInfo`]
#[derive(Serialize, Deserialize)]
struct PluginInfoRecord {
    name: String,
    version: Version,
    host: String,
}

impl TryFrom<PluginInfoRecord> for PluginInfo {
    type Error = ModelError;

    fn try_from(record: PluginInfoRecord) -> ModelResult<Self> {
        PluginInfo::with_version(record.name, record.version, record.host)
    }
}

impl From<PluginInfo> for PluginInfoRecord {
    fn from(info: PluginInfo) -> Self {
        Self {
            name: info.name,
            version: info.version,
            host: info.host,
        }
    }
}
