//! Error types for delta_fetcher
//!
//! This module defines the error taxonomy for all components of the
//! application. Item-level download failures stay local to the engine and
//! are logged rather than propagated; state-level and identity-level
//! failures bubble up to the process boundary with actionable messages.

use std::path::PathBuf;

use semver::Version;
use thiserror::Error;

/// Construction-time validation errors for core data types
#[derive(Error, Debug)]
pub enum ModelError {
    /// A required string field was empty
    #[error("{field} cannot be empty")]
    EmptyField { field: &'static str },

    /// A version string failed semantic-version parsing
    #[error("'{value}' is not a valid semantic version")]
    InvalidVersion {
        value: String,
        #[source]
        source: semver::Error,
    },

    /// A timestamp string did not match the compact timestamp format
    #[error("'{value}' is not a valid compact timestamp")]
    InvalidTimestamp { value: String },
}

/// Save-state persistence and versioning errors
#[derive(Error, Debug)]
pub enum SaveStateError {
    /// Unparseable record or missing required keys
    #[error("malformed save state {path}: {reason}. Fix or delete this file (data may be lost)")]
    Malformed { path: PathBuf, reason: String },

    /// Persisted format version the engine does not understand
    #[error(
        "save state format {found} is not supported (engine supports {supported}); \
         handling for a different version is not implemented"
    )]
    UnsupportedVersion { found: Version, supported: Version },

    /// Loaded save state belongs to another plugin
    #[error("save state plugin '{found}' does not match the current plugin '{current}'")]
    PluginMismatch { found: String, current: String },

    /// I/O error reading or writing the save-state file
    #[error("save state I/O error")]
    Io(#[from] std::io::Error),
}

/// Download and HTTP transport errors
#[derive(Error, Debug)]
pub enum DownloadError {
    /// HTTP request error
    #[error("HTTP request failed")]
    Http(#[from] reqwest::Error),

    /// Server returned a non-success status
    #[error("server responded with HTTP {status} for {url}")]
    ServerStatus { status: u16, url: String },

    /// A locator could not be resolved against the host base URL
    #[error("invalid download URL: {url}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// I/O error during file operations
    #[error("file I/O error")]
    Io(#[from] std::io::Error),

    /// Maximum retries exceeded for a single item
    #[error("maximum retry attempts ({max_retries}) exceeded for {url}")]
    MaxRetriesExceeded { max_retries: u32, url: String },
}

/// Failures reported by a data-source implementation
#[derive(Error, Debug)]
pub enum SourceError {
    /// The source's own network traffic failed
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// The remote catalog could not be interpreted
    #[error("could not parse remote catalog: {reason}")]
    Parse { reason: String },

    /// The source is unable to produce data for another reason
    #[error("data source unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid configuration file format
    #[error("invalid configuration format")]
    InvalidFormat(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("invalid configuration value for {field}: {value}. {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    /// HTTP client could not be constructed from the configuration
    #[error("HTTP client construction failed")]
    HttpClient(#[from] reqwest::Error),

    /// I/O error reading configuration or preparing directories
    #[error("configuration I/O error")]
    Io(#[from] std::io::Error),
}

/// Plugin-level errors; any of these means the plugin cannot work further
#[derive(Error, Debug)]
pub enum PluginError {
    /// Default plugin directories could not be created
    #[error("cannot create plugin directories under {path}")]
    DirSetup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Save-state error
    #[error(transparent)]
    SaveState(#[from] SaveStateError),

    /// Data-source error
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Download error outside the per-item isolation boundary
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// Validation error
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// I/O error while committing verified downloads
    #[error("could not commit {name} to the download directory")]
    Commit {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Validation error
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Save-state error
    #[error(transparent)]
    SaveState(#[from] SaveStateError),

    /// Download error
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// Data-source error
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Plugin error
    #[error(transparent)]
    Plugin(#[from] PluginError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Generic I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic application error with context
    #[error("{message}")]
    Generic { message: String },
}

impl AppError {
    /// Create a generic application error with a message
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Model(_) => "validation",
            AppError::SaveState(_) => "savestate",
            AppError::Download(_) => "download",
            AppError::Source(_) => "source",
            AppError::Plugin(_) => "plugin",
            AppError::Config(_) => "config",
            AppError::Io(_) => "io",
            AppError::Generic { .. } => "generic",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Validation result type alias
pub type ModelResult<T> = std::result::Result<T, ModelError>;

/// Save-state result type alias
pub type SaveStateResult<T> = std::result::Result<T, SaveStateError>;

/// Download result type alias
pub type DownloadResult<T> = std::result::Result<T, DownloadError>;

/// Data-source result type alias
pub type SourceResult<T> = std::result::Result<T, SourceError>;

/// Configuration result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Plugin result type alias
pub type PluginResult<T> = std::result::Result<T, PluginError>;
