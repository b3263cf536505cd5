//! Prelude module for the delta_fetcher library
//!
//! Re-exports the most commonly used items so typical integrations need a
//! single `use delta_fetcher::prelude::*;` statement.
//!
//! # Usage
//!
//! ```rust,no_run
//! use delta_fetcher::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let settings = Settings::new("./");
//!     settings.prepare()?;
//!
//!     let registry = PluginRegistry::with_builtin_sources();
//!     let source = registry
//!         .create("demo")
//!         .ok_or_else(|| AppError::generic("demo source missing"))?;
//!
//!     let mut plugin: Plugin = Plugin::new(source, &settings, PluginOptions::default())?;
//!     plugin.run().await?;
//!     Ok(())
//! }
//! ```

// Core result types
pub use crate::errors::{AppError, Result};

// Essential app components used in most integrations
pub use crate::app::{
    DataSource, DownloadEngine, EngineConfig, HostClient, LinkItem, LinkItemCollection, Plugin,
    PluginInfo, PluginOptions, PluginRegistry, RunSummary, SaveState,
};

// Configuration
pub use crate::config::{Settings, SettingsFile};

// Commonly used constants
pub use crate::constants::{COLLISION_SUFFIX, MAX_RETRIES, SAVESTATE_FILE_SUFFIX, USER_AGENT};

// Standard library re-exports that are commonly needed
pub use std::path::{Path, PathBuf};
pub use std::sync::Arc;
