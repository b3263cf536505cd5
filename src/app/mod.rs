//! Core application logic for delta_fetcher
//!
//! This module contains the reconciliation data model, the versioned
//! save-state persistence, the bounded-concurrency download engine, and the
//! plugin orchestration that composes them into incremental runs.
//!
//! # Examples
//!
//! ```rust,no_run
//! use delta_fetcher::app::{Plugin, PluginOptions, PluginRegistry};
//! use delta_fetcher::config::Settings;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = Settings::new("./");
//! settings.prepare()?;
//!
//! let registry = PluginRegistry::with_builtin_sources();
//! let source = registry.create("demo").expect("demo source is built in");
//!
//! let mut plugin: Plugin = Plugin::new(source, &settings, PluginOptions::default())?;
//! let summary = plugin.run().await?;
//! println!("{} fetched, {} failed", summary.succeeded, summary.failed);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod engine;
pub mod models;
pub mod plugin;
pub mod savestate;
pub mod sources;

// Re-export main public API
pub use client::{ClientConfig, HostClient};
pub use engine::{
    default_concurrency, progress_channel, DownloadEngine, EngineConfig, ProgressEvent,
    ProgressReceiver, ProgressSender,
};
pub use models::{LinkItem, LinkItemCollection};
pub use plugin::{
    DataSource, Plugin, PluginInfo, PluginOptions, PluginRegistry, RunSummary,
};
pub use savestate::{current_format_version, Extension, NoExtension, SaveState};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_structure() {
        // Ensure the public API is accessible
        let config = ClientConfig::default();
        assert!(config.tcp_nodelay);
        assert!(EngineConfig::default().concurrency >= 1);
    }
}
