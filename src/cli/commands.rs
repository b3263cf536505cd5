//! Command handlers for the delta_fetcher CLI
//!
//! This module wires settings, the plugin registry, and the progress display
//! together and drives the actual plugin runs. Per-plugin failures are
//! logged and counted; the process exits non-zero when any plugin failed.

use tracing::{error, info};

use crate::app::engine::{progress_channel, ProgressSender};
use crate::app::{DataSource, Plugin, PluginOptions, PluginRegistry, RunSummary};
use crate::cli::args::{DeleteArgs, GlobalArgs, RunArgs};
use crate::cli::progress::{progress_enabled, ProgressDisplay};
use crate::config::{Settings, SettingsFile};
use crate::errors::{AppError, PluginResult, Result};

/// Resolve runtime settings from the config file and CLI overrides
fn resolve_settings(global: &GlobalArgs, args: &RunArgs) -> Result<Settings> {
    let mut settings =
        SettingsFile::load_or_default(global.config.as_deref())?.into_settings();

    if let Some(main_dir) = &global.main_dir {
        settings = Settings::new(main_dir).with_concurrency(settings.concurrency);
    }
    if let Some(concurrency) = args.concurrency {
        settings.concurrency = concurrency;
    }
    if args.no_progress {
        settings.disable_progress = true;
    }

    Ok(settings)
}

/// Handle the run command
pub async fn handle_run(global: &GlobalArgs, args: RunArgs) -> Result<()> {
    let settings = resolve_settings(global, &args)?;
    settings.prepare()?;

    let registry = PluginRegistry::with_builtin_sources();
    let options = PluginOptions::parse(&args.options);
    let show_progress = progress_enabled(settings.disable_progress);

    let mut failures = 0usize;
    for name in &args.plugins {
        let Some(source) = registry.create(name) else {
            error!("plugin '{}' is not registered", name);
            failures += 1;
            continue;
        };

        info!("running plugin '{}'", name);
        let (tx, rx) = progress_channel();
        let display = ProgressDisplay::spawn(rx, show_progress);

        let outcome = run_plugin(source, &settings, options.clone(), tx).await;
        display.join().await;

        match outcome {
            Ok(summary) => {
                println!(
                    "{}: {} fetched, {} failed",
                    name, summary.succeeded, summary.failed
                );
            }
            Err(e) => {
                error!("plugin '{}' failed: {}", name, e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        return Err(AppError::generic(format!(
            "{failures} of {} plugin run(s) failed",
            args.plugins.len()
        )));
    }
    Ok(())
}

/// Run one plugin with the progress sender attached
async fn run_plugin(
    source: Box<dyn DataSource>,
    settings: &Settings,
    options: PluginOptions,
    sender: ProgressSender,
) -> PluginResult<RunSummary> {
    let plugin: Plugin = Plugin::new(source, settings, options)?;
    let mut plugin = plugin.with_progress(sender);
    plugin.run().await
}

/// Handle the list command
pub fn handle_list() -> Result<()> {
    let registry = PluginRegistry::with_builtin_sources();
    for name in registry.names() {
        println!("{name}");
    }
    Ok(())
}

/// Handle the delete command
pub async fn handle_delete(global: &GlobalArgs, args: DeleteArgs) -> Result<()> {
    let run_args = RunArgs {
        plugins: vec![args.plugin.clone()],
        options: Vec::new(),
        concurrency: None,
        no_progress: true,
    };
    let settings = resolve_settings(global, &run_args)?;

    let registry = PluginRegistry::with_builtin_sources();
    let source = registry
        .create(&args.plugin)
        .ok_or_else(|| AppError::generic(format!("plugin '{}' is not registered", args.plugin)))?;

    let plugin: Plugin = Plugin::new(source, &settings, PluginOptions::default())?;
    plugin.delete_data().await;
    println!("{}: downloads and save state removed", args.plugin);
    Ok(())
}
