//! Command-line argument parsing for delta_fetcher
//!
//! This module defines the CLI structure using clap derive macros, covering
//! incremental plugin runs, plugin listing, and data removal.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// delta_fetcher - incremental downloads through pluggable sources
#[derive(Parser, Debug)]
#[command(
    name = "delta_fetcher",
    version,
    about = "Incremental download manager with pluggable data sources",
    long_about = "Fetches only what changed since the last run: each plugin's catalog is \
diffed against its persisted save state, downloads run concurrently into a staging area, \
and verified files are committed and recorded for the next run."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all subcommands
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Very verbose logging (debug level)
    #[arg(long, global = true)]
    pub very_verbose: bool,

    /// Main directory where all files are created
    #[arg(short, long, global = true, value_name = "DIR")]
    pub main_dir: Option<PathBuf>,

    /// Configuration file path
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one or more plugins incrementally
    Run(RunArgs),

    /// List the registered plugins
    List,

    /// Delete a plugin's downloads and save state
    Delete(DeleteArgs),
}

/// Arguments for the run command
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Plugins to run, by registered name
    #[arg(short, long = "plugin", value_name = "NAME", required = true)]
    pub plugins: Vec<String>,

    /// Plugin options as key=value pairs, applied to every plugin in this run
    #[arg(short, long = "option", value_name = "KEY=VALUE")]
    pub options: Vec<String>,

    /// Override the download concurrency for this run
    #[arg(short = 'w', long, value_name = "COUNT")]
    pub concurrency: Option<usize>,

    /// Disable the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

/// Arguments for the delete command
#[derive(Args, Debug, Clone)]
pub struct DeleteArgs {
    /// Plugin whose data should be removed
    #[arg(short, long = "plugin", value_name = "NAME")]
    pub plugin: String,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Logging level derived from the verbosity flags
    pub fn log_level(&self) -> &'static str {
        if self.global.very_verbose {
            "debug"
        } else if self.global.verbose {
            "info"
        } else {
            "warn"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_structure_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_arguments() {
        let cli = Cli::try_parse_from([
            "delta_fetcher",
            "run",
            "-p",
            "demo",
            "-o",
            "delay=1.5",
            "-w",
            "2",
        ])
        .unwrap();

        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.plugins, vec!["demo"]);
                assert_eq!(args.options, vec!["delay=1.5"]);
                assert_eq!(args.concurrency, Some(2));
                assert!(!args.no_progress);
            }
            other => panic!("expected run command, got {:?}", other),
        }
    }

    #[test]
    fn test_run_requires_a_plugin() {
        assert!(Cli::try_parse_from(["delta_fetcher", "run"]).is_err());
    }

    #[test]
    fn test_log_level_from_verbosity() {
        let cli = Cli::try_parse_from(["delta_fetcher", "list"]).unwrap();
        assert_eq!(cli.log_level(), "warn");

        let cli = Cli::try_parse_from(["delta_fetcher", "-v", "list"]).unwrap();
        assert_eq!(cli.log_level(), "info");

        let cli = Cli::try_parse_from(["delta_fetcher", "--very-verbose", "list"]).unwrap();
        assert_eq!(cli.log_level(), "debug");
    }
}
