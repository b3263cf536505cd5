//! Command-line interface components
//!
//! This module contains CLI-specific code for the delta_fetcher application,
//! including argument parsing, progress display, and command handlers.

pub mod args;
pub mod commands;
pub mod progress;

pub use args::{Cli, Commands, DeleteArgs, GlobalArgs, RunArgs};
pub use commands::{handle_delete, handle_list, handle_run};
pub use progress::{progress_enabled, ProgressDisplay};
