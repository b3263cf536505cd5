//! delta_fetcher CLI application
//!
//! Command-line interface for incremental downloads through pluggable data
//! sources, with concurrent fetching, progress tracking, and durable save
//! states.

use std::process;

use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use delta_fetcher::cli::{handle_delete, handle_list, handle_run, Cli, Commands};
use delta_fetcher::errors::Result;

#[tokio::main]
async fn main() {
    let result = run().await;

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

/// Main application logic
async fn run() -> Result<()> {
    let cli = Cli::parse_args();

    init_logging(&cli);

    info!("delta_fetcher v{} starting", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Run(args) => {
            info!("executing run command");
            handle_run(&cli.global, args).await
        }
        Commands::List => handle_list(),
        Commands::Delete(args) => {
            info!("executing delete command");
            handle_delete(&cli.global, args).await
        }
    }
}

/// Initialize logging based on CLI verbosity settings
fn init_logging(cli: &Cli) {
    let log_level = cli.log_level();

    let filter = EnvFilter::from_default_env().add_directive(
        format!("delta_fetcher={log_level}")
            .parse()
            .expect("static logging directive should parse"),
    );

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
