//! davsnap - periodic snapshots of a data directory to a WebDAV server
//!
//! This is the main entry point for the davsnap command-line interface.

mod cli;
mod commands;
mod output;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize rustls crypto provider (required for rustls 0.23+)
    // This must be done before any TLS operations
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Upload(args) => commands::upload::run(args, cli.config.as_deref()).await,
        Commands::Restore(args) => commands::restore::run(args, cli.config.as_deref()).await,
        Commands::Daemon(args) => commands::daemon::run(args, cli.config.as_deref()).await,
    }
}

/// Initialize tracing with appropriate verbosity
///
/// `RUST_LOG`, when set, replaces the level chosen by the flags.
fn init_tracing(verbose: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if quiet {
            EnvFilter::new("error")
        } else {
            match verbose {
                0 => EnvFilter::new("info"),
                1 => EnvFilter::new("debug"),
                _ => EnvFilter::new("trace"),
            }
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();
}
