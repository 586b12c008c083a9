//! Keystone CLI - install and update the Keystone runtime bundle
//!
//! This is the main entry point for the Keystone command-line interface.

mod cli;
mod commands;
mod output;
mod version;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Must run before any TLS operation
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.quiet);

    let config = cli.config.as_deref();
    match cli.command {
        Commands::Install(args) => commands::install::run(args, config).await,
        Commands::Status(args) => commands::status::run(args, config),
        Commands::Clean(args) => commands::clean::run(args, config).await,
        Commands::Config(args) => commands::config::run(args, config),
        Commands::Version(args) => commands::version::run(args),
    }
}

/// Initialize tracing with appropriate verbosity
fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            // Progress is rendered separately, so keep logs to warnings by default
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}
