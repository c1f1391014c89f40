//! Gemstock CLI - Database migrations and operator tools.
//!
//! # Usage
//!
//! ```bash
//! # Create or update the stone table
//! gs-cli migrate
//!
//! # Run one full sync without the HTTP service
//! gs-cli sync
//! gs-cli sync --json
//!
//! # Show how many stones are loaded and when
//! gs-cli stats
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `sync` - Fetch the stock export and replace the stone table
//! - `stats` - Print an inventory overview

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "gs-cli")]
#[command(author, version, about = "Gemstock CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Run one full sync and print the outcome
    Sync {
        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print stone count and last sync time
    Stats {
        /// Print the overview as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    // .env may set RUST_LOG, so load it before the filter is built
    let _ = dotenvy::dotenv();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "gemstock_sync=info,gs_cli=info".into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Sync { json } => commands::sync::run(json).await?,
        Commands::Stats { json } => commands::stats::run(json).await?,
    }
    Ok(())
}
