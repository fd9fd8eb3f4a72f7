//! Divvy CLI - Expense splitting rule engine
//!
//! Usage:
//!   divvy init                      Initialize database
//!   divvy serve --port 3000         Start web server
//!   divvy recategorize --household 1  Re-run rules over a household
//!   divvy rules --household 1       List a household's rules

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db),
        Commands::Serve { port, host } => commands::cmd_serve(&cli.db, &host, port).await,
        Commands::Recategorize { household } => {
            commands::cmd_recategorize(&cli.db, household).await
        }
        Commands::Rules { household, all } => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_rules_list(&db, household, all)
        }
    }
}
