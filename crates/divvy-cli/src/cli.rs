//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI
//! arguments. The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Divvy - Rule-based shared expense categorization
#[derive(Parser)]
#[command(name = "divvy")]
#[command(about = "Expense splitting rule engine", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "divvy.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Re-run active rules over a household's non-overridden transactions
    Recategorize {
        /// Household to recategorize
        #[arg(long)]
        household: i64,
    },

    /// List a household's splitting rules
    Rules {
        /// Household whose rules to list
        #[arg(long)]
        household: i64,

        /// Include deactivated rules
        #[arg(long)]
        all: bool,
    },
}
