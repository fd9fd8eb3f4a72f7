//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `cmd_init` - Initialize the database

use std::path::Path;

use anyhow::{Context, Result};
use divvy_core::db::Database;

/// Open the database, running migrations if needed
pub fn open_db(db_path: &Path) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .context("Database path must be valid UTF-8")?;
    Database::new(path_str).context("Failed to open database")
}

pub fn cmd_init(db_path: &Path) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    open_db(db_path)?;

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Start the API: divvy serve");
    println!("  2. Create a household and its splitting rules via the API");

    Ok(())
}
