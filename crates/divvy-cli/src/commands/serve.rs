//! Server command implementation

use std::path::Path;

use anyhow::Result;

use super::open_db;

pub async fn cmd_serve(db_path: &Path, host: &str, port: u16) -> Result<()> {
    println!("🚀 Starting Divvy web server...");
    println!("   Database: {}", db_path.display());
    println!("   Listening: http://{}:{}", host, port);

    // Allowed CORS origins from environment (comma-separated)
    let allowed_origins: Vec<String> = std::env::var("DIVVY_ALLOWED_ORIGINS")
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if !allowed_origins.is_empty() {
        println!(
            "   🌐 CORS origins: {} (DIVVY_ALLOWED_ORIGINS)",
            allowed_origins.join(", ")
        );
    }

    println!();
    println!("   Press Ctrl+C to stop");

    let db = open_db(db_path)?;

    let config = divvy_server::ServerConfig { allowed_origins };

    divvy_server::serve(db, host, port, config).await?;

    Ok(())
}
