//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Core commands (init) and shared utilities (open_db)
//! - `recategorize` - Batch re-categorization command
//! - `rules` - Rule listing command
//! - `serve` - Web server command

pub mod core;
pub mod recategorize;
pub mod rules;
pub mod serve;

// Re-export command functions for main.rs
pub use core::*;
pub use recategorize::*;
pub use rules::*;
pub use serve::*;

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        format!("{}...", &s[..max.saturating_sub(3)])
    }
}
