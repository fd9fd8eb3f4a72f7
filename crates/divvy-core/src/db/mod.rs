//! Database access layer with connection pooling and migrations
//!
//! This module is organized by domain:
//! - `households` - Household and membership operations
//! - `accounts` - Bank account operations
//! - `rules` - Splitting rule CRUD and ordered listings
//! - `transactions` - Transaction reads and categorization writes
//! - `overrides` - Atomic manual overrides plus their audit trail
//! - `feedback` - Append-only rule feedback records

use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use tracing::info;

use crate::error::Result;

mod accounts;
mod feedback;
mod households;
mod overrides;
mod rules;
mod transactions;

pub use transactions::UncategorizedFilter;


pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Parse a SQLite datetime string into a DateTime<Utc>
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    // SQLite stores as "YYYY-MM-DD HH:MM:SS" format
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.and_utc())
        .unwrap_or_else(|_| Utc::now())
}

/// Parse a SQLite date string ("YYYY-MM-DD") into a NaiveDate
pub(crate) fn parse_date(s: &str) -> chrono::NaiveDate {
    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .unwrap_or_else(|_| chrono::NaiveDate::from_ymd_opt(1970, 1, 1).unwrap())
}

/// Database wrapper with connection pooling
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    /// Path to the database file
    db_path: String,
}

impl Database {
    /// Create a new database connection pool and run migrations.
    pub fn new(path: &str) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::builder().max_size(10).build(manager)?;

        let db = Self {
            pool,
            db_path: path.to_string(),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Get the path to the database file
    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Create a throwaway database (for testing)
    ///
    /// Note: Uses a temporary file rather than `:memory:` because each pooled
    /// connection would otherwise see its own private in-memory database.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = format!(
            "{}/divvy_test_{}_{}.db",
            std::env::temp_dir().display(),
            std::process::id(),
            id
        );

        // Remove any existing file
        let _ = std::fs::remove_file(&path);

        Self::new(&path)
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    /// Run database migrations
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- Enable foreign keys
            PRAGMA foreign_keys = ON;

            -- WAL mode: better concurrency, readers don't block writers
            PRAGMA journal_mode = WAL;

            -- Synchronous NORMAL: good balance of safety and performance
            PRAGMA synchronous = NORMAL;

            -- Wait instead of failing when concurrent categorization writers
            -- briefly hold the write lock
            PRAGMA busy_timeout = 5000;

            -- Households (groups of members who share expenses)
            CREATE TABLE IF NOT EXISTS households (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            -- Household membership, keyed by member email
            CREATE TABLE IF NOT EXISTS household_members (
                household_id INTEGER NOT NULL REFERENCES households(id),
                email TEXT NOT NULL,
                joined_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (household_id, email)
            );

            CREATE INDEX IF NOT EXISTS idx_members_email ON household_members(email);

            -- Bank accounts (transaction ownership chain)
            CREATE TABLE IF NOT EXISTS accounts (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                owner_email TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_accounts_owner ON accounts(owner_email);

            -- Splitting rules (household-scoped classification rules)
            CREATE TABLE IF NOT EXISTS splitting_rules (
                id INTEGER PRIMARY KEY,
                household_id INTEGER NOT NULL REFERENCES households(id),
                rule_name TEXT NOT NULL,
                rule_type TEXT NOT NULL,
                priority INTEGER NOT NULL,
                merchant_pattern TEXT,
                category_match TEXT,
                min_amount REAL,
                max_amount REAL,
                split_percentage TEXT,           -- JSON object: email -> percentage
                is_active BOOLEAN NOT NULL DEFAULT 1,
                apply_to_existing_transactions BOOLEAN NOT NULL DEFAULT 0,
                created_by TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_rules_household
                ON splitting_rules(household_id, is_active, priority);

            -- Transactions (categorization-relevant subset)
            CREATE TABLE IF NOT EXISTS transactions (
                id INTEGER PRIMARY KEY,
                account_id INTEGER NOT NULL REFERENCES accounts(id),
                amount REAL NOT NULL,
                merchant_name TEXT NOT NULL,
                category TEXT,
                date DATE NOT NULL,
                is_shared_expense BOOLEAN NOT NULL DEFAULT 0,
                shared_with_household_id INTEGER REFERENCES households(id),
                splitting_rule_id INTEGER REFERENCES splitting_rules(id),
                confidence_score INTEGER,
                split_percentage TEXT,           -- JSON object: email -> percentage
                manual_override BOOLEAN NOT NULL DEFAULT 0,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_transactions_account ON transactions(account_id);
            CREATE INDEX IF NOT EXISTS idx_transactions_review
                ON transactions(manual_override, confidence_score, date);

            -- Manual override audit trail (append-only)
            CREATE TABLE IF NOT EXISTS transaction_overrides (
                id INTEGER PRIMARY KEY,
                transaction_id INTEGER NOT NULL REFERENCES transactions(id),
                original_rule_id INTEGER REFERENCES splitting_rules(id),
                override_by TEXT NOT NULL,
                old_is_shared_expense BOOLEAN NOT NULL,
                new_is_shared_expense BOOLEAN NOT NULL,
                old_split_percentage TEXT,       -- JSON object
                new_split_percentage TEXT,       -- JSON object
                override_reason TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_overrides_transaction
                ON transaction_overrides(transaction_id);

            -- Rule feedback analytics (append-only)
            CREATE TABLE IF NOT EXISTS rule_feedback (
                id INTEGER PRIMARY KEY,
                transaction_id INTEGER NOT NULL REFERENCES transactions(id),
                rule_id INTEGER REFERENCES splitting_rules(id),
                household_id INTEGER REFERENCES households(id),
                user_action TEXT NOT NULL,
                original_confidence_score INTEGER,
                override_details TEXT,           -- JSON object
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_feedback_transaction
                ON rule_feedback(transaction_id);
            CREATE INDEX IF NOT EXISTS idx_feedback_rule ON rule_feedback(rule_id);
            "#,
        )?;

        info!("Database migrations complete");
        Ok(())
    }
}
