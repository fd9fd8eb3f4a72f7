//! Bank account operations

use rusqlite::{params, OptionalExtension};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::Account;

impl Database {
    /// Create an account owned by `owner_email`
    pub fn create_account(&self, name: &str, owner_email: &str) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO accounts (name, owner_email) VALUES (?, ?)",
            params![name, owner_email],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Get an account by id
    pub fn get_account(&self, id: i64) -> Result<Option<Account>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, name, owner_email, created_at FROM accounts WHERE id = ?",
            params![id],
            |row| {
                let created_at: String = row.get(3)?;
                Ok(Account {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    owner_email: row.get(2)?,
                    created_at: parse_datetime(&created_at),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }
}
