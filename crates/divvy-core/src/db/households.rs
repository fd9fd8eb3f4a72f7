//! Household and membership operations

use rusqlite::{params, OptionalExtension};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{Household, HouseholdMember};

impl Database {
    /// Create a household and return its id
    pub fn create_household(&self, name: &str) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO households (name) VALUES (?)",
            params![name],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Get a household by id
    pub fn get_household(&self, id: i64) -> Result<Option<Household>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, name, created_at FROM households WHERE id = ?",
            params![id],
            |row| {
                let created_at: String = row.get(2)?;
                Ok(Household {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    created_at: parse_datetime(&created_at),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    /// Add a member to a household (idempotent)
    pub fn add_household_member(&self, household_id: i64, email: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO household_members (household_id, email) VALUES (?, ?)",
            params![household_id, email],
        )?;
        Ok(())
    }

    /// List the members of a household
    pub fn list_household_members(&self, household_id: i64) -> Result<Vec<HouseholdMember>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT household_id, email, joined_at FROM household_members
             WHERE household_id = ? ORDER BY joined_at, email",
        )?;
        let members = stmt
            .query_map(params![household_id], |row| {
                let joined_at: String = row.get(2)?;
                Ok(HouseholdMember {
                    household_id: row.get(0)?,
                    email: row.get(1)?,
                    joined_at: parse_datetime(&joined_at),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(members)
    }

    /// Whether `email` belongs to the household
    pub fn is_household_member(&self, household_id: i64, email: &str) -> Result<bool> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM household_members WHERE household_id = ? AND email = ?",
            params![household_id, email],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Validate that every email in `emails` is a member of the household.
    ///
    /// Used to reject split-percentage maps that name non-members before any
    /// state changes.
    pub fn assert_household_members<'a, I>(&self, household_id: i64, emails: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut unknown: Vec<&str> = Vec::new();
        for email in emails {
            if !self.is_household_member(household_id, email)? {
                unknown.push(email);
            }
        }
        if !unknown.is_empty() {
            return Err(Error::InvalidData(format!(
                "split_percentage references non-members of household {}: {}",
                household_id,
                unknown.join(", ")
            )));
        }
        Ok(())
    }
}
