//! Manual override writes and their audit trail
//!
//! The audit insert and the transaction update are one SQLite transaction,
//! so a crash between the two cannot leave an override without its audit row
//! (or the reverse).

use std::collections::HashMap;

use rusqlite::{params, Row};

use super::transactions::get_transaction_on;
use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{Transaction, TransactionOverride};

fn map_override_row(row: &Row<'_>) -> rusqlite::Result<TransactionOverride> {
    let old_split: Option<String> = row.get(6)?;
    let new_split: Option<String> = row.get(7)?;
    let created_at: String = row.get(9)?;

    Ok(TransactionOverride {
        id: row.get(0)?,
        transaction_id: row.get(1)?,
        original_rule_id: row.get(2)?,
        override_by: row.get(3)?,
        old_is_shared_expense: row.get(4)?,
        new_is_shared_expense: row.get(5)?,
        old_split_percentage: old_split.and_then(|j| serde_json::from_str(&j).ok()),
        new_split_percentage: new_split.and_then(|j| serde_json::from_str(&j).ok()),
        override_reason: row.get(8)?,
        created_at: parse_datetime(&created_at),
    })
}

impl Database {
    /// Apply a manual override: append the audit record and update the
    /// transaction atomically.
    ///
    /// Sets `manual_override = 1` and `confidence_score = 100`;
    /// `splitting_rule_id` is left untouched for traceability.
    pub fn apply_override(
        &self,
        transaction_id: i64,
        override_by: &str,
        new_is_shared_expense: bool,
        shared_with_household_id: Option<i64>,
        new_split_percentage: Option<&HashMap<String, f64>>,
        reason: Option<&str>,
    ) -> Result<Transaction> {
        let mut conn = self.conn()?;
        let db_tx = conn.transaction()?;

        let current = get_transaction_on(&db_tx, transaction_id)?.ok_or_else(|| {
            Error::NotFound(format!("Transaction {} not found", transaction_id))
        })?;

        let old_split_json = current
            .split_percentage
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let new_split_json = new_split_percentage.map(serde_json::to_string).transpose()?;

        db_tx.execute(
            r#"
            INSERT INTO transaction_overrides (
                transaction_id, original_rule_id, override_by,
                old_is_shared_expense, new_is_shared_expense,
                old_split_percentage, new_split_percentage, override_reason
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                transaction_id,
                current.splitting_rule_id,
                override_by,
                current.is_shared_expense,
                new_is_shared_expense,
                old_split_json,
                new_split_json,
                reason,
            ],
        )?;

        db_tx.execute(
            r#"
            UPDATE transactions
            SET manual_override = 1,
                confidence_score = 100,
                is_shared_expense = ?,
                shared_with_household_id = ?,
                split_percentage = ?
            WHERE id = ?
            "#,
            params![
                new_is_shared_expense,
                shared_with_household_id,
                new_split_json,
                transaction_id,
            ],
        )?;

        let updated = get_transaction_on(&db_tx, transaction_id)?.ok_or_else(|| {
            Error::NotFound(format!("Transaction {} not found", transaction_id))
        })?;

        db_tx.commit()?;
        Ok(updated)
    }

    /// Audit records for a transaction, oldest first
    pub fn list_overrides(&self, transaction_id: i64) -> Result<Vec<TransactionOverride>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, transaction_id, original_rule_id, override_by,
                   old_is_shared_expense, new_is_shared_expense,
                   old_split_percentage, new_split_percentage, override_reason, created_at
            FROM transaction_overrides
            WHERE transaction_id = ?
            ORDER BY id ASC
            "#,
        )?;
        let overrides = stmt
            .query_map(params![transaction_id], map_override_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(overrides)
    }
}
