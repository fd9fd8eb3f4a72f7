//! Transaction reads and categorization writes

use std::collections::HashMap;

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{parse_date, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{NewTransaction, Transaction};

pub(super) const TRANSACTION_COLUMNS: &str = "id, account_id, amount, merchant_name, category, \
     date, is_shared_expense, shared_with_household_id, splitting_rule_id, confidence_score, \
     split_percentage, manual_override, created_at";

pub(super) fn map_transaction_row(row: &Row<'_>) -> rusqlite::Result<Transaction> {
    let date: String = row.get(5)?;
    let split_json: Option<String> = row.get(10)?;
    let created_at: String = row.get(12)?;

    Ok(Transaction {
        id: row.get(0)?,
        account_id: row.get(1)?,
        amount: row.get(2)?,
        merchant_name: row.get(3)?,
        category: row.get(4)?,
        date: parse_date(&date),
        is_shared_expense: row.get(6)?,
        shared_with_household_id: row.get(7)?,
        splitting_rule_id: row.get(8)?,
        confidence_score: row.get(9)?,
        split_percentage: split_json.and_then(|j| serde_json::from_str(&j).ok()),
        manual_override: row.get(11)?,
        created_at: parse_datetime(&created_at),
    })
}

/// Fetch a transaction on an explicit connection, so the override path can
/// read inside its own SQLite transaction.
pub(super) fn get_transaction_on(
    conn: &Connection,
    id: i64,
) -> rusqlite::Result<Option<Transaction>> {
    conn.query_row(
        &format!(
            "SELECT {} FROM transactions WHERE id = ?",
            TRANSACTION_COLUMNS
        ),
        params![id],
        map_transaction_row,
    )
    .optional()
}

/// Filter for the manual-review queue.
#[derive(Debug, Clone)]
pub struct UncategorizedFilter {
    /// Lower confidence bound (inclusive); 0 if absent
    pub min_confidence: Option<i64>,
    /// Upper confidence bound (inclusive); 100 if absent
    pub max_confidence: Option<i64>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for UncategorizedFilter {
    fn default() -> Self {
        Self {
            min_confidence: None,
            max_confidence: None,
            limit: 50,
            offset: 0,
        }
    }
}

impl Database {
    /// Insert a transaction (normally done by the ingestion layer)
    pub fn insert_transaction(&self, tx: &NewTransaction) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO transactions (account_id, amount, merchant_name, category, date)
            VALUES (?, ?, ?, ?, ?)
            "#,
            params![
                tx.account_id,
                tx.amount,
                tx.merchant_name,
                tx.category,
                tx.date.to_string(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Get a transaction by id
    pub fn get_transaction(&self, id: i64) -> Result<Option<Transaction>> {
        let conn = self.conn()?;
        get_transaction_on(&conn, id).map_err(Error::from)
    }

    /// Persist an automatic categorization result.
    ///
    /// A manual override is terminal: the guarded update refuses to touch an
    /// overridden row even when the caller's read predates the override.
    /// Returns `false` when the write was skipped for that reason.
    pub fn record_categorization(
        &self,
        transaction_id: i64,
        rule_id: i64,
        is_shared_expense: bool,
        shared_with_household_id: Option<i64>,
        split_percentage: Option<&HashMap<String, f64>>,
        confidence_score: i64,
    ) -> Result<bool> {
        let conn = self.conn()?;

        let split_json = split_percentage.map(serde_json::to_string).transpose()?;

        let updated = conn.execute(
            r#"
            UPDATE transactions
            SET splitting_rule_id = ?,
                is_shared_expense = ?,
                shared_with_household_id = ?,
                split_percentage = ?,
                confidence_score = ?
            WHERE id = ? AND manual_override = 0
            "#,
            params![
                rule_id,
                is_shared_expense,
                shared_with_household_id,
                split_json,
                confidence_score,
                transaction_id,
            ],
        )?;

        if updated == 0 {
            // Zero rows means either the transaction is gone or an override
            // landed since the caller's read
            let exists: i64 = conn.query_row(
                "SELECT COUNT(*) FROM transactions WHERE id = ?",
                params![transaction_id],
                |row| row.get(0),
            )?;
            if exists == 0 {
                return Err(Error::NotFound(format!(
                    "Transaction {} not found",
                    transaction_id
                )));
            }
            return Ok(false);
        }
        Ok(true)
    }

    /// Transactions awaiting manual review for a household: not overridden,
    /// with confidence absent or inside the requested band. Newest first.
    pub fn list_uncategorized(
        &self,
        household_id: i64,
        filter: &UncategorizedFilter,
    ) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;

        let min = filter.min_confidence.unwrap_or(0);
        let max = filter.max_confidence.unwrap_or(100);

        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {}
            FROM transactions t
            JOIN accounts a ON a.id = t.account_id
            JOIN household_members m ON m.email = a.owner_email AND m.household_id = ?
            WHERE t.manual_override = 0
              AND (t.confidence_score IS NULL
                   OR (t.confidence_score >= ? AND t.confidence_score <= ?))
            ORDER BY t.date DESC, t.id DESC
            LIMIT ? OFFSET ?
            "#,
            TRANSACTION_COLUMNS
                .split(", ")
                .map(|c| format!("t.{}", c))
                .collect::<Vec<_>>()
                .join(", ")
        ))?;

        let transactions = stmt
            .query_map(
                params![household_id, min, max, filter.limit, filter.offset],
                map_transaction_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(transactions)
    }

    /// All of a household's transactions eligible for automatic
    /// (re)application of rules: owned by a member's account and never
    /// manually overridden. Used by the recategorization batch job.
    pub fn list_recategorizable(&self, household_id: i64) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {}
            FROM transactions t
            JOIN accounts a ON a.id = t.account_id
            JOIN household_members m ON m.email = a.owner_email AND m.household_id = ?
            WHERE t.manual_override = 0
            ORDER BY t.date ASC, t.id ASC
            "#,
            TRANSACTION_COLUMNS
                .split(", ")
                .map(|c| format!("t.{}", c))
                .collect::<Vec<_>>()
                .join(", ")
        ))?;

        let transactions = stmt
            .query_map(params![household_id], map_transaction_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(transactions)
    }

    /// Whether a transaction's account is owned by a member of the household.
    /// Batch operations scoped to a household use this to reject ids that
    /// point at a stranger's transactions.
    pub fn transaction_in_household(
        &self,
        household_id: i64,
        transaction: &Transaction,
    ) -> Result<bool> {
        match self.get_account(transaction.account_id)? {
            Some(account) => self.is_household_member(household_id, &account.owner_email),
            None => Ok(false),
        }
    }

    /// Whether `email` may act on a transaction: the account owner, or a
    /// member of the household the transaction is shared with.
    pub fn can_access_transaction(&self, email: &str, transaction: &Transaction) -> Result<bool> {
        if let Some(account) = self.get_account(transaction.account_id)? {
            if account.owner_email == email {
                return Ok(true);
            }
        }
        if let Some(household_id) = transaction.shared_with_household_id {
            return self.is_household_member(household_id, email);
        }
        Ok(false)
    }
}
