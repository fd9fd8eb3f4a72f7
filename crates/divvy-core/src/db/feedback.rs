//! Rule feedback operations (append-only analytics)

use rusqlite::{params, Row};

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::{NewRuleFeedback, RuleFeedback, UserAction};

fn map_feedback_row(row: &Row<'_>) -> rusqlite::Result<RuleFeedback> {
    let action: String = row.get(4)?;
    let details_json: Option<String> = row.get(6)?;
    let created_at: String = row.get(7)?;

    Ok(RuleFeedback {
        id: row.get(0)?,
        transaction_id: row.get(1)?,
        rule_id: row.get(2)?,
        household_id: row.get(3)?,
        user_action: action.parse().unwrap_or(UserAction::Accepted),
        original_confidence_score: row.get(5)?,
        override_details: details_json.and_then(|j| serde_json::from_str(&j).ok()),
        created_at: parse_datetime(&created_at),
    })
}

impl Database {
    /// Append a feedback record and return its id
    pub fn create_feedback(&self, feedback: &NewRuleFeedback) -> Result<i64> {
        let conn = self.conn()?;

        let details_json = feedback
            .override_details
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        conn.execute(
            r#"
            INSERT INTO rule_feedback (
                transaction_id, rule_id, household_id, user_action,
                original_confidence_score, override_details
            ) VALUES (?, ?, ?, ?, ?, ?)
            "#,
            params![
                feedback.transaction_id,
                feedback.rule_id,
                feedback.household_id,
                feedback.user_action.as_str(),
                feedback.original_confidence_score,
                details_json,
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Feedback records for a transaction, oldest first
    pub fn list_feedback(&self, transaction_id: i64) -> Result<Vec<RuleFeedback>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, transaction_id, rule_id, household_id, user_action,
                   original_confidence_score, override_details, created_at
            FROM rule_feedback
            WHERE transaction_id = ?
            ORDER BY id ASC
            "#,
        )?;
        let feedback = stmt
            .query_map(params![transaction_id], map_feedback_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(feedback)
    }
}
