//! Feedback recorder: append-only analytics of accept/reject/override
//! decisions
//!
//! Recording is a side effect of the primary operation and must never fail
//! it: the best-effort path logs and swallows errors.

use tracing::warn;

use crate::db::Database;
use crate::error::Result;
use crate::models::NewRuleFeedback;

/// Append one feedback record.
pub fn record_rule_feedback(db: &Database, feedback: &NewRuleFeedback) -> Result<i64> {
    db.create_feedback(feedback)
}

/// Append one feedback record, logging and swallowing any failure.
pub fn record_rule_feedback_best_effort(db: &Database, feedback: &NewRuleFeedback) {
    if let Err(e) = db.create_feedback(feedback) {
        warn!(
            transaction_id = feedback.transaction_id,
            action = %feedback.user_action,
            error = %e,
            "failed to record rule feedback; continuing"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewTransaction, UserAction};
    use chrono::NaiveDate;

    fn feedback_for(transaction_id: i64) -> NewRuleFeedback {
        NewRuleFeedback {
            transaction_id,
            rule_id: None,
            household_id: None,
            user_action: UserAction::Accepted,
            original_confidence_score: Some(85),
            override_details: None,
        }
    }

    #[test]
    fn test_record_and_list() {
        let db = Database::in_memory().unwrap();
        let account_id = db.create_account("checking", "alice@example.com").unwrap();
        let tx_id = db
            .insert_transaction(&NewTransaction {
                account_id,
                amount: -10.0,
                merchant_name: "Tesco".to_string(),
                category: None,
                date: NaiveDate::from_ymd_opt(2026, 3, 15).unwrap(),
            })
            .unwrap();

        let id = record_rule_feedback(&db, &feedback_for(tx_id)).unwrap();
        assert!(id > 0);

        let rows = db.list_feedback(tx_id).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].user_action, UserAction::Accepted);
        assert_eq!(rows[0].original_confidence_score, Some(85));
    }

    #[test]
    fn test_best_effort_swallows_failures() {
        let db = Database::in_memory().unwrap();
        // References a transaction that doesn't exist; the foreign key
        // violation is logged, not raised
        record_rule_feedback_best_effort(&db, &feedback_for(404));
        assert!(db.list_feedback(404).unwrap().is_empty());
    }
}
