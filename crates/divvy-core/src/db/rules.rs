//! Splitting rule operations

use rusqlite::{params, OptionalExtension, Row};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{NewSplittingRule, RuleOrder, RuleType, SplittingRule};

const RULE_COLUMNS: &str = "id, household_id, rule_name, rule_type, priority, \
     merchant_pattern, category_match, min_amount, max_amount, split_percentage, \
     is_active, apply_to_existing_transactions, created_by, created_at";

pub(super) fn map_rule_row(row: &Row<'_>) -> rusqlite::Result<SplittingRule> {
    let rule_type: String = row.get(3)?;
    let split_json: Option<String> = row.get(9)?;
    let created_at: String = row.get(13)?;

    Ok(SplittingRule {
        id: row.get(0)?,
        household_id: row.get(1)?,
        rule_name: row.get(2)?,
        rule_type: rule_type.parse().unwrap_or(RuleType::Default),
        priority: row.get(4)?,
        merchant_pattern: row.get(5)?,
        category_match: row.get(6)?,
        min_amount: row.get(7)?,
        max_amount: row.get(8)?,
        split_percentage: split_json.and_then(|j| serde_json::from_str(&j).ok()),
        is_active: row.get(10)?,
        apply_to_existing_transactions: row.get(11)?,
        created_by: row.get(12)?,
        created_at: parse_datetime(&created_at),
    })
}

impl Database {
    /// Insert a rule and return its id. Validation (field shape, split sums,
    /// membership) happens in the engine layer before this is called.
    pub fn create_rule(&self, rule: &NewSplittingRule) -> Result<i64> {
        let conn = self.conn()?;

        let split_json = rule
            .split_percentage
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        conn.execute(
            r#"
            INSERT INTO splitting_rules (
                household_id, rule_name, rule_type, priority,
                merchant_pattern, category_match, min_amount, max_amount,
                split_percentage, is_active, apply_to_existing_transactions, created_by
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                rule.household_id,
                rule.rule_name,
                rule.rule_type.as_str(),
                rule.priority,
                rule.merchant_pattern,
                rule.category_match,
                rule.min_amount,
                rule.max_amount,
                split_json,
                rule.is_active,
                rule.apply_to_existing_transactions,
                rule.created_by,
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Get a rule by id
    pub fn get_rule(&self, id: i64) -> Result<Option<SplittingRule>> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {} FROM splitting_rules WHERE id = ?", RULE_COLUMNS),
            params![id],
            map_rule_row,
        )
        .optional()
        .map_err(Error::from)
    }

    /// List a household's rules, optionally restricted to active ones.
    pub fn list_rules(
        &self,
        household_id: i64,
        active_only: bool,
        order: RuleOrder,
    ) -> Result<Vec<SplittingRule>> {
        let conn = self.conn()?;

        let order_clause = match order {
            RuleOrder::Priority => "priority ASC, created_at ASC, id ASC",
            RuleOrder::CreatedAt => "created_at ASC, id ASC",
        };

        let mut sql = format!(
            "SELECT {} FROM splitting_rules WHERE household_id = ?",
            RULE_COLUMNS
        );
        if active_only {
            sql.push_str(" AND is_active = 1");
        }
        sql.push_str(&format!(" ORDER BY {}", order_clause));

        let mut stmt = conn.prepare(&sql)?;
        let rules = stmt
            .query_map(params![household_id], map_rule_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rules)
    }

    /// Active rules for a household in evaluation order.
    ///
    /// Priority ascending; ties broken by creation time, then id, so two
    /// rules sharing a priority always evaluate in a deterministic order.
    pub fn active_rules(&self, household_id: i64) -> Result<Vec<SplittingRule>> {
        self.list_rules(household_id, true, RuleOrder::Priority)
    }

    /// Deactivate a rule (rules are never hard-deleted; audit rows and
    /// transactions keep referencing them)
    pub fn deactivate_rule(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE splitting_rules SET is_active = 0 WHERE id = ?",
            params![id],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("Rule {} not found", id)));
        }
        Ok(())
    }
}
