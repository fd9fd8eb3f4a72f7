//! Manual split validation
//!
//! The core never computes splits itself; manual-split UIs propose a
//! personal/shared breakdown and this module checks it against the
//! transaction total and the percentage map.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::Transaction;

/// Largest allowed gap between the proposed amounts and the transaction
/// total: one cent, padded for float noise.
pub const AMOUNT_TOLERANCE: f64 = 0.01 + 1e-9;

/// Allowed deviation of a percentage sum from 100.
pub const PERCENT_TOLERANCE: f64 = 0.01;

/// A proposed manual split of a transaction.
#[derive(Debug, Clone, Deserialize)]
pub struct SplitInput {
    pub personal_amount: f64,
    pub shared_amount: f64,
    /// Member email -> percentage of the shared portion
    pub split_percentage: HashMap<String, f64>,
}

/// Validation verdict for a proposed split.
#[derive(Debug, Clone, Serialize)]
pub struct SplitValidation {
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SplitValidation {
    fn valid() -> Self {
        Self {
            is_valid: true,
            error: None,
        }
    }

    fn invalid(error: &str) -> Self {
        Self {
            is_valid: false,
            error: Some(error.to_string()),
        }
    }
}

/// Validate a proposed manual split against a transaction.
pub fn validate_split_transaction(transaction: &Transaction, input: &SplitInput) -> SplitValidation {
    if input.personal_amount < 0.0 || input.shared_amount < 0.0 {
        return SplitValidation::invalid("Split amounts must not be negative");
    }

    let total = transaction.amount.abs();
    if (input.personal_amount + input.shared_amount - total).abs() > AMOUNT_TOLERANCE {
        return SplitValidation::invalid("Personal and shared amounts must equal transaction total");
    }

    if let Err(e) = validate_split_percentages(&input.split_percentage) {
        return SplitValidation::invalid(&e.to_string());
    }

    SplitValidation::valid()
}

/// Check that a split-percentage map is well formed: no negative shares and a
/// sum of 100 within tolerance. Shared by rule creation and overrides.
pub fn validate_split_percentages(percentages: &HashMap<String, f64>) -> Result<()> {
    if percentages.values().any(|p| *p < 0.0) {
        return Err(Error::InvalidData(
            "Split percentages must not be negative".to_string(),
        ));
    }

    let sum: f64 = percentages.values().sum();
    if (sum - 100.0).abs() > PERCENT_TOLERANCE {
        return Err(Error::InvalidData(format!(
            "Split percentages must sum to 100% (got {:.2})",
            sum
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::transaction;

    fn even_split() -> HashMap<String, f64> {
        HashMap::from([
            ("alice@example.com".to_string(), 50.0),
            ("bob@example.com".to_string(), 50.0),
        ])
    }

    #[test]
    fn test_valid_split() {
        let tx = transaction("Tesco", None, -100.0);
        let input = SplitInput {
            personal_amount: 40.0,
            shared_amount: 60.0,
            split_percentage: even_split(),
        };
        let result = validate_split_transaction(&tx, &input);
        assert!(result.is_valid);
        assert!(result.error.is_none());
    }

    #[test]
    fn test_amounts_must_equal_total() {
        let tx = transaction("Tesco", None, -100.0);
        let input = SplitInput {
            personal_amount: 40.0,
            shared_amount: 50.0,
            split_percentage: even_split(),
        };
        let result = validate_split_transaction(&tx, &input);
        assert!(!result.is_valid);
        assert!(result.error.unwrap().contains("must equal transaction total"));
    }

    #[test]
    fn test_one_cent_tolerance_on_amounts() {
        let tx = transaction("Tesco", None, -100.0);
        let input = SplitInput {
            personal_amount: 40.0,
            shared_amount: 60.01,
            split_percentage: even_split(),
        };
        assert!(validate_split_transaction(&tx, &input).is_valid);

        let input = SplitInput {
            personal_amount: 40.0,
            shared_amount: 60.02,
            split_percentage: even_split(),
        };
        assert!(!validate_split_transaction(&tx, &input).is_valid);
    }

    #[test]
    fn test_percentages_must_sum_to_100() {
        let tx = transaction("Tesco", None, -100.0);
        let input = SplitInput {
            personal_amount: 40.0,
            shared_amount: 60.0,
            split_percentage: HashMap::from([
                ("alice@example.com".to_string(), 50.0),
                ("bob@example.com".to_string(), 30.0),
            ]),
        };
        let result = validate_split_transaction(&tx, &input);
        assert!(!result.is_valid);
        assert!(result.error.unwrap().contains("must sum to 100%"));
    }

    #[test]
    fn test_negative_amounts_rejected() {
        let tx = transaction("Tesco", None, -100.0);
        let input = SplitInput {
            personal_amount: -40.0,
            shared_amount: 140.0,
            split_percentage: even_split(),
        };
        let result = validate_split_transaction(&tx, &input);
        assert!(!result.is_valid);
        assert!(result.error.unwrap().contains("must not be negative"));
    }

    #[test]
    fn test_percentage_helper_tolerance() {
        let mut map = HashMap::from([
            ("a".to_string(), 33.33),
            ("b".to_string(), 33.33),
            ("c".to_string(), 33.34),
        ]);
        assert!(validate_split_percentages(&map).is_ok());

        map.insert("c".to_string(), 33.30);
        assert!(validate_split_percentages(&map).is_err());

        map.insert("c".to_string(), -0.5);
        assert!(validate_split_percentages(&map).is_err());
    }
}
