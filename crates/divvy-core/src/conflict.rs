//! Conflict detection between overlapping rules
//!
//! Runs at rule-creation time only, against the household's existing active
//! rules of the same type. Warnings are advisory: creation always succeeds,
//! and the author can adjust priorities based on the reported overlap.

use crate::models::{NewSplittingRule, RuleType, SplittingRule};

/// A non-blocking warning that an existing rule can match the same
/// transactions as the proposed one.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ConflictWarning {
    pub rule_id: i64,
    pub rule_name: String,
    pub reason: String,
}

/// Detect overlaps between a proposed rule and existing active rules.
///
/// Only rules of the same type can conflict; inactive rules and other types
/// are skipped. The check is symmetric: if A overlaps B then B, proposed as a
/// candidate against A, reports the same overlap.
pub fn detect_conflicts(
    candidate: &NewSplittingRule,
    existing: &[SplittingRule],
) -> Vec<ConflictWarning> {
    let mut warnings = Vec::new();

    for rule in existing {
        if !rule.is_active || rule.rule_type != candidate.rule_type {
            continue;
        }

        let overlap = match candidate.rule_type {
            RuleType::Merchant => merchant_overlap(
                candidate.merchant_pattern.as_deref(),
                rule.merchant_pattern.as_deref(),
            ),
            RuleType::Category => match (&candidate.category_match, &rule.category_match) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
            RuleType::AmountThreshold => ranges_overlap(
                candidate.min_amount,
                candidate.max_amount,
                rule.min_amount,
                rule.max_amount,
            ),
            // Two default rules trivially overlap, but the catch-all is
            // expected to be unique by convention and is not flagged.
            RuleType::Default => false,
        };

        if overlap {
            warnings.push(ConflictWarning {
                rule_id: rule.id,
                rule_name: rule.rule_name.clone(),
                reason: overlap_reason(candidate, rule),
            });
        }
    }

    warnings
}

/// Either pattern being a substring of the other means both can match the
/// same merchant. Compared case-insensitively, matching the matcher's
/// treatment of merchant names.
fn merchant_overlap(a: Option<&str>, b: Option<&str>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => {
            let a = a.to_lowercase();
            let b = b.to_lowercase();
            a.contains(&b) || b.contains(&a)
        }
        _ => false,
    }
}

/// Inclusive interval overlap with open bounds defaulting to [0, +inf).
fn ranges_overlap(
    a_min: Option<f64>,
    a_max: Option<f64>,
    b_min: Option<f64>,
    b_max: Option<f64>,
) -> bool {
    let a_min = a_min.unwrap_or(0.0);
    let a_max = a_max.unwrap_or(f64::INFINITY);
    let b_min = b_min.unwrap_or(0.0);
    let b_max = b_max.unwrap_or(f64::INFINITY);
    a_min <= b_max && b_min <= a_max
}

fn overlap_reason(candidate: &NewSplittingRule, rule: &SplittingRule) -> String {
    let what = match candidate.rule_type {
        RuleType::Merchant => "both merchant patterns can match the same merchant",
        RuleType::Category => "both rules match the same category",
        RuleType::AmountThreshold => "the amount ranges overlap",
        RuleType::Default => "both rules match every transaction",
    };
    format!(
        "Overlaps with rule '{}' (priority {}): {}; the new rule has priority {}. \
         The lower priority value is evaluated first.",
        rule.rule_name, rule.priority, what, candidate.priority
    )
}
