//! Divvy Core Library
//!
//! Shared functionality for the Divvy expense splitting engine:
//! - Database access and migrations
//! - Rule matcher: first active rule whose predicate accepts a transaction
//! - Confidence scorer: fixed 0-100 table by rule type and match exactness
//! - Conflict detector: overlap warnings at rule-creation time
//! - Categorization engine with chunked, failure-isolated batch processing
//! - Audited manual overrides and append-only rule feedback
//! - Manual split validation

pub mod conflict;
pub mod db;
pub mod engine;
pub mod error;
pub mod feedback;
pub mod matcher;
pub mod models;
pub mod overrides;
pub mod rules;
pub mod scoring;
pub mod split;

#[cfg(test)]
pub(crate) mod test_fixtures;

pub use conflict::{detect_conflicts, ConflictWarning};
pub use db::{Database, UncategorizedFilter};
pub use engine::{
    BatchItemResult, BatchOutcome, CategorizationEngine, CategorizationOutcome,
    CATEGORIZE_CHUNK_SIZE,
};
pub use error::{Error, Result};
pub use matcher::{compile_rules, find_matching_rule, rule_matches, CompiledRule};
pub use overrides::{override_transaction, OverrideRequest};
pub use rules::{create_rule, list_rules, CreatedRule};
pub use scoring::{confidence_score, ConfidenceLevel};
pub use split::{validate_split_transaction, SplitInput, SplitValidation};
