//! Error types for claims analytics
//!
//! `AnalyticsError` covers failures that stop an operation (bad input files,
//! unknown cover types). `EntityIssue` covers per-entity conditions that are
//! recorded on a result and never abort a batch.

use serde::Serialize;
use thiserror::Error;

use crate::records::EntityKey;

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown cover type: {0}")]
    UnknownCoverType(String),

    #[error("Invalid date in {field}: {value:?}")]
    InvalidDate { field: &'static str, value: String },

    #[error("Invalid amount in {field}: {value}")]
    InvalidAmount { field: &'static str, value: f64 },

    #[error("Degenerate cover interval for {key}: {days_on_cover} days on cover")]
    DegenerateInterval { key: EntityKey, days_on_cover: i64 },

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),
}

/// Result type alias for analytics operations.
pub type Result<T> = std::result::Result<T, AnalyticsError>;

/// Per-entity data-quality conditions
///
/// None of these abort a run. They are attached to results or counted in the
/// run diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EntityIssue {
    /// Key present on only one side of the premium/claims join
    MissingJoinKey,
    /// days_on_cover <= 0, earned premium cannot be computed
    DegenerateInterval,
    /// Earned premium is not positive or an amount is not finite, loss ratio has no value
    UndefinedRatio,
    /// Endorsement not contained in any base premium interval
    UnmatchedEndorsement,
}

impl EntityIssue {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityIssue::MissingJoinKey => "missing_join_key",
            EntityIssue::DegenerateInterval => "degenerate_interval",
            EntityIssue::UndefinedRatio => "undefined_ratio",
            EntityIssue::UnmatchedEndorsement => "unmatched_endorsement",
        }
    }
}

impl std::fmt::Display for EntityIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
