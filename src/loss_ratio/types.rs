//! Intermediate and output types for the loss ratio computation

use chrono::NaiveDate;
use serde::{Serialize, Serializer};
use std::fmt;

use crate::error::{AnalyticsError, EntityIssue, Result};
use crate::records::{CoverType, EntityKey};

/// Base premium chosen for an entity
///
/// When the winning cover type has several records they are collapsed into a
/// single period: earliest start, latest end, summed premium.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrioritizedPremium {
    pub key: EntityKey,
    /// Cover type the base was taken from
    pub cover_type: CoverType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_premium: f64,
    /// Number of records collapsed into this base
    pub record_count: usize,
}

impl PrioritizedPremium {
    /// Base built from endorsements because no New or Renewal record exists
    pub fn is_fallback(&self) -> bool {
        !self.cover_type.is_base()
    }
}

/// Endorsement premium matched onto one entity's base premium
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EndorsementTotal {
    /// Sum of contained endorsement premiums
    pub premium: f64,
    pub matched: usize,
    /// Endorsements dropped because they fall outside the base interval
    pub unmatched: usize,
}

/// Premium side of an entity after endorsement matching
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientProductYearAggregate {
    pub key: EntityKey,
    /// Earliest start date
    pub start_date: NaiveDate,
    /// Latest end date
    pub end_date: NaiveDate,
    pub base_premium: f64,
    pub endorsement_premium: f64,
    /// Base plus matched endorsement premium
    pub total_premium: f64,
    /// Reference date minus start date, in whole days
    pub days_since_start: i64,
    /// End date minus start date, in whole days
    pub days_on_cover: i64,
    pub base_cover_type: CoverType,
    pub unmatched_endorsements: usize,
}

impl ClientProductYearAggregate {
    pub fn is_fallback_base(&self) -> bool {
        !self.base_cover_type.is_base()
    }

    /// Earned premium = total premium * days since start / days on cover
    ///
    /// Fails with `DegenerateInterval` when days_on_cover <= 0.
    pub fn earned_premium(&self) -> Result<f64> {
        if self.days_on_cover <= 0 {
            return Err(AnalyticsError::DegenerateInterval {
                key: self.key.clone(),
                days_on_cover: self.days_on_cover,
            });
        }
        Ok(self.total_premium * self.days_since_start as f64 / self.days_on_cover as f64)
    }
}

/// Claims side of an entity
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClaimsAggregate {
    /// Sum of claim amounts
    pub total_claims: f64,
    /// Sum of approved claim amounts
    pub total_approved: f64,
    pub claim_count: usize,
}

/// Loss ratio in percent, or the undefined sentinel when earned premium is not
/// positive or an amount is not finite
///
/// Serialises as a number or the string `"undefined"`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LossRatio {
    Percent(f64),
    Undefined,
}

impl LossRatio {
    /// 100 * claims / earned, undefined unless earned > 0 and both amounts are finite
    pub fn from_amounts(total_claims: f64, earned_premium: f64) -> Self {
        if earned_premium > 0.0 && earned_premium.is_finite() && total_claims.is_finite() {
            LossRatio::Percent(100.0 * total_claims / earned_premium)
        } else {
            LossRatio::Undefined
        }
    }

    pub fn percent(&self) -> Option<f64> {
        match self {
            LossRatio::Percent(p) => Some(*p),
            LossRatio::Undefined => None,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, LossRatio::Undefined)
    }
}

impl fmt::Display for LossRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LossRatio::Percent(p) => write!(f, "{:.2}%", p),
            LossRatio::Undefined => f.write_str("undefined"),
        }
    }
}

impl Serialize for LossRatio {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            LossRatio::Percent(p) => serializer.serialize_f64(*p),
            LossRatio::Undefined => serializer.serialize_str("undefined"),
        }
    }
}

/// Whether an entity's loss ratio is a usable measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ResultStatus {
    Valid,
    /// Earned premium is zero or negative, or an amount is not finite
    UndefinedRatio,
    /// Cover interval has no length; no earned premium was computed
    DegenerateInterval,
}

impl ResultStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultStatus::Valid => "valid",
            ResultStatus::UndefinedRatio => "undefined_ratio",
            ResultStatus::DegenerateInterval => "degenerate_interval",
        }
    }
}

impl fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Loss ratio outcome for one entity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LossRatioResult {
    pub key: EntityKey,
    /// Premium side, absent when the entity only has claims
    pub premium: Option<ClientProductYearAggregate>,
    /// Claims side, absent when the entity only has premiums
    pub claims: Option<ClaimsAggregate>,
    /// Zero when there is no premium side, absent for a degenerate interval
    pub earned_premium: Option<f64>,
    /// Zero when there is no claims side
    pub total_claims: f64,
    pub loss_ratio: LossRatio,
    pub status: ResultStatus,
    pub issues: Vec<EntityIssue>,
}

impl LossRatioResult {
    pub fn has_issue(&self, issue: EntityIssue) -> bool {
        self.issues.contains(&issue)
    }

    pub fn is_fallback_base(&self) -> bool {
        self.premium.as_ref().map_or(false, |p| p.is_fallback_base())
    }

    /// Flat output row for CSV/JSON export
    pub fn to_row(&self) -> LossRatioRow {
        LossRatioRow {
            client_id: self.key.client_id.clone(),
            product: self.key.product.clone(),
            year: self.key.year,
            earned_premium: self.earned_premium,
            total_claims: self.total_claims,
            loss_ratio_pct: self.loss_ratio,
            status: self.status.as_str(),
            issues: self
                .issues
                .iter()
                .map(|i| i.as_str())
                .collect::<Vec<_>>()
                .join(";"),
        }
    }
}

/// Flat, export-friendly loss ratio row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LossRatioRow {
    pub client_id: String,
    pub product: String,
    pub year: i32,
    pub earned_premium: Option<f64>,
    pub total_claims: f64,
    pub loss_ratio_pct: LossRatio,
    pub status: &'static str,
    pub issues: String,
}
