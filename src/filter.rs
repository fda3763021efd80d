//! Record filters applied before aggregation
//!
//! Each criterion is optional: an empty list admits every record. Text
//! criteria compare case-insensitively, mirroring the upper-casing applied to
//! client and provider names when the workbooks are loaded.

use chrono::{Datelike, NaiveDate};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{AnalyticsError, Result};
use crate::fraud::{OutlierLevel, OutlierThresholds};
use crate::records::{ClaimRecord, ClaimStatus, CoverType, PremiumRecord};

/// Result of a filter operation, partitioning records into kept and removed.
#[derive(Debug, Clone)]
pub struct FilterResult<R> {
    pub kept: Vec<R>,
    pub removed: Vec<R>,
}

/// A calendar month, ordered by (year, month)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawYearMonth")]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(AnalyticsError::InvalidFilter(format!(
                "month {} out of range 1-12",
                month
            )));
        }
        Ok(Self { year, month })
    }

    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

/// Inclusive month-year range, e.g. "March 2023" to "June 2024"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawMonthRange")]
pub struct MonthRange {
    pub from: YearMonth,
    pub to: YearMonth,
}

impl MonthRange {
    pub fn new(from: YearMonth, to: YearMonth) -> Result<Self> {
        if from > to {
            return Err(AnalyticsError::InvalidFilter(format!(
                "month range starts after it ends: {}-{:02} > {}-{:02}",
                from.year, from.month, to.year, to.month
            )));
        }
        Ok(Self { from, to })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        let ym = YearMonth::of(date);
        ym >= self.from && ym <= self.to
    }
}

/// Unchecked wire form of `YearMonth`
#[derive(Deserialize)]
struct RawYearMonth {
    year: i32,
    month: u32,
}

impl TryFrom<RawYearMonth> for YearMonth {
    type Error = AnalyticsError;

    fn try_from(raw: RawYearMonth) -> Result<Self> {
        YearMonth::new(raw.year, raw.month)
    }
}

/// Unchecked wire form of `MonthRange`
#[derive(Deserialize)]
struct RawMonthRange {
    from: YearMonth,
    to: YearMonth,
}

impl TryFrom<RawMonthRange> for MonthRange {
    type Error = AnalyticsError;

    fn try_from(raw: RawMonthRange) -> Result<Self> {
        MonthRange::new(raw.from, raw.to)
    }
}

fn admits<T: PartialEq>(allowed: &[T], value: &T) -> bool {
    allowed.is_empty() || allowed.contains(value)
}

fn admits_text(allowed: &[String], value: &str) -> bool {
    allowed.is_empty() || allowed.iter().any(|a| a.trim().eq_ignore_ascii_case(value.trim()))
}

fn admits_optional_text(allowed: &[String], value: Option<&str>) -> bool {
    match value {
        Some(v) => admits_text(allowed, v),
        None => allowed.is_empty(),
    }
}

/// Filter criteria for premium records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PremiumFilter {
    pub years: Vec<i32>,
    pub products: Vec<String>,
    pub cover_types: Vec<CoverType>,
    pub clients: Vec<String>,
    /// Restrict by the month the policy starts in
    pub months: Option<MonthRange>,
}

impl PremiumFilter {
    pub fn is_empty(&self) -> bool {
        self == &PremiumFilter::default()
    }

    pub fn matches(&self, record: &PremiumRecord) -> bool {
        admits(&self.years, &record.year())
            && admits_text(&self.products, &record.product)
            && admits(&self.cover_types, &record.cover_type)
            && admits_text(&self.clients, &record.client_id)
            && self.months.map_or(true, |m| m.contains(record.start_date))
    }

    pub fn apply(&self, records: Vec<PremiumRecord>) -> FilterResult<PremiumRecord> {
        let (kept, removed): (Vec<_>, Vec<_>) =
            records.into_iter().partition(|r| self.matches(r));
        debug!("Premium filter kept {} of {}", kept.len(), kept.len() + removed.len());
        FilterResult { kept, removed }
    }
}

/// Filter criteria for claim records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaimFilter {
    pub years: Vec<i32>,
    /// Calendar quarters 1-4 of the created date
    pub quarters: Vec<u32>,
    /// Restrict by the month the claim was created in
    pub months: Option<MonthRange>,
    pub products: Vec<String>,
    pub clients: Vec<String>,
    pub statuses: Vec<ClaimStatus>,
    pub provider_types: Vec<String>,
    pub providers: Vec<String>,
    pub claim_types: Vec<String>,
    /// Outlier levels, classified against the unfiltered claim amounts
    pub outlier_levels: Vec<OutlierLevel>,
}

impl ClaimFilter {
    pub fn is_empty(&self) -> bool {
        self == &ClaimFilter::default()
    }

    /// Match a claim, given the outlier thresholds of the population it came from
    pub fn matches(&self, record: &ClaimRecord, thresholds: Option<&OutlierThresholds>) -> bool {
        let outlier_ok = self.outlier_levels.is_empty()
            || thresholds
                .map(|t| self.outlier_levels.contains(&t.classify(record.claim_amount)))
                .unwrap_or(false);

        admits(&self.years, &record.year())
            && admits(&self.quarters, &record.quarter())
            && self.months.map_or(true, |m| m.contains(record.created_date))
            && admits_text(&self.products, &record.product)
            && admits_text(&self.clients, &record.client_id)
            && self.status_matches(record.status.as_ref())
            && admits_optional_text(&self.provider_types, record.provider_type.as_deref())
            && admits_optional_text(&self.providers, record.provider_name.as_deref())
            && admits_optional_text(&self.claim_types, record.claim_type.as_deref())
            && outlier_ok
    }

    fn status_matches(&self, status: Option<&ClaimStatus>) -> bool {
        match status {
            Some(s) => admits(&self.statuses, s),
            None => self.statuses.is_empty(),
        }
    }

    /// Thresholds needed by the outlier criterion, `None` when it is not set
    pub fn outlier_thresholds(&self, population: &[ClaimRecord]) -> Option<OutlierThresholds> {
        if self.outlier_levels.is_empty() {
            None
        } else {
            OutlierThresholds::from_claims(population)
        }
    }

    /// Partition claims; outlier thresholds are computed over `records` before filtering
    pub fn apply(&self, records: Vec<ClaimRecord>) -> FilterResult<ClaimRecord> {
        let thresholds = self.outlier_thresholds(&records);

        let (kept, removed): (Vec<_>, Vec<_>) = records
            .into_iter()
            .partition(|r| self.matches(r, thresholds.as_ref()));
        debug!("Claim filter kept {} of {}", kept.len(), kept.len() + removed.len());
        FilterResult { kept, removed }
    }
}

/// Human-readable description of active filters, "All data" when none
pub fn describe(premium: &PremiumFilter, claim: &ClaimFilter) -> String {
    let mut parts: Vec<String> = Vec::new();

    let mut years: Vec<i32> = premium.years.iter().chain(claim.years.iter()).copied().collect();
    years.sort_unstable();
    years.dedup();
    if !years.is_empty() {
        parts.push(years.iter().map(|y| y.to_string()).collect::<Vec<_>>().join(", "));
    }
    if !premium.cover_types.is_empty() {
        parts.push(
            premium
                .cover_types
                .iter()
                .map(|c| c.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        );
    }
    let mut products: Vec<&str> = premium
        .products
        .iter()
        .chain(claim.products.iter())
        .map(|p| p.as_str())
        .collect();
    products.sort_unstable();
    products.dedup();
    if !products.is_empty() {
        parts.push(products.join(", "));
    }
    if !claim.statuses.is_empty() {
        parts.push(
            claim
                .statuses
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        );
    }

    if parts.is_empty() {
        "All data".to_string()
    } else {
        parts.join(" ")
    }
}
