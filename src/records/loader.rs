//! Load premium and claim records from CSV exports of the workbooks

use super::{ClaimRecord, ClaimStatus, CoverType, PremiumRecord};
use crate::error::{AnalyticsError, Result};
use chrono::{NaiveDate, NaiveDateTime};
use csv::Reader;
use log::{debug, warn};
use std::path::Path;

/// Default directory holding `premiums.csv` and `claims.csv`
pub const DEFAULT_DATA_PATH: &str = "data";

/// Default premium file name inside the data directory
pub const PREMIUMS_FILE: &str = "premiums.csv";

/// Default claims file name inside the data directory
pub const CLAIMS_FILE: &str = "claims.csv";

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d"];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Parse a workbook date cell exported as text
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
                .map(|dt| dt.date())
        })
}

fn require_date(field: &'static str, value: &str) -> Result<NaiveDate> {
    parse_date(value).ok_or_else(|| AnalyticsError::InvalidDate {
        field,
        value: value.to_string(),
    })
}

/// Blank amounts count as zero; NaN and infinities are rejected
fn finite_amount(field: &'static str, value: Option<f64>) -> Result<f64> {
    match value {
        None => Ok(0.0),
        Some(v) if v.is_finite() => Ok(v),
        Some(v) => Err(AnalyticsError::InvalidAmount { field, value: v }),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Raw CSV row matching the premium workbook columns
#[derive(Debug, serde::Deserialize)]
struct PremiumCsvRow {
    #[serde(rename = "Client Name")]
    client_name: String,
    #[serde(rename = "Product")]
    product: String,
    #[serde(rename = "Cover Type")]
    cover_type: String,
    #[serde(rename = "Start Date")]
    start_date: String,
    #[serde(rename = "End Date")]
    end_date: String,
    #[serde(rename = "Total")]
    total: Option<f64>,
    #[serde(rename = "Policy No", alias = "Policy Number", default)]
    policy_number: Option<String>,
}

impl PremiumCsvRow {
    fn to_record(self) -> Result<PremiumRecord> {
        let cover_type: CoverType = self.cover_type.parse()?;
        let start_date = require_date("Start Date", &self.start_date)?;
        let end_date = require_date("End Date", &self.end_date)?;
        let total_premium = finite_amount("Total", self.total)?;

        Ok(PremiumRecord {
            client_id: self.client_name.trim().to_string(),
            product: self.product.trim().to_string(),
            cover_type,
            start_date,
            end_date,
            total_premium,
            policy_number: non_empty(self.policy_number),
        })
    }
}

/// Raw CSV row matching the claims workbook columns
#[derive(Debug, serde::Deserialize)]
struct ClaimCsvRow {
    #[serde(rename = "Client Name", alias = "Employer Name")]
    client_name: String,
    #[serde(rename = "Product")]
    product: String,
    #[serde(rename = "Claim ID")]
    claim_id: String,
    #[serde(rename = "Claim Amount")]
    claim_amount: Option<f64>,
    #[serde(rename = "Approved Claim Amount")]
    approved_claim_amount: Option<f64>,
    #[serde(rename = "Claim Created Date")]
    created_date: String,
    #[serde(rename = "Claim Status", default)]
    status: Option<String>,
    #[serde(rename = "Source", default)]
    source: Option<String>,
    #[serde(rename = "Provider Name", default)]
    provider_name: Option<String>,
    #[serde(rename = "Member Name", default)]
    member_name: Option<String>,
    #[serde(rename = "Claim Type", default)]
    claim_type: Option<String>,
}

impl ClaimCsvRow {
    /// Returns `None` when the created date cannot be parsed or an amount is not finite
    fn to_record(self) -> Option<ClaimRecord> {
        let created_date = match parse_date(&self.created_date) {
            Some(d) => d,
            None => {
                warn!(
                    "Skipping claim {}: unparseable Claim Created Date {:?}",
                    self.claim_id, self.created_date
                );
                return None;
            }
        };
        let amounts = finite_amount("Claim Amount", self.claim_amount).and_then(|claimed| {
            finite_amount("Approved Claim Amount", self.approved_claim_amount)
                .map(|approved| (claimed, approved))
        });
        let (claim_amount, approved_claim_amount) = match amounts {
            Ok(a) => a,
            Err(e) => {
                warn!("Skipping claim {}: {}", self.claim_id, e);
                return None;
            }
        };

        Some(ClaimRecord {
            client_id: self.client_name.trim().to_string(),
            product: self.product.trim().to_string(),
            claim_id: self.claim_id.trim().to_string(),
            claim_amount,
            approved_claim_amount,
            created_date,
            status: non_empty(self.status).map(|s| ClaimStatus::parse(&s)),
            provider_type: non_empty(self.source),
            provider_name: non_empty(self.provider_name).map(|p| p.to_uppercase()),
            member_name: non_empty(self.member_name),
            claim_type: non_empty(self.claim_type),
        })
    }
}

/// Load all premium records from a CSV file
pub fn load_premiums<P: AsRef<Path>>(path: P) -> Result<Vec<PremiumRecord>> {
    debug!("Loading premiums from {}", path.as_ref().display());
    let file = std::fs::File::open(path)?;
    load_premiums_from_reader(file)
}

/// Load premium records from any reader (e.g., string buffer, request body)
pub fn load_premiums_from_reader<R: std::io::Read>(reader: R) -> Result<Vec<PremiumRecord>> {
    let mut csv_reader = Reader::from_reader(reader);
    let mut records = Vec::new();

    for result in csv_reader.deserialize() {
        let row: PremiumCsvRow = result?;
        records.push(row.to_record()?);
    }

    debug!("Loaded {} premium records", records.len());
    Ok(records)
}

/// Load all claim records from a CSV file
pub fn load_claims<P: AsRef<Path>>(path: P) -> Result<Vec<ClaimRecord>> {
    debug!("Loading claims from {}", path.as_ref().display());
    let file = std::fs::File::open(path)?;
    load_claims_from_reader(file)
}

/// Load claim records from any reader
///
/// Rows with an unparseable created date or a non-finite amount are skipped
/// with a warning.
pub fn load_claims_from_reader<R: std::io::Read>(reader: R) -> Result<Vec<ClaimRecord>> {
    let mut csv_reader = Reader::from_reader(reader);
    let mut records = Vec::new();
    let mut skipped = 0usize;

    for result in csv_reader.deserialize() {
        let row: ClaimCsvRow = result?;
        match row.to_record() {
            Some(record) => records.push(record),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        warn!("Skipped {} claims with invalid dates or amounts", skipped);
    }
    debug!("Loaded {} claim records", records.len());
    Ok(records)
}

/// Load premiums from the default data directory
pub fn load_default_premiums() -> Result<Vec<PremiumRecord>> {
    load_premiums(Path::new(DEFAULT_DATA_PATH).join(PREMIUMS_FILE))
}

/// Load claims from the default data directory
pub fn load_default_claims() -> Result<Vec<ClaimRecord>> {
    load_claims(Path::new(DEFAULT_DATA_PATH).join(CLAIMS_FILE))
}
