//! Premium and claim record structures matching the dashboard workbooks

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AnalyticsError;

/// Cover type of a premium transaction
///
/// Declaration order is the prioritisation order used when choosing the base
/// premium for an entity: `Renewal` > `New` > `Endorsement`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CoverType {
    /// Mid-term amendment to an existing policy
    Endorsement,
    /// New business
    New,
    /// Renewal of an existing policy
    Renewal,
}

impl CoverType {
    /// Get the string representation matching the workbook format
    pub fn as_str(&self) -> &'static str {
        match self {
            CoverType::Endorsement => "Endorsement",
            CoverType::New => "New",
            CoverType::Renewal => "Renewal",
        }
    }

    /// Whether this cover type can form a base contract period
    pub fn is_base(&self) -> bool {
        matches!(self, CoverType::New | CoverType::Renewal)
    }
}

impl fmt::Display for CoverType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CoverType {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "new" => Ok(CoverType::New),
            "renewal" => Ok(CoverType::Renewal),
            "endorsement" => Ok(CoverType::Endorsement),
            _ => Err(AnalyticsError::UnknownCoverType(s.to_string())),
        }
    }
}

/// Processing status of a claim
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClaimStatus {
    Approved,
    Declined,
    Pending,
    /// Any other status text found in the source data
    Other(String),
}

impl ClaimStatus {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "approved" => ClaimStatus::Approved,
            "declined" => ClaimStatus::Declined,
            "pending" => ClaimStatus::Pending,
            _ => ClaimStatus::Other(s.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ClaimStatus::Approved => "Approved",
            ClaimStatus::Declined => "Declined",
            ClaimStatus::Pending => "Pending",
            ClaimStatus::Other(s) => s.as_str(),
        }
    }
}

impl fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalise a client name for joining premiums with claims
///
/// Claims workbooks spell employer names inconsistently, so both sides are
/// trimmed and upper-cased before grouping.
pub fn normalize_client(name: &str) -> String {
    name.trim().to_uppercase()
}

/// Grouping key used throughout the loss ratio computation
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityKey {
    pub client_id: String,
    pub product: String,
    pub year: i32,
}

impl EntityKey {
    pub fn new(client_id: &str, product: &str, year: i32) -> Self {
        Self {
            client_id: normalize_client(client_id),
            product: product.trim().to_string(),
            year,
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.client_id, self.product, self.year)
    }
}

/// A single premium transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PremiumRecord {
    /// Client (employer) name
    pub client_id: String,

    /// Product name (e.g. "Health Insurance", "ProActiv")
    pub product: String,

    /// New, Renewal or Endorsement
    pub cover_type: CoverType,

    /// Policy (or endorsement) effective date
    pub start_date: NaiveDate,

    /// Policy (or endorsement) expiry date
    pub end_date: NaiveDate,

    /// Premium amount for the transaction
    pub total_premium: f64,

    /// Policy number, when the workbook carries one
    #[serde(default)]
    pub policy_number: Option<String>,
}

impl PremiumRecord {
    pub fn new(
        client_id: &str,
        product: &str,
        cover_type: CoverType,
        start_date: NaiveDate,
        end_date: NaiveDate,
        total_premium: f64,
    ) -> Self {
        Self {
            client_id: client_id.to_string(),
            product: product.to_string(),
            cover_type,
            start_date,
            end_date,
            total_premium,
            policy_number: None,
        }
    }

    /// Underwriting year, taken from the start date
    pub fn year(&self) -> i32 {
        self.start_date.year()
    }

    pub fn key(&self) -> EntityKey {
        EntityKey::new(&self.client_id, &self.product, self.year())
    }

    /// Whether [start, end] lies within [outer_start, outer_end] (inclusive)
    pub fn contained_in(&self, outer_start: NaiveDate, outer_end: NaiveDate) -> bool {
        self.start_date >= outer_start && self.end_date <= outer_end
    }
}

/// A single claim transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimRecord {
    /// Client (employer) name
    pub client_id: String,

    pub product: String,

    pub claim_id: String,

    /// Amount requested by the provider
    pub claim_amount: f64,

    /// Amount approved for payment
    pub approved_claim_amount: f64,

    pub created_date: NaiveDate,

    #[serde(default)]
    pub status: Option<ClaimStatus>,

    /// Provider type ("Source" in the claims workbook)
    #[serde(default)]
    pub provider_type: Option<String>,

    #[serde(default)]
    pub provider_name: Option<String>,

    #[serde(default)]
    pub member_name: Option<String>,

    #[serde(default)]
    pub claim_type: Option<String>,
}

impl ClaimRecord {
    pub fn new(
        client_id: &str,
        product: &str,
        claim_id: &str,
        claim_amount: f64,
        approved_claim_amount: f64,
        created_date: NaiveDate,
    ) -> Self {
        Self {
            client_id: client_id.to_string(),
            product: product.to_string(),
            claim_id: claim_id.to_string(),
            claim_amount,
            approved_claim_amount,
            created_date,
            status: None,
            provider_type: None,
            provider_name: None,
            member_name: None,
            claim_type: None,
        }
    }

    pub fn with_status(mut self, status: ClaimStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_provider(mut self, provider_type: &str, provider_name: &str) -> Self {
        self.provider_type = Some(provider_type.to_string());
        self.provider_name = Some(provider_name.to_string());
        self
    }

    pub fn with_member(mut self, member_name: &str) -> Self {
        self.member_name = Some(member_name.to_string());
        self
    }

    pub fn with_claim_type(mut self, claim_type: &str) -> Self {
        self.claim_type = Some(claim_type.to_string());
        self
    }

    /// Year the claim was created
    pub fn year(&self) -> i32 {
        self.created_date.year()
    }

    /// Calendar quarter (1-4) the claim was created in
    pub fn quarter(&self) -> u32 {
        (self.created_date.month() - 1) / 3 + 1
    }

    pub fn key(&self) -> EntityKey {
        EntityKey::new(&self.client_id, &self.product, self.year())
    }

    pub fn is_approved(&self) -> bool {
        matches!(self.status, Some(ClaimStatus::Approved))
    }

    pub fn is_declined(&self) -> bool {
        matches!(self.status, Some(ClaimStatus::Declined))
    }

    /// Absolute gap between requested and approved amounts
    pub fn amount_discrepancy(&self) -> f64 {
        (self.claim_amount - self.approved_claim_amount).abs()
    }
}
