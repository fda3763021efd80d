//! IQR-based outlier classification of claim amounts

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::records::ClaimRecord;

/// Multiplier of the IQR above Q3 for a mild outlier
pub const MILD_IQR_MULTIPLIER: f64 = 1.5;

/// Multiplier of the IQR above Q3 for an extreme outlier
pub const EXTREME_IQR_MULTIPLIER: f64 = 3.0;

/// Outlier level of a claim amount relative to its population
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OutlierLevel {
    Normal,
    MildOutlier,
    ExtremeOutlier,
}

impl OutlierLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutlierLevel::Normal => "Normal",
            OutlierLevel::MildOutlier => "Mild Outlier",
            OutlierLevel::ExtremeOutlier => "Extreme Outlier",
        }
    }
}

impl fmt::Display for OutlierLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Quantile of sorted values using linear interpolation between closest ranks
///
/// rank = q * (n - 1). Returns `None` for an empty slice.
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let n = sorted.len();
    let h = q.clamp(0.0, 1.0) * (n - 1) as f64;
    let lo = h.floor() as usize;
    let hi = (lo + 1).min(n - 1);
    let frac = h - lo as f64;
    Some(sorted[lo] * (1.0 - frac) + sorted[hi] * frac)
}

/// Upper fences derived from the interquartile range
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OutlierThresholds {
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub mild_upper: f64,
    pub extreme_upper: f64,
}

impl OutlierThresholds {
    /// Compute thresholds from raw amounts; `None` when there are no finite values
    pub fn from_amounts(amounts: &[f64]) -> Option<Self> {
        let mut sorted: Vec<f64> = amounts.iter().copied().filter(|a| a.is_finite()).collect();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let q1 = quantile(&sorted, 0.25)?;
        let q3 = quantile(&sorted, 0.75)?;
        let iqr = q3 - q1;

        Some(Self {
            q1,
            q3,
            iqr,
            mild_upper: q3 + MILD_IQR_MULTIPLIER * iqr,
            extreme_upper: q3 + EXTREME_IQR_MULTIPLIER * iqr,
        })
    }

    /// Thresholds over the claim amounts of a set of claims
    pub fn from_claims(claims: &[ClaimRecord]) -> Option<Self> {
        let amounts: Vec<f64> = claims.iter().map(|c| c.claim_amount).collect();
        Self::from_amounts(&amounts)
    }

    /// Classify an amount; fences are exclusive (a value on the fence is not above it)
    pub fn classify(&self, amount: f64) -> OutlierLevel {
        if amount > self.extreme_upper {
            OutlierLevel::ExtremeOutlier
        } else if amount > self.mild_upper {
            OutlierLevel::MildOutlier
        } else {
            OutlierLevel::Normal
        }
    }
}

/// A claim paired with its outlier level
#[derive(Debug, Clone, Serialize)]
pub struct ClassifiedClaim<'a> {
    pub claim: &'a ClaimRecord,
    pub level: OutlierLevel,
}

/// Classify every claim against thresholds computed from the same set
///
/// An empty input yields an empty output.
pub fn classify_claims(claims: &[ClaimRecord]) -> Vec<ClassifiedClaim<'_>> {
    match OutlierThresholds::from_claims(claims) {
        Some(t) => claims
            .iter()
            .map(|claim| ClassifiedClaim {
                claim,
                level: t.classify(claim.claim_amount),
            })
            .collect(),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_quantile_interpolates() {
        let values = [1.0, 2.0, 3.0, 4.0];
        // rank 0.75 -> between 1 and 2
        assert_relative_eq!(quantile(&values, 0.25).unwrap(), 1.75);
        assert_relative_eq!(quantile(&values, 0.5).unwrap(), 2.5);
        assert_relative_eq!(quantile(&values, 0.75).unwrap(), 3.25);
        assert_relative_eq!(quantile(&values, 0.0).unwrap(), 1.0);
        assert_relative_eq!(quantile(&values, 1.0).unwrap(), 4.0);
    }

    #[test]
    fn test_quantile_edge_cases() {
        assert_eq!(quantile(&[], 0.5), None);
        assert_eq!(quantile(&[7.0], 0.25), Some(7.0));
    }

    #[test]
    fn test_thresholds_and_classification() {
        // Q1 = 20, Q3 = 40, IQR = 20 -> mild 70, extreme 100
        let amounts = [10.0, 20.0, 30.0, 40.0, 50.0];
        let t = OutlierThresholds::from_amounts(&amounts).unwrap();
        assert_relative_eq!(t.q1, 20.0);
        assert_relative_eq!(t.q3, 40.0);
        assert_relative_eq!(t.iqr, 20.0);
        assert_relative_eq!(t.mild_upper, 70.0);
        assert_relative_eq!(t.extreme_upper, 100.0);

        assert_eq!(t.classify(70.0), OutlierLevel::Normal);
        assert_eq!(t.classify(70.01), OutlierLevel::MildOutlier);
        assert_eq!(t.classify(100.0), OutlierLevel::MildOutlier);
        assert_eq!(t.classify(100.01), OutlierLevel::ExtremeOutlier);
    }

    #[test]
    fn test_thresholds_ignore_non_finite_and_empty() {
        assert!(OutlierThresholds::from_amounts(&[]).is_none());
        assert!(OutlierThresholds::from_amounts(&[f64::NAN]).is_none());
        let t = OutlierThresholds::from_amounts(&[f64::NAN, 5.0, 5.0]).unwrap();
        assert_eq!(t.iqr, 0.0);
    }

    #[test]
    fn test_classify_claims() {
        use chrono::NaiveDate;
        let d = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut claims: Vec<ClaimRecord> = (0..10)
            .map(|i| ClaimRecord::new("Acme", "Health", &format!("C{}", i), 100.0 + i as f64, 0.0, d))
            .collect();
        claims.push(ClaimRecord::new("Acme", "Health", "BIG", 1_000_000.0, 0.0, d));

        let classified = classify_claims(&claims);
        assert_eq!(classified.len(), 11);
        let extreme: Vec<_> = classified
            .iter()
            .filter(|c| c.level == OutlierLevel::ExtremeOutlier)
            .map(|c| c.claim.claim_id.as_str())
            .collect();
        assert_eq!(extreme, vec!["BIG"]);
        assert!(classify_claims(&[]).is_empty());
    }
}
