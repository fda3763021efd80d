//! Fraud detection metrics over a set of claims

use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

use super::outlier::{OutlierLevel, OutlierThresholds};
use crate::records::ClaimRecord;

/// Number of providers / members reported in the high-frequency lists
pub const TOP_N: usize = 5;

/// Number of providers reported in the discrepancy list
pub const TOP_DISCREPANCY_PROVIDERS: usize = 10;

/// A claim is a high discrepancy claim when its discrepancy exceeds this
/// multiple of the mean discrepancy
pub const HIGH_DISCREPANCY_FACTOR: f64 = 2.0;

/// Claim count for a provider or member
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequencyEntry {
    pub name: String,
    pub claim_count: usize,
}

/// Summed requested/approved discrepancy for a provider
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderDiscrepancy {
    pub provider_name: String,
    pub total_discrepancy: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FraudMetrics {
    pub total_claims: usize,
    pub thresholds: Option<OutlierThresholds>,
    pub normal_count: usize,
    pub mild_outlier_count: usize,
    pub extreme_outlier_count: usize,
    /// Providers with the most claims, descending
    pub top_providers: Vec<FrequencyEntry>,
    /// Members with the most claims, descending
    pub top_members: Vec<FrequencyEntry>,
    /// Mean |claim amount - approved amount|
    pub avg_discrepancy: f64,
    /// Distinct claim ids whose discrepancy exceeds twice the mean
    pub high_discrepancy_claims: usize,
    /// Discrepancy totals over high discrepancy claims, by provider, descending,
    /// capped at `TOP_DISCREPANCY_PROVIDERS`
    pub provider_discrepancies: Vec<ProviderDiscrepancy>,
}

impl FraudMetrics {
    /// Compute fraud metrics; thresholds are taken from the claims themselves
    pub fn compute(claims: &[ClaimRecord]) -> Self {
        let thresholds = OutlierThresholds::from_claims(claims);

        let mut level_counts: BTreeMap<OutlierLevel, usize> = BTreeMap::new();
        if let Some(t) = &thresholds {
            for claim in claims {
                *level_counts.entry(t.classify(claim.claim_amount)).or_default() += 1;
            }
        }

        let avg_discrepancy = if claims.is_empty() {
            0.0
        } else {
            claims.iter().map(|c| c.amount_discrepancy()).sum::<f64>() / claims.len() as f64
        };
        let cutoff = avg_discrepancy * HIGH_DISCREPANCY_FACTOR;

        let high: Vec<&ClaimRecord> = claims
            .iter()
            .filter(|c| c.amount_discrepancy() > cutoff)
            .collect();
        let high_discrepancy_claims = high
            .iter()
            .map(|c| c.claim_id.as_str())
            .collect::<HashSet<_>>()
            .len();

        let mut by_provider: HashMap<&str, f64> = HashMap::new();
        for c in &high {
            if let Some(p) = c.provider_name.as_deref() {
                *by_provider.entry(p).or_default() += c.amount_discrepancy();
            }
        }
        let mut provider_discrepancies: Vec<ProviderDiscrepancy> = by_provider
            .into_iter()
            .map(|(name, total)| ProviderDiscrepancy {
                provider_name: name.to_string(),
                total_discrepancy: total,
            })
            .collect();
        provider_discrepancies.sort_by(|a, b| {
            b.total_discrepancy
                .total_cmp(&a.total_discrepancy)
                .then_with(|| a.provider_name.cmp(&b.provider_name))
        });
        provider_discrepancies.truncate(TOP_DISCREPANCY_PROVIDERS);

        Self {
            total_claims: claims.len(),
            thresholds,
            normal_count: level_counts.get(&OutlierLevel::Normal).copied().unwrap_or(0),
            mild_outlier_count: level_counts.get(&OutlierLevel::MildOutlier).copied().unwrap_or(0),
            extreme_outlier_count: level_counts
                .get(&OutlierLevel::ExtremeOutlier)
                .copied()
                .unwrap_or(0),
            top_providers: top_by_count(claims.iter().filter_map(|c| c.provider_name.as_deref())),
            top_members: top_by_count(claims.iter().filter_map(|c| c.member_name.as_deref())),
            avg_discrepancy,
            high_discrepancy_claims,
            provider_discrepancies,
        }
    }
}

/// Count occurrences and keep the `TOP_N` most frequent, ties broken by name
fn top_by_count<'a>(names: impl Iterator<Item = &'a str>) -> Vec<FrequencyEntry> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for name in names {
        *counts.entry(name).or_default() += 1;
    }
    let mut entries: Vec<FrequencyEntry> = counts
        .into_iter()
        .map(|(name, claim_count)| FrequencyEntry {
            name: name.to_string(),
            claim_count,
        })
        .collect();
    entries.sort_by(|a, b| b.claim_count.cmp(&a.claim_count).then_with(|| a.name.cmp(&b.name)));
    entries.truncate(TOP_N);
    entries
}
