//! Headline figures for the claims, premium and loss ratio views

use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

use crate::loss_ratio::{LossRatio, LossRatioResult, ResultStatus};
use crate::records::{normalize_client, ClaimRecord, CoverType, PremiumRecord};

/// Claims overview metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClaimsSummary {
    pub total_claim_amount: f64,
    pub average_claim_amount: f64,
    pub average_approved_amount: f64,
    /// Approved amounts of claims with status Approved
    pub total_approved_amount: f64,
    /// Claim amounts of claims with status Declined
    pub total_declined_amount: f64,
    pub approved_claims: usize,
    pub declined_claims: usize,
    pub distinct_clients: usize,
    pub distinct_claims: usize,
    /// Distinct service providers among claims that name one
    pub distinct_providers: usize,
    /// Claim amount per claim type; claims without a type are left out
    pub claims_by_type: BTreeMap<String, f64>,
    /// Approved claims as a percentage of distinct claims
    pub approval_rate: f64,
    /// Declined claims as a percentage of distinct claims
    pub denial_rate: f64,
}

impl ClaimsSummary {
    pub fn compute(claims: &[ClaimRecord]) -> Self {
        if claims.is_empty() {
            return Self::default();
        }
        let n = claims.len() as f64;

        let approved: Vec<&ClaimRecord> = claims.iter().filter(|c| c.is_approved()).collect();
        let declined: Vec<&ClaimRecord> = claims.iter().filter(|c| c.is_declined()).collect();

        let distinct_ids = |cs: &[&ClaimRecord]| {
            cs.iter().map(|c| c.claim_id.as_str()).collect::<HashSet<_>>().len()
        };
        let approved_claims = distinct_ids(&approved);
        let declined_claims = distinct_ids(&declined);
        let distinct_claims = claims
            .iter()
            .map(|c| c.claim_id.as_str())
            .collect::<HashSet<_>>()
            .len();

        let total_claim_amount: f64 = claims.iter().map(|c| c.claim_amount).sum();

        let mut claims_by_type: BTreeMap<String, f64> = BTreeMap::new();
        for claim in claims {
            if let Some(claim_type) = claim.claim_type.as_deref() {
                *claims_by_type.entry(claim_type.to_string()).or_default() += claim.claim_amount;
            }
        }

        Self {
            total_claim_amount,
            average_claim_amount: total_claim_amount / n,
            average_approved_amount: claims.iter().map(|c| c.approved_claim_amount).sum::<f64>() / n,
            total_approved_amount: approved.iter().map(|c| c.approved_claim_amount).sum(),
            total_declined_amount: declined.iter().map(|c| c.claim_amount).sum(),
            approved_claims,
            declined_claims,
            distinct_clients: claims
                .iter()
                .map(|c| normalize_client(&c.client_id))
                .collect::<HashSet<_>>()
                .len(),
            distinct_claims,
            distinct_providers: claims
                .iter()
                .filter_map(|c| c.provider_name.as_deref())
                .collect::<HashSet<_>>()
                .len(),
            claims_by_type,
            approval_rate: rate(approved_claims, distinct_claims),
            denial_rate: rate(declined_claims, distinct_claims),
        }
    }
}

fn rate(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Premium overview metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PremiumSummary {
    pub total_new: f64,
    pub total_renewal: f64,
    pub total_endorsements: f64,
    /// New plus renewal premium
    pub total_base: f64,
    pub new_clients: usize,
    pub renewal_clients: usize,
    pub endorsement_count: usize,
}

impl PremiumSummary {
    pub fn compute(premiums: &[PremiumRecord]) -> Self {
        let total_for = |cover: CoverType| -> f64 {
            premiums
                .iter()
                .filter(|p| p.cover_type == cover)
                .map(|p| p.total_premium)
                .sum()
        };
        let clients_for = |cover: CoverType| -> usize {
            premiums
                .iter()
                .filter(|p| p.cover_type == cover)
                .map(|p| normalize_client(&p.client_id))
                .collect::<HashSet<_>>()
                .len()
        };

        let total_new = total_for(CoverType::New);
        let total_renewal = total_for(CoverType::Renewal);

        Self {
            total_new,
            total_renewal,
            total_endorsements: total_for(CoverType::Endorsement),
            total_base: total_new + total_renewal,
            new_clients: clients_for(CoverType::New),
            renewal_clients: clients_for(CoverType::Renewal),
            endorsement_count: premiums
                .iter()
                .filter(|p| p.cover_type == CoverType::Endorsement)
                .count(),
        }
    }
}

/// Loss ratio over a whole filtered portfolio, rolled up from entity results
///
/// Entities with a degenerate interval have no earned premium and are left
/// out of both sums.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioLossRatio {
    pub total_claims: f64,
    pub total_approved: f64,
    pub earned_premium: f64,
    /// Claims over earned premium
    pub loss_ratio: LossRatio,
    /// Approved amounts over earned premium
    pub approved_loss_ratio: LossRatio,
    pub entities: usize,
    pub excluded_degenerate: usize,
}

impl PortfolioLossRatio {
    pub fn from_results(results: &[LossRatioResult]) -> Self {
        let included: Vec<&LossRatioResult> = results
            .iter()
            .filter(|r| r.status != ResultStatus::DegenerateInterval)
            .collect();

        let total_claims: f64 = included.iter().map(|r| r.total_claims).sum();
        let total_approved: f64 = included
            .iter()
            .filter_map(|r| r.claims.as_ref())
            .map(|c| c.total_approved)
            .sum();
        let earned_premium: f64 = included.iter().filter_map(|r| r.earned_premium).sum();

        Self {
            total_claims,
            total_approved,
            earned_premium,
            loss_ratio: LossRatio::from_amounts(total_claims, earned_premium),
            approved_loss_ratio: LossRatio::from_amounts(total_approved, earned_premium),
            entities: included.len(),
            excluded_degenerate: results.len() - included.len(),
        }
    }
}
