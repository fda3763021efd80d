//! Outer join of premium and claims aggregates into loss ratio results

use log::warn;
use std::collections::{BTreeMap, BTreeSet};

use super::types::{
    ClaimsAggregate, ClientProductYearAggregate, LossRatio, LossRatioResult, ResultStatus,
};
use crate::error::EntityIssue;
use crate::records::EntityKey;

/// Resolve one result per entity present on either side, ordered by key
///
/// A missing side is treated as zero only when computing the ratio; the
/// result keeps the side as `None` and records `MissingJoinKey`.
pub fn resolve_loss_ratios(
    premiums: BTreeMap<EntityKey, ClientProductYearAggregate>,
    claims: BTreeMap<EntityKey, ClaimsAggregate>,
) -> Vec<LossRatioResult> {
    let keys: BTreeSet<EntityKey> = premiums.keys().chain(claims.keys()).cloned().collect();
    let mut premiums = premiums;
    let mut claims = claims;

    keys.into_iter()
        .map(|key| {
            let premium = premiums.remove(&key);
            let claim = claims.remove(&key);
            resolve_entity(key, premium, claim)
        })
        .collect()
}

/// Resolve a single entity from its (optional) premium and claims sides
pub fn resolve_entity(
    key: EntityKey,
    premium: Option<ClientProductYearAggregate>,
    claims: Option<ClaimsAggregate>,
) -> LossRatioResult {
    let mut issues = Vec::new();
    if premium.is_none() || claims.is_none() {
        issues.push(EntityIssue::MissingJoinKey);
    }
    if premium.as_ref().map_or(false, |p| p.unmatched_endorsements > 0) {
        issues.push(EntityIssue::UnmatchedEndorsement);
    }

    let total_claims = claims.as_ref().map_or(0.0, |c| c.total_claims);
    let earned = match &premium {
        Some(p) => p.earned_premium(),
        None => Ok(0.0),
    };

    let (earned_premium, loss_ratio, status) = match earned {
        Ok(earned) => {
            let ratio = LossRatio::from_amounts(total_claims, earned);
            let status = if ratio.is_undefined() {
                issues.push(EntityIssue::UndefinedRatio);
                ResultStatus::UndefinedRatio
            } else {
                ResultStatus::Valid
            };
            (Some(earned), ratio, status)
        }
        // earned_premium only fails on a degenerate interval
        Err(e) => {
            warn!("{}, earned premium not computed", e);
            issues.push(EntityIssue::DegenerateInterval);
            (None, LossRatio::Undefined, ResultStatus::DegenerateInterval)
        }
    };

    LossRatioResult {
        key,
        premium,
        claims,
        earned_premium,
        total_claims,
        loss_ratio,
        status,
        issues,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::CoverType;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn key(client: &str) -> EntityKey {
        EntityKey::new(client, "Health", 2024)
    }

    fn premium(client: &str, total: f64, days_since_start: i64, days_on_cover: i64) -> ClientProductYearAggregate {
        ClientProductYearAggregate {
            key: key(client),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            base_premium: total,
            endorsement_premium: 0.0,
            total_premium: total,
            days_since_start,
            days_on_cover,
            base_cover_type: CoverType::Renewal,
            unmatched_endorsements: 0,
        }
    }

    fn claims(total: f64) -> ClaimsAggregate {
        ClaimsAggregate {
            total_claims: total,
            total_approved: total,
            claim_count: 1,
        }
    }

    #[test]
    fn test_full_outer_join() {
        let mut premiums = BTreeMap::new();
        premiums.insert(key("A"), premium("A", 365.0, 100, 365));
        premiums.insert(key("B"), premium("B", 365.0, 100, 365));
        let mut claim_map = BTreeMap::new();
        claim_map.insert(key("B"), claims(50.0));
        claim_map.insert(key("C"), claims(10.0));

        let results = resolve_loss_ratios(premiums, claim_map);
        let clients: Vec<_> = results.iter().map(|r| r.key.client_id.as_str()).collect();
        assert_eq!(clients, vec!["A", "B", "C"]);

        // Premium only: zero claims, zero loss ratio
        let a = &results[0];
        assert!(a.claims.is_none());
        assert_eq!(a.total_claims, 0.0);
        assert_eq!(a.loss_ratio, LossRatio::Percent(0.0));
        assert_eq!(a.status, ResultStatus::Valid);
        assert!(a.has_issue(EntityIssue::MissingJoinKey));

        // Both sides
        let b = &results[1];
        assert_relative_eq!(b.earned_premium.unwrap(), 100.0);
        assert_relative_eq!(b.loss_ratio.percent().unwrap(), 50.0);
        assert!(b.issues.is_empty());

        // Claims only: earned premium zero, ratio undefined
        let c = &results[2];
        assert!(c.premium.is_none());
        assert_eq!(c.earned_premium, Some(0.0));
        assert_eq!(c.loss_ratio, LossRatio::Undefined);
        assert_eq!(c.status, ResultStatus::UndefinedRatio);
        assert!(c.has_issue(EntityIssue::MissingJoinKey));
        assert!(c.has_issue(EntityIssue::UndefinedRatio));
    }

    #[test]
    fn test_zero_earned_premium_is_undefined_regardless_of_claims() {
        // Reference date equal to the start date: nothing earned yet
        for total_claims in [0.0, 1_000.0] {
            let result = resolve_entity(key("A"), Some(premium("A", 1_000.0, 0, 365)), Some(claims(total_claims)));
            assert_eq!(result.earned_premium, Some(0.0));
            assert_eq!(result.loss_ratio, LossRatio::Undefined);
            assert_eq!(result.status, ResultStatus::UndefinedRatio);
        }
    }

    #[test]
    fn test_negative_earned_premium_is_undefined() {
        let result = resolve_entity(key("A"), Some(premium("A", 1_000.0, -10, 365)), Some(claims(5.0)));
        assert!(result.earned_premium.unwrap() < 0.0);
        assert_eq!(result.status, ResultStatus::UndefinedRatio);
    }

    #[test]
    fn test_degenerate_interval_flagged() {
        let result = resolve_entity(key("A"), Some(premium("A", 1_000.0, 10, 0)), Some(claims(5.0)));
        assert_eq!(result.status, ResultStatus::DegenerateInterval);
        assert_eq!(result.earned_premium, None);
        assert_eq!(result.loss_ratio, LossRatio::Undefined);
        assert!(result.has_issue(EntityIssue::DegenerateInterval));
        assert!(!result.has_issue(EntityIssue::UndefinedRatio));
    }

    #[test]
    fn test_unmatched_endorsement_flagged() {
        let mut p = premium("A", 1_000.0, 10, 365);
        p.unmatched_endorsements = 2;
        let result = resolve_entity(key("A"), Some(p), Some(claims(5.0)));
        assert_eq!(result.status, ResultStatus::Valid);
        assert!(result.has_issue(EntityIssue::UnmatchedEndorsement));
    }

    #[test]
    fn test_row_export() {
        let result = resolve_entity(key("A"), Some(premium("A", 365.0, 100, 365)), None);
        let row = result.to_row();
        assert_eq!(row.client_id, "A");
        assert_eq!(row.year, 2024);
        assert_eq!(row.status, "valid");
        assert_eq!(row.issues, "missing_join_key");
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["loss_ratio_pct"], serde_json::json!(0.0));

        let row = resolve_entity(key("B"), None, Some(claims(1.0))).to_row();
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["loss_ratio_pct"], serde_json::json!("undefined"));
        assert_eq!(json["status"], serde_json::json!("undefined_ratio"));
    }
}
