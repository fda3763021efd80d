//! Loss ratio engine: filter, group, join and derive in one batch pass

use chrono::NaiveDate;
use log::info;
use serde::Serialize;

use super::claims::aggregate_claims;
use super::premium::{aggregate_premiums, match_endorsements, prioritize_premiums};
use super::resolver::resolve_loss_ratios;
use super::types::{LossRatioResult, LossRatioRow, ResultStatus};
use crate::error::EntityIssue;
use crate::filter::{ClaimFilter, PremiumFilter};
use crate::records::{ClaimRecord, EntityKey, PremiumRecord};
use crate::summary::PortfolioLossRatio;

/// Configuration for a loss ratio run
///
/// There is no `Default`: the reference date drives days_since_start and has
/// to be supplied by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Date earned premium is measured at
    pub reference_date: NaiveDate,

    /// Applied to premium records before prioritisation
    pub premium_filter: PremiumFilter,

    /// Applied to claim records before aggregation
    pub claim_filter: ClaimFilter,
}

impl EngineConfig {
    /// Unfiltered run measured at `reference_date`
    pub fn as_of(reference_date: NaiveDate) -> Self {
        Self {
            reference_date,
            premium_filter: PremiumFilter::default(),
            claim_filter: ClaimFilter::default(),
        }
    }

    pub fn with_premium_filter(mut self, filter: PremiumFilter) -> Self {
        self.premium_filter = filter;
        self
    }

    pub fn with_claim_filter(mut self, filter: ClaimFilter) -> Self {
        self.claim_filter = filter;
        self
    }
}

/// Counters describing what happened during a run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunDiagnostics {
    pub premiums_in: usize,
    pub premiums_kept: usize,
    pub claims_in: usize,
    pub claims_kept: usize,
    pub entities: usize,
    pub matched_endorsements: usize,
    pub unmatched_endorsements: usize,
    /// Entities whose base premium came from endorsements
    pub fallback_bases: usize,
    /// Entities with premiums but no claims
    pub premium_only: usize,
    /// Entities with claims but no premiums
    pub claims_only: usize,
    pub degenerate_intervals: usize,
    pub undefined_ratios: usize,
}

/// Output of a loss ratio run
#[derive(Debug, Clone, Serialize)]
pub struct LossRatioReport {
    pub reference_date: NaiveDate,
    /// One result per entity, ordered by key
    pub results: Vec<LossRatioResult>,
    pub diagnostics: RunDiagnostics,
}

impl LossRatioReport {
    pub fn get(&self, key: &EntityKey) -> Option<&LossRatioResult> {
        self.results
            .binary_search_by(|r| r.key.cmp(key))
            .ok()
            .map(|i| &self.results[i])
    }

    pub fn rows(&self) -> Vec<LossRatioRow> {
        self.results.iter().map(|r| r.to_row()).collect()
    }

    /// Results carrying a usable loss ratio
    pub fn valid(&self) -> impl Iterator<Item = &LossRatioResult> {
        self.results.iter().filter(|r| r.status == ResultStatus::Valid)
    }

    pub fn portfolio(&self) -> PortfolioLossRatio {
        PortfolioLossRatio::from_results(&self.results)
    }
}

/// Earned premium and loss ratio engine
///
/// A pure function of (premiums, claims, filters, reference date): running it
/// twice on the same inputs produces the same report.
pub struct LossRatioEngine {
    config: EngineConfig,
}

impl LossRatioEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run the full computation
    pub fn run(&self, premiums: &[PremiumRecord], claims: &[ClaimRecord]) -> LossRatioReport {
        let premium_filter = &self.config.premium_filter;
        let claim_filter = &self.config.claim_filter;

        let premiums_kept: Vec<&PremiumRecord> =
            premiums.iter().filter(|p| premium_filter.matches(p)).collect();

        let thresholds = claim_filter.outlier_thresholds(claims);
        let claims_kept: Vec<&ClaimRecord> = claims
            .iter()
            .filter(|c| claim_filter.matches(c, thresholds.as_ref()))
            .collect();

        let prioritized = prioritize_premiums(premiums_kept.iter().copied());
        let endorsements = match_endorsements(premiums_kept.iter().copied(), &prioritized);
        let premium_aggregates =
            aggregate_premiums(&prioritized, &endorsements, self.config.reference_date);
        let claim_aggregates = aggregate_claims(claims_kept.iter().copied());

        let results = resolve_loss_ratios(premium_aggregates, claim_aggregates);

        let diagnostics = RunDiagnostics {
            premiums_in: premiums.len(),
            premiums_kept: premiums_kept.len(),
            claims_in: claims.len(),
            claims_kept: claims_kept.len(),
            entities: results.len(),
            matched_endorsements: endorsements.values().map(|e| e.matched).sum(),
            unmatched_endorsements: endorsements.values().map(|e| e.unmatched).sum(),
            fallback_bases: prioritized.values().filter(|p| p.is_fallback()).count(),
            premium_only: results.iter().filter(|r| r.claims.is_none()).count(),
            claims_only: results.iter().filter(|r| r.premium.is_none()).count(),
            degenerate_intervals: count_issue(&results, EntityIssue::DegenerateInterval),
            undefined_ratios: count_issue(&results, EntityIssue::UndefinedRatio),
        };

        info!(
            "Loss ratio run as of {}: {} entities ({} degenerate, {} undefined), {} of {} endorsements matched",
            self.config.reference_date,
            diagnostics.entities,
            diagnostics.degenerate_intervals,
            diagnostics.undefined_ratios,
            diagnostics.matched_endorsements,
            diagnostics.matched_endorsements + diagnostics.unmatched_endorsements,
        );

        LossRatioReport {
            reference_date: self.config.reference_date,
            results,
            diagnostics,
        }
    }
}

fn count_issue(results: &[LossRatioResult], issue: EntityIssue) -> usize {
    results.iter().filter(|r| r.has_issue(issue)).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{ClaimStatus, CoverType};
    use crate::loss_ratio::LossRatio;
    use approx::assert_relative_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn acme_premiums() -> Vec<PremiumRecord> {
        vec![
            PremiumRecord::new("ACME", "Health", CoverType::Renewal, date(2024, 1, 1), date(2024, 12, 31), 1_000_000.0),
            PremiumRecord::new("ACME", "Health", CoverType::Endorsement, date(2024, 3, 1), date(2024, 6, 30), 200_000.0),
        ]
    }

    fn acme_claims() -> Vec<ClaimRecord> {
        vec![
            ClaimRecord::new("ACME", "Health", "C1", 60_000.0, 55_000.0, date(2024, 4, 2))
                .with_status(ClaimStatus::Approved),
            ClaimRecord::new("ACME", "Health", "C2", 40_000.0, 0.0, date(2024, 5, 9))
                .with_status(ClaimStatus::Declined),
        ]
    }

    fn acme_key() -> EntityKey {
        EntityKey::new("ACME", "Health", 2024)
    }

    #[test]
    fn test_acme_scenario() {
        let engine = LossRatioEngine::new(EngineConfig::as_of(date(2024, 7, 1)));
        let report = engine.run(&acme_premiums(), &acme_claims());

        assert_eq!(report.results.len(), 1);
        let result = report.get(&acme_key()).unwrap();
        let premium = result.premium.as_ref().unwrap();
        assert_relative_eq!(premium.total_premium, 1_200_000.0);
        assert_eq!(premium.days_since_start, 182);
        assert_eq!(premium.days_on_cover, 365);

        let earned = result.earned_premium.unwrap();
        assert_relative_eq!(earned, 598_356.16, epsilon = 0.01);
        assert_relative_eq!(result.total_claims, 100_000.0);

        let pct = result.loss_ratio.percent().unwrap();
        assert_relative_eq!(pct, 100.0 * 100_000.0 / earned);
        assert_relative_eq!(pct, 16.71, epsilon = 0.01);
        assert_eq!(result.status, ResultStatus::Valid);
        assert!(result.issues.is_empty());

        assert_eq!(report.diagnostics.matched_endorsements, 1);
        assert_eq!(report.diagnostics.unmatched_endorsements, 0);
    }

    #[test]
    fn test_overhanging_endorsement_excluded() {
        let mut premiums = acme_premiums();
        premiums.push(PremiumRecord::new(
            "ACME",
            "Health",
            CoverType::Endorsement,
            date(2024, 1, 15),
            date(2025, 1, 15),
            500_000.0,
        ));
        let report = LossRatioEngine::new(EngineConfig::as_of(date(2024, 7, 1)))
            .run(&premiums, &acme_claims());

        let result = report.get(&acme_key()).unwrap();
        assert_relative_eq!(result.premium.as_ref().unwrap().total_premium, 1_200_000.0);
        assert!(result.has_issue(EntityIssue::UnmatchedEndorsement));
        assert_eq!(report.diagnostics.unmatched_endorsements, 1);
    }

    #[test]
    fn test_degenerate_interval_does_not_abort_batch() {
        let mut premiums = acme_premiums();
        premiums.push(PremiumRecord::new(
            "Globex",
            "Health",
            CoverType::New,
            date(2024, 5, 1),
            date(2024, 5, 1),
            10_000.0,
        ));
        let report = LossRatioEngine::new(EngineConfig::as_of(date(2024, 7, 1)))
            .run(&premiums, &acme_claims());

        assert_eq!(report.results.len(), 2);
        let globex = report.get(&EntityKey::new("Globex", "Health", 2024)).unwrap();
        assert_eq!(globex.status, ResultStatus::DegenerateInterval);
        assert_eq!(globex.earned_premium, None);
        assert_eq!(globex.loss_ratio, LossRatio::Undefined);

        assert_eq!(report.get(&acme_key()).unwrap().status, ResultStatus::Valid);
        assert_eq!(report.diagnostics.degenerate_intervals, 1);
        assert_eq!(report.valid().count(), 1);
    }

    #[test]
    fn test_run_is_idempotent_with_fixed_reference_date() {
        let engine = LossRatioEngine::new(EngineConfig::as_of(date(2024, 9, 30)));
        let first = engine.run(&acme_premiums(), &acme_claims());
        let second = engine.run(&acme_premiums(), &acme_claims());
        assert_eq!(first.results, second.results);
        assert_eq!(first.diagnostics, second.diagnostics);
    }

    #[test]
    fn test_later_reference_date_earns_more() {
        let early = LossRatioEngine::new(EngineConfig::as_of(date(2024, 4, 1)))
            .run(&acme_premiums(), &acme_claims());
        let late = LossRatioEngine::new(EngineConfig::as_of(date(2024, 10, 1)))
            .run(&acme_premiums(), &acme_claims());

        let early_earned = early.get(&acme_key()).unwrap().earned_premium.unwrap();
        let late_earned = late.get(&acme_key()).unwrap().earned_premium.unwrap();
        assert!(late_earned > early_earned);
    }

    #[test]
    fn test_filters_applied_before_aggregation() {
        let config = EngineConfig::as_of(date(2024, 7, 1)).with_claim_filter(ClaimFilter {
            statuses: vec![ClaimStatus::Approved],
            ..Default::default()
        });
        let report = LossRatioEngine::new(config).run(&acme_premiums(), &acme_claims());
        assert_eq!(report.diagnostics.claims_in, 2);
        assert_eq!(report.diagnostics.claims_kept, 1);
        assert_relative_eq!(report.get(&acme_key()).unwrap().total_claims, 60_000.0);

        // Dropping endorsements by cover type removes them from the total
        let config = EngineConfig::as_of(date(2024, 7, 1)).with_premium_filter(PremiumFilter {
            cover_types: vec![CoverType::Renewal],
            ..Default::default()
        });
        let report = LossRatioEngine::new(config).run(&acme_premiums(), &acme_claims());
        let premium = report.get(&acme_key()).unwrap().premium.clone().unwrap();
        assert_relative_eq!(premium.total_premium, 1_000_000.0);
    }

    #[test]
    fn test_claims_without_premium() {
        let claims = vec![ClaimRecord::new("Initech", "Health", "X1", 5_000.0, 5_000.0, date(2024, 2, 2))];
        let report = LossRatioEngine::new(EngineConfig::as_of(date(2024, 7, 1)))
            .run(&acme_premiums(), &claims);

        assert_eq!(report.diagnostics.entities, 2);
        assert_eq!(report.diagnostics.claims_only, 1);
        assert_eq!(report.diagnostics.premium_only, 1);
        let initech = report.get(&EntityKey::new("INITECH", "Health", 2024)).unwrap();
        assert_eq!(initech.loss_ratio, LossRatio::Undefined);
        assert_eq!(initech.status, ResultStatus::UndefinedRatio);
    }

    #[test]
    fn test_endorsement_only_entity_uses_fallback_base() {
        let mut premiums = acme_premiums();
        premiums.push(PremiumRecord::new(
            "Umbrella",
            "Health",
            CoverType::Endorsement,
            date(2024, 3, 1),
            date(2024, 6, 30),
            30_000.0,
        ));
        premiums.push(PremiumRecord::new(
            "Umbrella",
            "Health",
            CoverType::Endorsement,
            date(2024, 5, 1),
            date(2024, 10, 31),
            40_000.0,
        ));
        let report = LossRatioEngine::new(EngineConfig::as_of(date(2024, 7, 1)))
            .run(&premiums, &acme_claims());

        assert_eq!(report.diagnostics.fallback_bases, 1);
        // Only the ACME endorsement is matched; Umbrella's endorsements form its base
        assert_eq!(report.diagnostics.matched_endorsements, 1);
        assert_eq!(report.diagnostics.unmatched_endorsements, 0);

        let umbrella = report.get(&EntityKey::new("Umbrella", "Health", 2024)).unwrap();
        assert!(umbrella.is_fallback_base());
        let premium = umbrella.premium.as_ref().unwrap();
        assert_eq!(premium.start_date, date(2024, 3, 1));
        assert_eq!(premium.end_date, date(2024, 10, 31));
        assert_relative_eq!(premium.base_premium, 70_000.0);
        assert_relative_eq!(premium.endorsement_premium, 0.0);
        assert_eq!(premium.days_on_cover, 244);
        assert_relative_eq!(umbrella.earned_premium.unwrap(), 35_000.0);

        assert!(!report.get(&acme_key()).unwrap().is_fallback_base());
    }

    #[test]
    fn test_non_finite_claim_amount_is_never_valid() {
        let claims = vec![ClaimRecord::new("ACME", "Health", "C1", f64::NAN, 0.0, date(2024, 4, 2))];
        let report = LossRatioEngine::new(EngineConfig::as_of(date(2024, 7, 1)))
            .run(&acme_premiums(), &claims);

        let result = report.get(&acme_key()).unwrap();
        assert_eq!(result.loss_ratio, LossRatio::Undefined);
        assert_eq!(result.status, ResultStatus::UndefinedRatio);
        assert_eq!(report.valid().count(), 0);

        let json = serde_json::to_value(result.to_row()).unwrap();
        assert_eq!(json["loss_ratio_pct"], serde_json::json!("undefined"));
        assert_eq!(json["status"], serde_json::json!("undefined_ratio"));
    }

    #[test]
    fn test_empty_inputs() {
        let report = LossRatioEngine::new(EngineConfig::as_of(date(2024, 7, 1))).run(&[], &[]);
        assert!(report.results.is_empty());
        assert_eq!(report.diagnostics, RunDiagnostics::default());
    }
}
