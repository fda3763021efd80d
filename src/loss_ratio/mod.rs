//! Earned premium and loss ratio computation
//!
//! The computation runs per (client, product, year) entity:
//! 1. **Prioritise**: choose the base premium (Renewal > New > Endorsement)
//! 2. **Match endorsements**: add endorsements contained in the base interval
//! 3. **Aggregate premiums**: total premium, days on cover, earned premium
//! 4. **Aggregate claims**: sum claim amounts
//! 5. **Resolve**: outer join both sides and derive the loss ratio
//!
//! # Example
//!
//! ```rust,ignore
//! use claims_analytics::loss_ratio::{EngineConfig, LossRatioEngine};
//!
//! let as_of = chrono::NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
//! let engine = LossRatioEngine::new(EngineConfig::as_of(as_of));
//! let report = engine.run(&premiums, &claims);
//! for row in report.rows() {
//!     println!("{} {} {}: {}", row.client_id, row.product, row.year, row.loss_ratio_pct);
//! }
//! ```

mod types;
mod premium;
mod claims;
mod resolver;
mod engine;

pub use types::{
    ClaimsAggregate, ClientProductYearAggregate, EndorsementTotal, LossRatio, LossRatioResult,
    LossRatioRow, PrioritizedPremium, ResultStatus,
};
pub use premium::{aggregate_premiums, match_endorsements, prioritize_premiums};
pub use claims::aggregate_claims;
pub use resolver::{resolve_entity, resolve_loss_ratios};
pub use engine::{EngineConfig, LossRatioEngine, LossRatioReport, RunDiagnostics};
