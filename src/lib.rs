//! Claims Analytics - earned premium, loss ratio and fraud analytics for insurance claims
//!
//! This library provides:
//! - Premium and claim records with CSV loading
//! - Filtering by year, month range, product, cover type, status and provider
//! - Per client/product/year earned premium and loss ratio
//! - IQR-based outlier classification and fraud metrics
//! - Claims, premium and portfolio summaries

pub mod error;
pub mod records;
pub mod filter;
pub mod loss_ratio;
pub mod fraud;
pub mod summary;

// Re-export commonly used types
pub use error::{AnalyticsError, EntityIssue, Result};
pub use records::{ClaimRecord, ClaimStatus, CoverType, EntityKey, PremiumRecord};
pub use filter::{ClaimFilter, MonthRange, PremiumFilter, YearMonth};
pub use loss_ratio::{EngineConfig, LossRatio, LossRatioEngine, LossRatioReport, LossRatioResult};
pub use fraud::{FraudMetrics, OutlierLevel, OutlierThresholds};
pub use summary::{ClaimsSummary, PortfolioLossRatio, PremiumSummary};
