//! Claim outlier classification and fraud metrics
//!
//! Claim amounts are fenced with the interquartile range: anything above
//! Q3 + 1.5 IQR is a mild outlier, anything above Q3 + 3 IQR an extreme one.

mod outlier;
mod metrics;

pub use outlier::{
    classify_claims, quantile, ClassifiedClaim, OutlierLevel, OutlierThresholds,
    EXTREME_IQR_MULTIPLIER, MILD_IQR_MULTIPLIER,
};
pub use metrics::{
    FraudMetrics, FrequencyEntry, ProviderDiscrepancy, HIGH_DISCREPANCY_FACTOR, TOP_DISCREPANCY_PROVIDERS, TOP_N,
};
