//! Claims side: sum claim amounts per entity

use std::collections::BTreeMap;

use super::types::ClaimsAggregate;
use crate::records::{ClaimRecord, EntityKey};

/// Group claims by entity and sum their amounts
pub fn aggregate_claims<'a, I>(claims: I) -> BTreeMap<EntityKey, ClaimsAggregate>
where
    I: IntoIterator<Item = &'a ClaimRecord>,
{
    let mut aggregates: BTreeMap<EntityKey, ClaimsAggregate> = BTreeMap::new();
    for claim in claims {
        let agg = aggregates.entry(claim.key()).or_default();
        agg.total_claims += claim.claim_amount;
        agg.total_approved += claim.approved_claim_amount;
        agg.claim_count += 1;
    }
    aggregates
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_aggregate_claims() {
        let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day).unwrap();
        let claims = vec![
            ClaimRecord::new("Acme", "Health", "C1", 60_000.0, 50_000.0, d(2024, 2, 1)),
            ClaimRecord::new("ACME ", "Health", "C2", 40_000.0, 40_000.0, d(2024, 9, 1)),
            ClaimRecord::new("Acme", "Health", "C3", 5_000.0, 0.0, d(2023, 9, 1)),
        ];
        let aggregates = aggregate_claims(&claims);
        assert_eq!(aggregates.len(), 2);

        let acme_2024 = &aggregates[&EntityKey::new("ACME", "Health", 2024)];
        assert_eq!(acme_2024.total_claims, 100_000.0);
        assert_eq!(acme_2024.total_approved, 90_000.0);
        assert_eq!(acme_2024.claim_count, 2);

        assert_eq!(aggregates[&EntityKey::new("ACME", "Health", 2023)].claim_count, 1);
    }

    #[test]
    fn test_aggregate_no_claims() {
        assert!(aggregate_claims(&Vec::<ClaimRecord>::new()).is_empty());
    }
}
