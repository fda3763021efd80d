//! Premium side: prioritisation, endorsement matching and aggregation

use chrono::NaiveDate;
use log::debug;
use std::collections::BTreeMap;

use super::types::{ClientProductYearAggregate, EndorsementTotal, PrioritizedPremium};
use crate::records::{CoverType, EntityKey, PremiumRecord};

/// Choose one base premium per entity
///
/// Records of the highest-priority cover type present win (Renewal > New >
/// Endorsement). Every entity in the input yields exactly one base.
pub fn prioritize_premiums<'a, I>(records: I) -> BTreeMap<EntityKey, PrioritizedPremium>
where
    I: IntoIterator<Item = &'a PremiumRecord>,
{
    let mut groups: BTreeMap<EntityKey, Vec<&PremiumRecord>> = BTreeMap::new();
    for record in records {
        groups.entry(record.key()).or_default().push(record);
    }

    let mut prioritized = BTreeMap::new();
    for (key, group) in groups {
        // Groups are never empty
        let Some(cover_type) = group.iter().map(|r| r.cover_type).max() else {
            continue;
        };
        let tier: Vec<&PremiumRecord> = group
            .into_iter()
            .filter(|r| r.cover_type == cover_type)
            .collect();

        let start_date = tier.iter().map(|r| r.start_date).min();
        let end_date = tier.iter().map(|r| r.end_date).max();
        let (Some(start_date), Some(end_date)) = (start_date, end_date) else {
            continue;
        };

        let base = PrioritizedPremium {
            key: key.clone(),
            cover_type,
            start_date,
            end_date,
            total_premium: tier.iter().map(|r| r.total_premium).sum(),
            record_count: tier.len(),
        };
        if base.is_fallback() {
            debug!("{}: no New or Renewal cover, base taken from endorsements", key);
        }
        prioritized.insert(key, base);
    }

    prioritized
}

/// Sum endorsement premiums contained in their entity's base interval
///
/// Endorsements of entities whose base is itself built from endorsements are
/// part of that base and are not matched again. Endorsements outside the
/// base interval are counted as unmatched and excluded.
pub fn match_endorsements<'a, I>(
    records: I,
    prioritized: &BTreeMap<EntityKey, PrioritizedPremium>,
) -> BTreeMap<EntityKey, EndorsementTotal>
where
    I: IntoIterator<Item = &'a PremiumRecord>,
{
    let mut totals: BTreeMap<EntityKey, EndorsementTotal> = BTreeMap::new();

    for record in records
        .into_iter()
        .filter(|r| r.cover_type == CoverType::Endorsement)
    {
        let key = record.key();
        let Some(base) = prioritized.get(&key) else {
            continue;
        };
        if base.is_fallback() {
            continue;
        }

        let entry = totals.entry(key).or_default();
        if record.contained_in(base.start_date, base.end_date) {
            entry.premium += record.total_premium;
            entry.matched += 1;
        } else {
            entry.unmatched += 1;
            debug!(
                "{}: endorsement {} to {} outside base {} to {}, excluded",
                base.key, record.start_date, record.end_date, base.start_date, base.end_date
            );
        }
    }

    totals
}

/// Combine base and endorsement premium and derive the cover day counts
pub fn aggregate_premiums(
    prioritized: &BTreeMap<EntityKey, PrioritizedPremium>,
    endorsements: &BTreeMap<EntityKey, EndorsementTotal>,
    reference_date: NaiveDate,
) -> BTreeMap<EntityKey, ClientProductYearAggregate> {
    prioritized
        .iter()
        .map(|(key, base)| {
            let endorsement = endorsements.get(key);
            let endorsement_premium = endorsement.map_or(0.0, |e| e.premium);

            let aggregate = ClientProductYearAggregate {
                key: key.clone(),
                start_date: base.start_date,
                end_date: base.end_date,
                base_premium: base.total_premium,
                endorsement_premium,
                total_premium: base.total_premium + endorsement_premium,
                days_since_start: (reference_date - base.start_date).num_days(),
                days_on_cover: (base.end_date - base.start_date).num_days(),
                base_cover_type: base.cover_type,
                unmatched_endorsements: endorsement.map_or(0, |e| e.unmatched),
            };
            (key.clone(), aggregate)
        })
        .collect()
}
