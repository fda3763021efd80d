//! Premium and claim records and CSV loading

mod data;
pub mod loader;

pub use data::{normalize_client, ClaimRecord, ClaimStatus, CoverType, EntityKey, PremiumRecord};
pub use loader::{
    load_claims, load_claims_from_reader, load_default_claims, load_default_premiums,
    load_premiums, load_premiums_from_reader,
};
