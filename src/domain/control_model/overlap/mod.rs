pub mod overlap_claim;
pub mod overlap_ledger;
