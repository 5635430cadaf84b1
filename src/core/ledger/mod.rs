//! Processed-visit ledger
//!
//! Tracks which visits have been delivered so that each visit reaches the
//! HIE at most once, while failed visits are retried by later runs.

pub mod manager;
pub mod record;

pub use manager::ProcessedVisitLedger;
pub use record::{DailyStats, LedgerStats, ProcessedVisitRecord, VisitStatus};
