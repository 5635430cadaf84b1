//! Ledger storage abstraction
//!
//! This module defines the trait that storage backends implement to persist
//! processed-visit records.

use crate::core::ledger::record::{LedgerStats, ProcessedVisitRecord};
use crate::domain::ids::VisitId;
use crate::domain::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashSet;

/// Storage backend for the processed-visit ledger
///
/// Implementations must keep at most one record per visit id: `upsert`
/// replaces any existing record for the same visit.
#[async_trait]
pub trait LedgerStorage: Send + Sync {
    /// Test the storage connection
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable.
    async fn test_connection(&self) -> Result<()> {
        Ok(())
    }

    /// Create tables and indexes if they do not exist
    async fn ensure_schema(&self) -> Result<()> {
        Ok(())
    }

    /// Subset of `visit_ids` whose record has status `success`
    async fn find_successful(&self, visit_ids: &[VisitId]) -> Result<HashSet<VisitId>>;

    /// Insert or replace the record for `record.visit_id`
    async fn upsert(&self, record: &ProcessedVisitRecord) -> Result<()>;

    /// Delete the record for `visit_id` if and only if it is failed
    ///
    /// Returns `true` when a record was deleted.
    async fn delete_failed(&self, visit_id: &VisitId) -> Result<bool>;

    /// Failed records for visits closed on `visit_date`
    async fn failed_for_date(&self, visit_date: NaiveDate) -> Result<Vec<ProcessedVisitRecord>>;

    /// Counts by status over `processed_date` in `[from, to]`
    async fn stats(&self, from: NaiveDate, to: NaiveDate) -> Result<LedgerStats>;

    /// The record for one visit, if any
    async fn get(&self, visit_id: &VisitId) -> Result<Option<ProcessedVisitRecord>>;

    /// Backend name for logs
    fn backend_name(&self) -> &str;
}
