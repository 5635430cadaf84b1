//! Processed-visit ledger
//!
//! [`ProcessedVisitLedger`] is the pipeline's view of visit delivery state.
//! It turns delivery outcomes into records and answers which visits still
//! need work.

use super::record::{LedgerStats, ProcessedVisitRecord};
use crate::adapters::database::traits::LedgerStorage;
use crate::domain::ids::{PatientId, VisitId};
use crate::domain::Result;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashSet;
use std::sync::Arc;

/// Durable at-most-once tracking of delivered visits
#[derive(Clone)]
pub struct ProcessedVisitLedger {
    storage: Arc<dyn LedgerStorage>,
}

impl ProcessedVisitLedger {
    pub fn new(storage: Arc<dyn LedgerStorage>) -> Self {
        Self { storage }
    }

    /// Visit ids that were already delivered successfully
    ///
    /// Failed records are not returned, so failed visits are retried.
    pub async fn find_processed(&self, visit_ids: &[VisitId]) -> Result<HashSet<VisitId>> {
        self.storage.find_successful(visit_ids).await
    }

    /// Records a successful delivery, clearing any earlier error
    pub async fn mark_success(
        &self,
        visit_id: &VisitId,
        patient_id: &PatientId,
        visit_date: NaiveDate,
        http_status: u16,
        batch_timestamp: DateTime<Utc>,
    ) -> Result<()> {
        let record = ProcessedVisitRecord::success(
            visit_id.clone(),
            patient_id.clone(),
            visit_date,
            http_status,
            batch_timestamp,
        );
        self.storage.upsert(&record).await
    }

    /// Records a failed delivery
    pub async fn mark_failure(
        &self,
        visit_id: &VisitId,
        patient_id: &PatientId,
        visit_date: NaiveDate,
        error_message: &str,
        batch_timestamp: DateTime<Utc>,
        http_status: Option<u16>,
    ) -> Result<()> {
        let record = ProcessedVisitRecord::failure(
            visit_id.clone(),
            patient_id.clone(),
            visit_date,
            error_message,
            batch_timestamp,
            http_status,
        );
        self.storage.upsert(&record).await
    }

    /// Deletes a failed record; successful records are never deleted
    pub async fn clear_failure(&self, visit_id: &VisitId) -> Result<bool> {
        let cleared = self.storage.delete_failed(visit_id).await?;
        if cleared {
            tracing::info!(visit_id = %visit_id, "Cleared failed ledger record");
        }
        Ok(cleared)
    }

    pub async fn get_failed_for_date(&self, date: NaiveDate) -> Result<Vec<ProcessedVisitRecord>> {
        self.storage.failed_for_date(date).await
    }

    /// Counts by status over `processed_date` in `[from, to]`
    pub async fn get_stats(&self, from: NaiveDate, to: NaiveDate) -> Result<LedgerStats> {
        self.storage.stats(from, to).await
    }

    pub async fn get_record(&self, visit_id: &VisitId) -> Result<Option<ProcessedVisitRecord>> {
        self.storage.get(visit_id).await
    }

    pub fn backend_name(&self) -> &str {
        self.storage.backend_name()
    }
}
