//! In-memory ledger storage
//!
//! Used for dry runs, `database_target = "memory"` and tests. Records live
//! for the lifetime of the process.

use crate::adapters::database::traits::LedgerStorage;
use crate::core::ledger::record::{LedgerStats, ProcessedVisitRecord, VisitStatus};
use crate::domain::ids::VisitId;
use crate::domain::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemoryLedger {
    records: RwLock<HashMap<VisitId, ProcessedVisitRecord>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records held
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl LedgerStorage for InMemoryLedger {
    async fn find_successful(&self, visit_ids: &[VisitId]) -> Result<HashSet<VisitId>> {
        let records = self.records.read().await;
        Ok(visit_ids
            .iter()
            .filter(|id| records.get(*id).is_some_and(ProcessedVisitRecord::is_success))
            .cloned()
            .collect())
    }

    async fn upsert(&self, record: &ProcessedVisitRecord) -> Result<()> {
        self.records
            .write()
            .await
            .insert(record.visit_id.clone(), record.clone());
        Ok(())
    }

    async fn delete_failed(&self, visit_id: &VisitId) -> Result<bool> {
        let mut records = self.records.write().await;
        match records.get(visit_id) {
            Some(record) if record.status == VisitStatus::Failed => {
                records.remove(visit_id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn failed_for_date(&self, visit_date: NaiveDate) -> Result<Vec<ProcessedVisitRecord>> {
        let records = self.records.read().await;
        let mut failed: Vec<ProcessedVisitRecord> = records
            .values()
            .filter(|r| r.status == VisitStatus::Failed && r.visit_date == visit_date)
            .cloned()
            .collect();
        failed.sort_by(|a, b| a.visit_id.cmp(&b.visit_id));
        Ok(failed)
    }

    async fn stats(&self, from: NaiveDate, to: NaiveDate) -> Result<LedgerStats> {
        let records = self.records.read().await;
        let mut stats = LedgerStats::empty(from, to);
        for record in records
            .values()
            .filter(|r| r.processed_date >= from && r.processed_date <= to)
        {
            stats.add(record.processed_date, record.status, 1);
        }
        Ok(stats)
    }

    async fn get(&self, visit_id: &VisitId) -> Result<Option<ProcessedVisitRecord>> {
        Ok(self.records.read().await.get(visit_id).cloned())
    }

    fn backend_name(&self) -> &str {
        "memory"
    }
}
