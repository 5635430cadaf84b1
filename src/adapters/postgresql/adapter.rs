//! PostgreSQL adapter implementing ledger storage
//!
//! This module provides the implementation of [`LedgerStorage`] for
//! PostgreSQL.

use crate::adapters::database::traits::LedgerStorage;
use crate::adapters::postgresql::client::PostgreSQLClient;
use crate::adapters::postgresql::models::{parse_status, ProcessedVisitRow};
use crate::core::ledger::record::{LedgerStats, ProcessedVisitRecord};
use crate::domain::ids::VisitId;
use crate::domain::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashSet;
use std::sync::Arc;

/// PostgreSQL implementation of [`LedgerStorage`]
pub struct PostgreSQLAdapter {
    client: Arc<PostgreSQLClient>,
}

impl PostgreSQLAdapter {
    /// Create a new PostgreSQL adapter
    pub fn new(client: PostgreSQLClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    /// Get a reference to the underlying client
    pub fn client(&self) -> &Arc<PostgreSQLClient> {
        &self.client
    }
}

#[async_trait]
impl LedgerStorage for PostgreSQLAdapter {
    async fn test_connection(&self) -> Result<()> {
        self.client.test_connection().await
    }

    async fn ensure_schema(&self) -> Result<()> {
        self.client.ensure_schema().await
    }

    async fn find_successful(&self, visit_ids: &[VisitId]) -> Result<HashSet<VisitId>> {
        if visit_ids.is_empty() {
            return Ok(HashSet::new());
        }

        let ids: Vec<&str> = visit_ids.iter().map(VisitId::as_str).collect();
        let query = "SELECT visit_id FROM processed_visits \
                     WHERE status = 'success' AND visit_id = ANY($1)";
        let rows = self.client.query(query, &[&ids]).await?;

        let found: HashSet<String> = rows.iter().map(|row| row.get::<_, String>(0)).collect();
        Ok(visit_ids
            .iter()
            .filter(|id| found.contains(id.as_str()))
            .cloned()
            .collect())
    }

    async fn upsert(&self, record: &ProcessedVisitRecord) -> Result<()> {
        let row = ProcessedVisitRow::from_domain(record);

        let upsert_query = r#"
            INSERT INTO processed_visits (
                visit_id, patient_id, visit_date, status, http_status,
                error_message, processed_at, processed_date
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (visit_id) DO UPDATE SET
                patient_id = EXCLUDED.patient_id,
                visit_date = EXCLUDED.visit_date,
                status = EXCLUDED.status,
                http_status = EXCLUDED.http_status,
                error_message = EXCLUDED.error_message,
                processed_at = EXCLUDED.processed_at,
                processed_date = EXCLUDED.processed_date
        "#;

        self.client
            .execute(
                upsert_query,
                &[
                    &row.visit_id,
                    &row.patient_id,
                    &row.visit_date,
                    &row.status,
                    &row.http_status,
                    &row.error_message,
                    &row.processed_at,
                    &row.processed_date,
                ],
            )
            .await?;

        tracing::debug!(
            visit_id = %record.visit_id,
            status = %record.status,
            "Ledger record written to PostgreSQL"
        );
        Ok(())
    }

    async fn delete_failed(&self, visit_id: &VisitId) -> Result<bool> {
        let deleted = self
            .client
            .execute(
                "DELETE FROM processed_visits WHERE visit_id = $1 AND status = 'failed'",
                &[&visit_id.as_str()],
            )
            .await?;
        Ok(deleted > 0)
    }

    async fn failed_for_date(&self, visit_date: NaiveDate) -> Result<Vec<ProcessedVisitRecord>> {
        let query = "SELECT * FROM processed_visits \
                     WHERE status = 'failed' AND visit_date = $1 ORDER BY visit_id";
        let rows = self.client.query(query, &[&visit_date]).await?;

        rows.iter()
            .map(|row| ProcessedVisitRow::from_row(row).to_domain())
            .collect()
    }

    async fn stats(&self, from: NaiveDate, to: NaiveDate) -> Result<LedgerStats> {
        let query = r#"
            SELECT processed_date, status, COUNT(*) AS count
            FROM processed_visits
            WHERE processed_date BETWEEN $1 AND $2
            GROUP BY processed_date, status
            ORDER BY processed_date
        "#;
        let rows = self.client.query(query, &[&from, &to]).await?;

        let mut stats = LedgerStats::empty(from, to);
        for row in rows {
            let day: NaiveDate = row.get("processed_date");
            let status = parse_status(row.get("status"))?;
            let count: i64 = row.get("count");
            stats.add(day, status, count.max(0) as u64);
        }
        Ok(stats)
    }

    async fn get(&self, visit_id: &VisitId) -> Result<Option<ProcessedVisitRecord>> {
        let rows = self
            .client
            .query(
                "SELECT * FROM processed_visits WHERE visit_id = $1",
                &[&visit_id.as_str()],
            )
            .await?;

        rows.first()
            .map(|row| ProcessedVisitRow::from_row(row).to_domain())
            .transpose()
    }

    fn backend_name(&self) -> &str {
        "postgresql"
    }
}
