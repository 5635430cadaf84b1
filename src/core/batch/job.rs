//! Batch job - daily driver of the visit sync
//!
//! Runs for the visits closed the day before the given date: discovers
//! them, drops those already delivered, then builds, posts and records one
//! bundle per remaining visit. Visit failures are isolated; only discovery
//! and ledger lookup failures abort the run.

use super::summary::BatchSummary;
use crate::adapters::amrs::{ClinicalDataSource, VisitSource};
use crate::adapters::hie::BundleSink;
use crate::core::delivery::deliver;
use crate::core::discovery::VisitDiscovery;
use crate::core::ledger::ProcessedVisitLedger;
use crate::core::status::{ServiceStatus, StatusTracker};
use crate::core::transform::FhirTransformer;
use crate::domain::{
    BridgeError, ClinicalDataset, PatientId, Result, Visit, VisitErrorDetail,
};
use crate::{log_visit_outcome, log_visit_start};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// Batch sync driver
pub struct BatchJob {
    discovery: VisitDiscovery,
    data_source: Arc<dyn ClinicalDataSource>,
    transformer: Arc<FhirTransformer>,
    sink: Arc<dyn BundleSink>,
    ledger: ProcessedVisitLedger,
    dry_run: bool,
    status: StatusTracker,
}

/// State that lives for one run
struct RunContext {
    target_date: NaiveDate,
    batch_timestamp: DateTime<Utc>,
    datasets: HashMap<PatientId, ClinicalDataset>,
}

impl BatchJob {
    pub fn new(
        visit_source: Arc<dyn VisitSource>,
        data_source: Arc<dyn ClinicalDataSource>,
        transformer: Arc<FhirTransformer>,
        sink: Arc<dyn BundleSink>,
        ledger: ProcessedVisitLedger,
    ) -> Self {
        Self {
            discovery: VisitDiscovery::new(visit_source),
            data_source,
            transformer,
            sink,
            ledger,
            dry_run: false,
            status: StatusTracker::new(),
        }
    }

    /// Build bundles without posting them or writing the ledger
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub async fn status(&self) -> ServiceStatus {
        self.status.snapshot().await
    }

    /// Syncs the visits closed on the day before `date`
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::State`] when a run is already in progress,
    /// [`BridgeError::Query`] when discovery fails, and ledger errors when
    /// already-processed visits cannot be looked up.
    pub async fn execute_batch_job(&self, date: NaiveDate) -> Result<BatchSummary> {
        if !self.status.try_start().await {
            return Err(BridgeError::State("batch already running".to_string()));
        }

        let result = self.run(date).await;
        match &result {
            Ok(summary) => {
                summary.log_summary();
                self.status.finish(Some(summary.counts()), None).await;
            }
            Err(e) => {
                tracing::error!(date = %date, error = %e, "Batch run aborted");
                self.status.finish(None, Some(e.to_string())).await;
            }
        }
        result
    }

    async fn run(&self, date: NaiveDate) -> Result<BatchSummary> {
        let start_time = Instant::now();
        let batch_timestamp = Utc::now();
        let target_date = date
            .pred_opt()
            .ok_or_else(|| BridgeError::Validation(format!("No day before {date}")))?;

        let mut summary = BatchSummary::new(date, target_date);
        summary.dry_run = self.dry_run;

        tracing::info!(
            date = %date,
            target_date = %target_date,
            dry_run = self.dry_run,
            "Starting batch run"
        );

        let closed = self.discovery.find_closed_visits_on(target_date).await?;
        let visit_ids = closed.visit_ids();
        if visit_ids.is_empty() {
            tracing::info!(target_date = %target_date, "No closed visits");
            return Ok(summary.with_duration(start_time.elapsed()));
        }

        let processed = self.ledger.find_processed(&visit_ids).await?;
        summary.skipped_count = processed.len();

        let mut ctx = RunContext {
            target_date,
            batch_timestamp,
            datasets: HashMap::new(),
        };

        for visit in closed.visits() {
            if processed.contains(&visit.visit_id) {
                tracing::debug!(visit_id = %visit.visit_id, "Visit already delivered");
                continue;
            }

            summary.processed_count += 1;
            log_visit_start!(visit.visit_id, visit.patient_id);

            match self.process_visit(visit, &mut ctx).await {
                Ok(Some(http_status)) => {
                    summary.delivered_count += 1;
                    log_visit_outcome!(visit.visit_id, visit.patient_id, true, Some(http_status));
                }
                Ok(None) => {
                    tracing::info!(visit_id = %visit.visit_id, "DRY RUN: bundle built, not posted");
                }
                Err(e) => {
                    let http_status = e.http_status();
                    log_visit_outcome!(visit.visit_id, visit.patient_id, false, http_status);
                    self.record_failure(visit, &ctx, &e).await;
                    summary.add_failure(
                        VisitErrorDetail::new(
                            visit.visit_id.as_str(),
                            visit.patient_id.as_str(),
                            e.to_string(),
                        )
                        .with_http_status(http_status),
                    );
                }
            }
        }

        Ok(summary.with_duration(start_time.elapsed()))
    }

    /// Builds and delivers one visit; `None` in dry-run mode
    async fn process_visit(&self, visit: &Visit, ctx: &mut RunContext) -> Result<Option<u16>> {
        let dataset = match ctx.datasets.entry(visit.patient_id.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let fetched = self
                    .data_source
                    .get_patient_data_for_date(&visit.patient_id, ctx.target_date)
                    .await?;
                entry.insert(fetched)
            }
        };

        let visit_data = dataset.for_visit(visit.visit_id.as_str());
        if visit_data.encounters.is_empty() {
            return Err(BridgeError::Validation(format!(
                "No encounters found for visit {}",
                visit.visit_id
            )));
        }

        let bundle = self
            .transformer
            .transform_at(&visit_data, ctx.batch_timestamp)
            .await?;

        if self.dry_run {
            tracing::debug!(
                visit_id = %visit.visit_id,
                bundle_id = %bundle.id,
                entries = bundle.len(),
                "DRY RUN: would post bundle"
            );
            return Ok(None);
        }

        let http_status = deliver(self.sink.as_ref(), &bundle).await?;

        if let Err(e) = self
            .ledger
            .mark_success(
                &visit.visit_id,
                &visit.patient_id,
                ctx.target_date,
                http_status,
                ctx.batch_timestamp,
            )
            .await
        {
            // delivered, but the next run will post it again
            tracing::error!(visit_id = %visit.visit_id, error = %e, "Failed to record delivered visit");
        }

        Ok(Some(http_status))
    }

    async fn record_failure(&self, visit: &Visit, ctx: &RunContext, error: &BridgeError) {
        if self.dry_run {
            return;
        }
        if let Err(e) = self
            .ledger
            .mark_failure(
                &visit.visit_id,
                &visit.patient_id,
                ctx.target_date,
                &error.to_string(),
                ctx.batch_timestamp,
                error.http_status(),
            )
            .await
        {
            tracing::error!(visit_id = %visit.visit_id, error = %e, "Failed to record failed visit");
        }
    }
}
