//! Batch run summary and reporting

use crate::core::status::RunCounts;
use crate::domain::VisitErrorDetail;
use chrono::NaiveDate;
use std::time::Duration;

/// Summary of one batch run
#[derive(Debug, Clone)]
pub struct BatchSummary {
    /// Whether the run completed; per-visit failures do not clear this
    pub success: bool,

    /// Date the run was started for
    pub date: NaiveDate,

    /// Date whose closed visits were processed (`date` − 1 day)
    pub target_date: NaiveDate,

    /// Visits attempted in this run
    pub processed_count: usize,

    /// Visits skipped because they were already delivered
    pub skipped_count: usize,

    /// Visits whose bundle was accepted
    pub delivered_count: usize,

    /// Visits that failed
    pub failed_count: usize,

    /// Bundles were built but neither posted nor recorded
    pub dry_run: bool,

    /// Duration of the run
    pub duration: Duration,

    /// Per-visit errors
    pub errors: Vec<VisitErrorDetail>,
}

impl BatchSummary {
    pub fn new(date: NaiveDate, target_date: NaiveDate) -> Self {
        Self {
            success: true,
            date,
            target_date,
            processed_count: 0,
            skipped_count: 0,
            delivered_count: 0,
            failed_count: 0,
            dry_run: false,
            duration: Duration::ZERO,
            errors: Vec::new(),
        }
    }

    /// Set the duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Record a failed visit
    pub fn add_failure(&mut self, error: VisitErrorDetail) {
        self.failed_count += 1;
        self.errors.push(error);
    }

    /// True when the run completed without failed visits
    pub fn is_clean(&self) -> bool {
        self.success && self.failed_count == 0
    }

    pub fn counts(&self) -> RunCounts {
        RunCounts {
            processed: self.processed_count,
            skipped: self.skipped_count,
            delivered: self.delivered_count,
            failed: self.failed_count,
        }
    }

    /// Log the summary
    pub fn log_summary(&self) {
        tracing::info!(
            date = %self.date,
            target_date = %self.target_date,
            processed = self.processed_count,
            skipped = self.skipped_count,
            delivered = self.delivered_count,
            failed = self.failed_count,
            dry_run = self.dry_run,
            duration_secs = self.duration.as_secs(),
            "Batch run completed"
        );

        for error in &self.errors {
            tracing::warn!(
                visit_id = %error.visit_id,
                patient_id = %error.patient_id,
                http_status = ?error.http_status,
                message = %error.message,
                "Visit failed"
            );
        }
    }
}
