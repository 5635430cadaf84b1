//! Run status shared by the batch and stream drivers

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

/// Counts reported by the last completed run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunCounts {
    pub processed: usize,
    pub skipped: usize,
    pub delivered: usize,
    pub failed: usize,
}

/// Health snapshot of a driver
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ServiceStatus {
    pub running: bool,
    pub last_run_started_at: Option<DateTime<Utc>>,
    pub last_run_finished_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub last_summary: Option<RunCounts>,
}

/// Tracks whether a run is in progress and how the last one ended
#[derive(Default)]
pub struct StatusTracker {
    running: AtomicBool,
    status: RwLock<ServiceStatus>,
}

impl StatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a run as started; `false` when one is already in progress
    pub async fn try_start(&self) -> bool {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        let mut status = self.status.write().await;
        status.running = true;
        status.last_run_started_at = Some(Utc::now());
        true
    }

    /// Marks the run as finished
    pub async fn finish(&self, counts: Option<RunCounts>, error: Option<String>) {
        {
            let mut status = self.status.write().await;
            status.running = false;
            status.last_run_finished_at = Some(Utc::now());
            status.last_error = error;
            if counts.is_some() {
                status.last_summary = counts;
            }
        }
        self.running.store(false, Ordering::Release);
    }

    /// Updates counts while a long-lived run is in progress
    pub async fn update_counts(&self, counts: RunCounts, error: Option<String>) {
        let mut status = self.status.write().await;
        status.last_summary = Some(counts);
        if error.is_some() {
            status.last_error = error;
        }
    }

    pub async fn snapshot(&self) -> ServiceStatus {
        self.status.read().await.clone()
    }
}
