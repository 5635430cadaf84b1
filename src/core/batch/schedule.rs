//! Daily scheduling of the batch job

use super::job::BatchJob;
use chrono::{DateTime, Duration, NaiveTime, Utc};
use tokio::sync::watch;

/// Next instant at or after `now` whose UTC time of day is `run_at`
///
/// A `run_at` equal to the current time schedules for tomorrow.
pub fn next_run_after(now: DateTime<Utc>, run_at: NaiveTime) -> DateTime<Utc> {
    let today = now.date_naive().and_time(run_at).and_utc();
    if today > now {
        today
    } else {
        today + Duration::days(1)
    }
}

/// Runs the job once a day at `run_at` until shutdown is signalled
///
/// Each run is started for the current UTC date, so it syncs the visits
/// closed the day before. Aborted runs are logged and the schedule goes on.
pub async fn run_daily(job: &BatchJob, run_at: NaiveTime, mut shutdown: watch::Receiver<bool>) {
    loop {
        let now = Utc::now();
        let next = next_run_after(now, run_at);
        let wait = (next - now).to_std().unwrap_or_default();
        tracing::info!(next_run = %next, "Batch scheduled");

        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    tracing::info!("Scheduler stopping");
                    return;
                }
                continue;
            }
        }

        let date = Utc::now().date_naive();
        match job.execute_batch_job(date).await {
            Ok(summary) if !summary.is_clean() => {
                tracing::warn!(failed = summary.failed_count, "Scheduled run had failed visits");
            }
            Ok(_) => {}
            Err(e) => tracing::error!(error = %e, "Scheduled run aborted"),
        }

        if *shutdown.borrow() {
            tracing::info!("Scheduler stopping");
            return;
        }
    }
}
