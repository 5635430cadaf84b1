//! Run command implementation
//!
//! This module implements the `run` command, a single batch run for the
//! visits closed on the day before `--date`.

use crate::cli::pipeline::{
    exit_code_for, load_or_report, Pipeline, EXIT_OK, EXIT_PARTIAL,
};
use crate::core::batch::BatchSummary;
use crate::domain::parse_visit_date;
use chrono::{NaiveDate, Utc};
use clap::Args;

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Run date (YYYY-MM-DD); visits closed the day before are synced. Defaults to today (UTC)
    #[arg(long, value_parser = parse_visit_date)]
    pub date: Option<NaiveDate>,

    /// Build bundles without posting them or writing the ledger
    #[arg(long)]
    pub dry_run: bool,
}

impl RunArgs {
    /// Execute the run command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let config = match load_or_report(config_path) {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };

        let dry_run = self.dry_run || config.batch.dry_run;
        let date = self.date.unwrap_or_else(|| Utc::now().date_naive());

        if dry_run {
            tracing::info!("Dry run mode enabled - nothing will be posted or recorded");
            println!("🔍 DRY RUN MODE - bundles are built but not posted");
            println!();
        }

        let pipeline = match Pipeline::build(&config) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(error = %e, "Failed to create clients");
                eprintln!("❌ Failed to initialize: {e}");
                return Ok(exit_code_for(&e));
            }
        };
        let job = match pipeline.batch_job(&config, dry_run).await {
            Ok(j) => j,
            Err(e) => {
                tracing::error!(error = %e, "Failed to open ledger");
                eprintln!("❌ Failed to open ledger: {e}");
                return Ok(exit_code_for(&e));
            }
        };

        println!("🚀 Syncing visits closed on {}...", date.pred_opt().unwrap_or(date));
        println!();

        let summary = match job.execute_batch_job(date).await {
            Ok(s) => s,
            Err(e) => {
                eprintln!("❌ Batch run failed: {e}");
                return Ok(exit_code_for(&e));
            }
        };

        print_summary(&summary);

        if summary.is_clean() {
            println!("✅ Batch completed successfully!");
            Ok(EXIT_OK)
        } else {
            println!("⚠️  Batch completed with failed visits");
            Ok(EXIT_PARTIAL)
        }
    }
}

fn print_summary(summary: &BatchSummary) {
    println!("📊 Batch Summary:");
    println!("  Target Date: {}", summary.target_date);
    println!("  Processed: {}", summary.processed_count);
    println!("  Skipped (already delivered): {}", summary.skipped_count);
    println!("  Delivered: {}", summary.delivered_count);
    println!("  Failed: {}", summary.failed_count);
    println!("  Duration: {:.2}s", summary.duration.as_secs_f64());
    println!();

    if !summary.errors.is_empty() {
        println!("⚠️  Failed visits:");
        for error in summary.errors.iter().take(10) {
            println!("  - {} (patient {}): {}", error.visit_id, error.patient_id, error.message);
        }
        if summary.errors.len() > 10 {
            println!("  ... and {} more", summary.errors.len() - 10);
        }
        println!();
    }
}
