//! Schedule command implementation
//!
//! Runs the batch job every day at `batch.run_at` (UTC) until SIGINT or
//! SIGTERM.

use crate::cli::pipeline::{exit_code_for, load_or_report, Pipeline, EXIT_CONFIG, EXIT_OK};
use crate::core::batch::schedule::run_daily;
use clap::Args;
use tokio::sync::watch;

/// Arguments for the schedule command
#[derive(Args, Debug)]
pub struct ScheduleArgs {
    /// Override batch.run_at (UTC HH:MM)
    #[arg(long)]
    pub run_at: Option<String>,
}

impl ScheduleArgs {
    /// Execute the schedule command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        let mut config = match load_or_report(config_path) {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };

        if let Some(run_at) = &self.run_at {
            tracing::info!(run_at = %run_at, "Overriding run time from CLI");
            config.batch.run_at = run_at.clone();
        }
        let run_at = match config.batch.run_at_time() {
            Ok(t) => t,
            Err(e) => {
                eprintln!("❌ {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        let job = match Pipeline::build(&config) {
            Ok(pipeline) => pipeline.batch_job(&config, config.batch.dry_run).await,
            Err(e) => Err(e),
        };
        let job = match job {
            Ok(j) => j,
            Err(e) => {
                tracing::error!(error = %e, "Failed to initialize scheduler");
                eprintln!("❌ Failed to initialize: {e}");
                return Ok(exit_code_for(&e));
            }
        };

        println!("⏰ Running daily at {} UTC. Press Ctrl+C to stop.", run_at.format("%H:%M"));
        run_daily(&job, run_at, shutdown_signal).await;
        println!("👋 Scheduler stopped");
        Ok(EXIT_OK)
    }
}
