//! Status command implementation
//!
//! This module implements the `status` command, which reports ledger
//! statistics and, optionally, the failed visits of one day.

use crate::adapters::database::create_ledger_storage;
use crate::cli::pipeline::{exit_code_for, load_or_report, EXIT_OK};
use crate::core::ledger::ProcessedVisitLedger;
use crate::domain::parse_visit_date;
use chrono::{Duration, NaiveDate, Utc};
use clap::Args;

/// Days covered when no range is given
const DEFAULT_RANGE_DAYS: i64 = 7;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// First processing day (YYYY-MM-DD); defaults to a week ago
    #[arg(long, value_parser = parse_visit_date)]
    pub from: Option<NaiveDate>,

    /// Last processing day (YYYY-MM-DD); defaults to today (UTC)
    #[arg(long, value_parser = parse_visit_date)]
    pub to: Option<NaiveDate>,

    /// List the visits that failed on this visit date
    #[arg(long, value_parser = parse_visit_date)]
    pub failed_on: Option<NaiveDate>,
}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Checking ledger status");

        let config = match load_or_report(config_path) {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };

        let ledger = match create_ledger_storage(&config).await {
            Ok(s) => ProcessedVisitLedger::new(s),
            Err(e) => {
                println!("❌ Failed to connect to the ledger");
                println!("   Error: {e}");
                return Ok(exit_code_for(&e));
            }
        };

        let to = self.to.unwrap_or_else(|| Utc::now().date_naive());
        let from = self
            .from
            .unwrap_or_else(|| to - Duration::days(DEFAULT_RANGE_DAYS - 1));

        let stats = match ledger.get_stats(from, to).await {
            Ok(s) => s,
            Err(e) => {
                println!("❌ Failed to load ledger statistics");
                println!("   Error: {e}");
                return Ok(exit_code_for(&e));
            }
        };

        println!("📊 Ledger Status ({})", ledger.backend_name());
        println!("  Range: {from} .. {to}");
        println!("  Delivered: {}", stats.success);
        println!("  Failed: {}", stats.failed);
        println!();

        if stats.total() == 0 {
            println!("No visits processed in this range.");
        } else {
            println!("{:<12} {:>10} {:>10}", "Day", "Delivered", "Failed");
            println!("{}", "-".repeat(34));
            for (day, counts) in &stats.by_day {
                println!("{:<12} {:>10} {:>10}", day, counts.success, counts.failed);
            }
        }
        println!();

        if let Some(date) = self.failed_on {
            let failed = match ledger.get_failed_for_date(date).await {
                Ok(f) => f,
                Err(e) => {
                    println!("❌ Failed to load failed visits");
                    println!("   Error: {e}");
                    return Ok(exit_code_for(&e));
                }
            };
            println!("Failed visits for {date}: {}", failed.len());
            for record in failed {
                println!(
                    "  - {} (patient {}, status {}): {}",
                    record.visit_id,
                    record.patient_id,
                    record
                        .http_status
                        .map_or_else(|| "-".to_string(), |s| s.to_string()),
                    record.error_message.as_deref().unwrap_or("")
                );
            }
            println!();
        }

        Ok(EXIT_OK)
    }
}
