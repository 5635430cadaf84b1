//! Clear command implementation
//!
//! Removes the failed ledger record of a visit. The next batch run for its
//! date then treats the visit as never attempted. Successful records are
//! never removed.

use crate::adapters::database::create_ledger_storage;
use crate::cli::pipeline::{exit_code_for, load_or_report, EXIT_FATAL, EXIT_OK};
use crate::core::ledger::ProcessedVisitLedger;
use crate::domain::VisitId;
use clap::Args;

/// Arguments for the clear command
#[derive(Args, Debug)]
pub struct ClearArgs {
    /// Visit whose failed record is removed
    pub visit_id: String,
}

impl ClearArgs {
    /// Execute the clear command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let visit_id = match VisitId::new(self.visit_id.as_str()) {
            Ok(id) => id,
            Err(e) => {
                eprintln!("❌ {e}");
                return Ok(EXIT_FATAL);
            }
        };

        let config = match load_or_report(config_path) {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };
        let ledger = match create_ledger_storage(&config).await {
            Ok(s) => ProcessedVisitLedger::new(s),
            Err(e) => {
                eprintln!("❌ Failed to connect to the ledger: {e}");
                return Ok(exit_code_for(&e));
            }
        };

        match ledger.clear_failure(&visit_id).await {
            Ok(true) => {
                tracing::info!(visit_id = %visit_id, "Cleared failed visit");
                println!("✅ Cleared failed record for visit {visit_id}");
                Ok(EXIT_OK)
            }
            Ok(false) => {
                match ledger.get_record(&visit_id).await {
                    Ok(Some(record)) if record.is_success() => {
                        println!("ℹ️  Visit {visit_id} was delivered; successful records are kept");
                    }
                    _ => println!("ℹ️  No failed record for visit {visit_id}"),
                }
                Ok(EXIT_OK)
            }
            Err(e) => {
                eprintln!("❌ Failed to clear visit {visit_id}: {e}");
                Ok(exit_code_for(&e))
            }
        }
    }
}
