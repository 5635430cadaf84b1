//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the hie-bridge configuration file.

use crate::adapters::postgresql::client::redact_connection_string;
use crate::cli::pipeline::{EXIT_CONFIG, EXIT_OK};
use crate::config::load_config;
use crate::config::schema::DatabaseTarget;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        // load_config validates as well
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Configuration is invalid");
                println!("   Error: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Environment: {:?}", config.application.environment);
        println!("  Log Level: {}", config.application.log_level);
        println!("  AMRS Server: {}", config.amrs.base_url);
        println!("  SHR Endpoint: {}", config.hie.shr_url);
        if !config.hie.mirror_urls.is_empty() {
            println!("  Mirrors: {}", config.hie.mirror_urls.join(", "));
        }
        println!("  Mapping Endpoint: {}", config.hie.mapping_url);
        println!(
            "  Dead-letter Endpoint: {}",
            config.hie.dead_letter_url.as_deref().unwrap_or("(none)")
        );
        println!("  Daily Run: {} UTC", config.batch.run_at);
        println!("  Dry Run: {}", config.batch.dry_run);

        match config.database_target {
            DatabaseTarget::PostgreSQL => {
                if let Some(ref pg_config) = config.postgresql {
                    use secrecy::ExposeSecret;
                    println!("  Ledger: PostgreSQL");
                    println!(
                        "  PostgreSQL Connection: {}",
                        redact_connection_string(pg_config.connection_string.expose_secret().as_str())
                    );
                    println!("  Max Connections: {}", pg_config.max_connections);
                }
            }
            DatabaseTarget::Memory => {
                println!("  Ledger: in-memory (records are lost on exit)");
            }
        }
        println!();
        Ok(EXIT_OK)
    }
}
