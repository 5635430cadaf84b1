//! Init command implementation
//!
//! This module implements the `init` command for generating a starter
//! configuration file.

use crate::cli::pipeline::{EXIT_CONFIG, EXIT_FATAL, EXIT_OK};
use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "hie-bridge.toml")]
    pub output: String,

    /// Include every optional setting with explanations
    #[arg(long)]
    pub with_examples: bool,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing hie-bridge configuration");
        println!();

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(EXIT_CONFIG);
        }

        let config_content = if self.with_examples {
            Self::generate_config_with_examples()
        } else {
            Self::generate_minimal_config()
        };

        match fs::write(&self.output, config_content) {
            Ok(_) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Edit {} with your AMRS and HIE endpoints", self.output);
                println!("  2. Create a .env file with your credentials:");
                println!("     - AMRS_PASSWORD");
                println!("     - HIE_CLIENT_SECRET");
                println!("     - HIE_BRIDGE_DATABASE_URL (if using PostgreSQL)");
                println!("  3. Validate configuration: hie-bridge validate-config");
                println!("  4. Try a dry run: hie-bridge run --dry-run");
                println!();
                Ok(EXIT_OK)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {e}");
                Ok(EXIT_FATAL)
            }
        }
    }

    /// Generate minimal configuration
    fn generate_minimal_config() -> String {
        r#"# hie-bridge configuration
# AMRS (OpenMRS) to HIE FHIR sync

database_target = "memory"  # memory | postgresql

[amrs]
base_url = "https://amrs.example.org/openmrs"
username = "sync"
password = "${AMRS_PASSWORD}"

[hie]
shr_url = "https://hie.example.org/shr/fhir"
mapping_url = "https://hie.example.org/mappings"
client_registry_url = "https://hie.example.org/client-registry"
health_worker_registry_url = "https://hie.example.org/hwr"
facility_registry_url = "https://hie.example.org/facility-registry"
token_url = "https://hie.example.org/oauth2/token"
client_id = "amrs"
client_secret = "${HIE_CLIENT_SECRET}"

[batch]
run_at = "02:00"

[logging]
local_enabled = false
"#
        .to_string()
    }

    /// Generate configuration with examples and comments
    fn generate_config_with_examples() -> String {
        r#"# hie-bridge configuration
# AMRS (OpenMRS) to HIE FHIR sync
#
# Values of the form ${VAR} are read from the environment (or a .env file).
# Any setting can be overridden with HIE_BRIDGE_<SECTION>_<KEY>, for example
# HIE_BRIDGE_BATCH_DRY_RUN=true.

# ============================================================================
# Ledger Storage
# ============================================================================
# Where processed visits are recorded (postgresql or memory).
# The memory ledger is lost on exit; use it for dry runs and testing only.
database_target = "postgresql"  # postgresql | memory

# ============================================================================
# Application Settings
# ============================================================================
[application]
# Log level (trace, debug, info, warn, error)
log_level = "info"

# development | staging | production
# TLS verification cannot be disabled in production.
environment = "development"

# ============================================================================
# AMRS (OpenMRS) Server
# ============================================================================
[amrs]
# OpenMRS web application root; the REST and FHIR2 APIs live below it
base_url = "https://amrs.example.org/openmrs"
username = "sync"
password = "${AMRS_PASSWORD}"
timeout_seconds = 30

# How long before the target date a visit closed on it may have started
visit_lookback_days = 30

# REST page size (1-1000)
page_size = 100
tls_verify = true

[amrs.retry]
max_retries = 3
initial_delay_ms = 1000
max_delay_ms = 30000
backoff_multiplier = 2.0

# ============================================================================
# HIE Endpoints
# ============================================================================
[hie]
# Shared Health Record endpoint that receives the bundles
shr_url = "https://hie.example.org/shr/fhir"

# Endpoints that receive a copy of every bundle
mirror_urls = []

# Identity mapping service
mapping_url = "https://hie.example.org/mappings"

# Registry bases used in rewritten references
client_registry_url = "https://hie.example.org/client-registry"
health_worker_registry_url = "https://hie.example.org/hwr"
facility_registry_url = "https://hie.example.org/facility-registry"

# OAuth2 client credentials
token_url = "https://hie.example.org/oauth2/token"
client_id = "amrs"
client_secret = "${HIE_CLIENT_SECRET}"

timeout_seconds = 10

# Refresh access tokens this many seconds before they expire
token_refresh_margin_seconds = 60

# Identity mapping cache
mapping_cache_ttl_seconds = 3600
mapping_cache_capacity = 10000

# Receives stream events that failed every retry
dead_letter_url = "https://hie.example.org/dead-letter"
tls_verify = true

[hie.retry]
max_retries = 3
initial_delay_ms = 1000
max_delay_ms = 30000
backoff_multiplier = 2.0

# ============================================================================
# Batch Driver
# ============================================================================
[batch]
# Daily run time (UTC, HH:MM). Each run syncs the visits closed the day before.
run_at = "02:00"

# Build bundles without posting them or writing the ledger
dry_run = false

# ============================================================================
# Stream Consumer
# ============================================================================
[stream]
# Retries after the first failure before an event is dead-lettered
max_retries = 3
initial_delay_ms = 500
max_delay_ms = 10000
backoff_multiplier = 2.0

# ============================================================================
# Observation Routing
# ============================================================================
[transform]
# Concept codes added to the built-in drug-order and clinical-note sets
drug_concepts = []
note_concepts = []

# ============================================================================
# PostgreSQL Ledger
# ============================================================================
[postgresql]
connection_string = "${HIE_BRIDGE_DATABASE_URL}"
max_connections = 10
connection_timeout_seconds = 30
statement_timeout_seconds = 60

# disable | allow | prefer | require | verify-ca | verify-full
ssl_mode = "prefer"

# ============================================================================
# Logging
# ============================================================================
[logging]
# JSON log files in addition to the console
local_enabled = true
local_path = "/var/log/hie-bridge"

# daily | hourly
local_rotation = "daily"
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BridgeConfig;

    #[test]
    fn test_minimal_config_parses() {
        let config: BridgeConfig = toml::from_str(&InitArgs::generate_minimal_config()).unwrap();
        assert_eq!(config.batch.run_at, "02:00");
        assert!(config.postgresql.is_none());
    }

    #[test]
    fn test_example_config_parses() {
        let config: BridgeConfig =
            toml::from_str(&InitArgs::generate_config_with_examples()).unwrap();
        assert_eq!(config.hie.token_refresh_margin_seconds, 60);
        assert_eq!(config.stream.initial_delay_ms, 500);
        assert!(config.postgresql.is_some());
    }

    #[tokio::test]
    async fn test_existing_file_is_not_overwritten() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let args = InitArgs {
            output: file.path().to_str().unwrap().to_string(),
            with_examples: false,
            force: false,
        };
        assert_eq!(args.execute().await.unwrap(), EXIT_CONFIG);
    }
}
