//! Wiring shared by the CLI commands

use crate::adapters::amrs::AmrsClient;
use crate::adapters::database::create_ledger_storage;
use crate::adapters::hie::HieClient;
use crate::config::{load_config, BridgeConfig};
use crate::core::batch::BatchJob;
use crate::core::ledger::ProcessedVisitLedger;
use crate::core::mapping::IdentityMappingService;
use crate::core::stream::FhirEventConsumer;
use crate::core::transform::FhirTransformer;
use crate::domain::{AmrsError, BridgeError, HieError};
use std::sync::Arc;

/// Exit code for a completed run
pub const EXIT_OK: i32 = 0;
/// Run completed but some visits or events failed
pub const EXIT_PARTIAL: i32 = 1;
/// Configuration could not be loaded or is invalid
pub const EXIT_CONFIG: i32 = 2;
/// A backing service could not be reached
pub const EXIT_CONNECTION: i32 = 4;
/// Anything else
pub const EXIT_FATAL: i32 = 5;

/// Maps an error that ended a command to its exit code
pub fn exit_code_for(error: &BridgeError) -> i32 {
    match error {
        BridgeError::Configuration(_) => EXIT_CONFIG,
        BridgeError::Connection(_)
        | BridgeError::Database(_)
        | BridgeError::Authentication(_)
        | BridgeError::Amrs(AmrsError::ConnectionFailed(_))
        | BridgeError::Amrs(AmrsError::AuthenticationFailed(_))
        | BridgeError::Amrs(AmrsError::Timeout(_))
        | BridgeError::Hie(HieError::ConnectionFailed(_))
        | BridgeError::Hie(HieError::TokenFailed(_))
        | BridgeError::Hie(HieError::Timeout(_)) => EXIT_CONNECTION,
        _ => EXIT_FATAL,
    }
}

/// Loads the configuration, printing the failure
pub fn load_or_report(config_path: &str) -> Result<BridgeConfig, i32> {
    load_config(config_path).map_err(|e| {
        tracing::error!(error = %e, config_path, "Failed to load configuration");
        eprintln!("❌ Failed to load configuration: {e}");
        EXIT_CONFIG
    })
}

/// Clients and services built from one configuration
pub struct Pipeline {
    pub amrs: Arc<AmrsClient>,
    pub hie: Arc<HieClient>,
    pub transformer: Arc<FhirTransformer>,
}

impl Pipeline {
    pub fn build(config: &BridgeConfig) -> crate::domain::Result<Self> {
        let amrs = Arc::new(AmrsClient::new(config.amrs.clone())?);
        let hie = Arc::new(HieClient::new(config.hie.clone())?);
        let mapping = Arc::new(IdentityMappingService::from_config(hie.clone(), &config.hie));
        let transformer = Arc::new(FhirTransformer::from_config(mapping, config));
        Ok(Self {
            amrs,
            hie,
            transformer,
        })
    }

    /// Batch job over the ledger selected by `database_target`
    pub async fn batch_job(&self, config: &BridgeConfig, dry_run: bool) -> crate::domain::Result<BatchJob> {
        let ledger = ProcessedVisitLedger::new(create_ledger_storage(config).await?);
        tracing::info!(backend = ledger.backend_name(), "Ledger ready");
        Ok(BatchJob::new(
            self.amrs.clone(),
            self.amrs.clone(),
            self.transformer.clone(),
            self.hie.clone(),
            ledger,
        )
        .with_dry_run(dry_run))
    }

    pub fn consumer(&self, config: &BridgeConfig) -> FhirEventConsumer {
        FhirEventConsumer::new(
            self.hie.clone(),
            self.transformer.clone(),
            self.hie.clone(),
            self.hie.clone(),
            config.stream.retry_policy(),
        )
    }
}
