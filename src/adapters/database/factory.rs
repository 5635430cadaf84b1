//! Ledger storage factory
//!
//! This module creates the ledger storage backend selected by configuration.

use crate::adapters::database::traits::LedgerStorage;
use crate::adapters::memory::InMemoryLedger;
use crate::adapters::postgresql::adapter::PostgreSQLAdapter;
use crate::adapters::postgresql::client::PostgreSQLClient;
use crate::config::{BridgeConfig, DatabaseTarget};
use crate::domain::{BridgeError, Result};
use std::sync::Arc;

/// Create the ledger storage named by `database_target`
///
/// The PostgreSQL backend has its schema applied before it is returned.
///
/// # Errors
///
/// Returns an error if the PostgreSQL section is missing, the pool cannot be
/// created, or the schema migration fails.
pub async fn create_ledger_storage(config: &BridgeConfig) -> Result<Arc<dyn LedgerStorage>> {
    match config.database_target {
        DatabaseTarget::PostgreSQL => {
            let pg_config = config.postgresql.as_ref().ok_or_else(|| {
                BridgeError::Configuration(
                    "database_target is postgresql but [postgresql] is missing".to_string(),
                )
            })?;

            tracing::info!("Creating PostgreSQL ledger storage");
            let client = PostgreSQLClient::new(pg_config.clone()).await?;
            let adapter = PostgreSQLAdapter::new(client);
            adapter.ensure_schema().await?;

            Ok(Arc::new(adapter))
        }
        DatabaseTarget::Memory => {
            tracing::info!("Creating in-memory ledger storage");
            Ok(Arc::new(InMemoryLedger::new()))
        }
    }
}
