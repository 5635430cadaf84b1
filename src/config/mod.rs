//! Configuration management for hie-bridge.
//!
//! hie-bridge reads a TOML file with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `HIE_BRIDGE_<SECTION>_<KEY>` environment overrides
//! - Default values for optional settings
//! - Validation on load
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use hie_bridge::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("hie-bridge.toml")?;
//! println!("AMRS: {}", config.amrs.base_url);
//! println!("SHR: {}", config.hie.shr_url);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - log level and runtime environment
//! - [`AmrsConfig`] - AMRS REST connection, credentials and retries
//! - [`HieConfig`] - SHR, registries, mapping and token endpoints, caches
//! - [`BatchConfig`] - daily run time and dry-run switch
//! - [`StreamConfig`] - retry policy of the event consumer
//! - [`TransformConfig`] - extra drug and clinical-note concept codes
//! - [`PostgreSQLConfig`] - ledger database
//! - [`LoggingConfig`] - JSON file logging
//!
//! # Environment Variables
//!
//! ```bash
//! export AMRS_PASSWORD="secret-password"
//! export HIE_CLIENT_SECRET="secret"
//! export HIE_BRIDGE_BATCH_DRY_RUN=true
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

// Re-export commonly used types
pub use loader::load_config;
pub use schema::{
    AmrsConfig, ApplicationConfig, BatchConfig, BridgeConfig, DatabaseTarget, Environment,
    HieConfig, LoggingConfig, PostgreSQLConfig, RetryConfig, StreamConfig, TransformConfig,
};
pub use secret::{secret_string, SecretString, SecretValue};
