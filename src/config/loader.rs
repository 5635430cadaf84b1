//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::BridgeConfig;
use super::secret::secret_string;
use crate::domain::errors::BridgeError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Prefix of environment variables that override configuration values
pub const ENV_PREFIX: &str = "HIE_BRIDGE";

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into BridgeConfig
/// 4. Applies environment variable overrides (HIE_BRIDGE_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns an error if:
/// - File cannot be read
/// - TOML parsing fails
/// - A referenced environment variable is not set
/// - Configuration validation fails
///
/// # Examples
///
/// ```no_run
/// use hie_bridge::config::loader::load_config;
///
/// let config = load_config("hie-bridge.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<BridgeConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(BridgeError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        BridgeError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    let contents = substitute_env_vars(&contents)?;

    let mut config: BridgeConfig = toml::from_str(&contents)
        .map_err(|e| BridgeError::Configuration(format!("Failed to parse TOML: {}", e)))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        BridgeError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are left untouched.
///
/// # Errors
///
/// Returns an error listing every referenced environment variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| BridgeError::Configuration(format!("Invalid substitution pattern: {e}")))?;
    let mut lines = Vec::new();
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            lines.push(line.to_string());
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    processed_line = processed_line.replace(&format!("${{{var_name}}}"), &value);
                }
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        lines.push(processed_line);
    }

    if !missing_vars.is_empty() {
        return Err(BridgeError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(lines.join("\n"))
}

fn env(key: &str) -> Option<String> {
    std::env::var(format!("{ENV_PREFIX}_{key}")).ok()
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match env(key) {
        Some(raw) => raw.parse().map(Some).map_err(|_| {
            BridgeError::Configuration(format!(
                "Invalid value '{raw}' for environment variable {ENV_PREFIX}_{key}"
            ))
        }),
        None => Ok(None),
    }
}

/// Applies environment variable overrides using HIE_BRIDGE_* prefix
///
/// Environment variables follow the pattern: HIE_BRIDGE_<SECTION>_<KEY>
/// For example: HIE_BRIDGE_AMRS_BASE_URL, HIE_BRIDGE_BATCH_DRY_RUN
fn apply_env_overrides(config: &mut BridgeConfig) -> Result<()> {
    // Application overrides
    if let Some(val) = env("APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }
    if let Some(val) = env("APPLICATION_ENVIRONMENT") {
        config.application.environment = toml::Value::String(val.clone())
            .try_into()
            .map_err(|_| BridgeError::Configuration(format!("Invalid environment '{val}'")))?;
    }

    // AMRS overrides
    if let Some(val) = env("AMRS_BASE_URL") {
        config.amrs.base_url = val;
    }
    if let Some(val) = env("AMRS_USERNAME") {
        config.amrs.username = val;
    }
    if let Some(val) = env("AMRS_PASSWORD") {
        config.amrs.password = secret_string(val);
    }
    if let Some(val) = env_parsed("AMRS_TIMEOUT_SECONDS")? {
        config.amrs.timeout_seconds = val;
    }
    if let Some(val) = env_parsed("AMRS_VISIT_LOOKBACK_DAYS")? {
        config.amrs.visit_lookback_days = val;
    }
    if let Some(val) = env_parsed("AMRS_PAGE_SIZE")? {
        config.amrs.page_size = val;
    }
    if let Some(val) = env_parsed("AMRS_TLS_VERIFY")? {
        config.amrs.tls_verify = val;
    }

    // HIE overrides
    if let Some(val) = env("HIE_SHR_URL") {
        config.hie.shr_url = val;
    }
    if let Some(val) = env("HIE_MIRROR_URLS") {
        config.hie.mirror_urls = val
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
    }
    if let Some(val) = env("HIE_MAPPING_URL") {
        config.hie.mapping_url = val;
    }
    if let Some(val) = env("HIE_CLIENT_REGISTRY_URL") {
        config.hie.client_registry_url = val;
    }
    if let Some(val) = env("HIE_HEALTH_WORKER_REGISTRY_URL") {
        config.hie.health_worker_registry_url = val;
    }
    if let Some(val) = env("HIE_FACILITY_REGISTRY_URL") {
        config.hie.facility_registry_url = val;
    }
    if let Some(val) = env("HIE_TOKEN_URL") {
        config.hie.token_url = val;
    }
    if let Some(val) = env("HIE_CLIENT_ID") {
        config.hie.client_id = val;
    }
    if let Some(val) = env("HIE_CLIENT_SECRET") {
        config.hie.client_secret = secret_string(val);
    }
    if let Some(val) = env_parsed("HIE_TIMEOUT_SECONDS")? {
        config.hie.timeout_seconds = val;
    }
    if let Some(val) = env_parsed("HIE_MAPPING_CACHE_TTL_SECONDS")? {
        config.hie.mapping_cache_ttl_seconds = val;
    }
    if let Some(val) = env("HIE_DEAD_LETTER_URL") {
        config.hie.dead_letter_url = Some(val);
    }

    // Batch overrides
    if let Some(val) = env("BATCH_RUN_AT") {
        config.batch.run_at = val;
    }
    if let Some(val) = env_parsed("BATCH_DRY_RUN")? {
        config.batch.dry_run = val;
    }

    // Stream overrides
    if let Some(val) = env_parsed("STREAM_MAX_RETRIES")? {
        config.stream.max_retries = val;
    }

    // PostgreSQL overrides (only if PostgreSQL is configured)
    if let Some(ref mut pg) = config.postgresql {
        if let Some(val) = env("POSTGRESQL_CONNECTION_STRING") {
            pg.connection_string = secret_string(val);
        }
        if let Some(val) = env_parsed("POSTGRESQL_MAX_CONNECTIONS")? {
            pg.max_connections = val;
        }
        if let Some(val) = env("POSTGRESQL_SSL_MODE") {
            pg.ssl_mode = val;
        }
    }

    // Logging overrides
    if let Some(val) = env_parsed("LOGGING_LOCAL_ENABLED")? {
        config.logging.local_enabled = val;
    }
    if let Some(val) = env("LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
    if let Some(val) = env("LOGGING_LOCAL_ROTATION") {
        config.logging.local_rotation = val;
    }

    Ok(())
}
