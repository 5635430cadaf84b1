//! Integration tests for logging setup
//!
//! The global subscriber can be installed once per process, so the
//! initialisation checks live in a single test.

use hie_bridge::config::LoggingConfig;
use hie_bridge::logging::init_logging;
use hie_bridge::{log_retry_attempt, log_visit_outcome, log_visit_start};
use tempfile::TempDir;

#[test]
fn test_logging_config_default() {
    let config = LoggingConfig::default();
    assert!(config.local_enabled);
    assert_eq!(config.local_rotation, "daily");
    assert!(!config.local_path.is_empty());
}

#[test]
fn test_file_logging_writes_json_lines() {
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("logs");
    let config = LoggingConfig {
        local_enabled: true,
        local_path: log_path.to_string_lossy().to_string(),
        local_rotation: "hourly".to_string(),
    };

    let guard = init_logging("info", &config).unwrap();
    assert!(log_path.is_dir());

    // call-site target is this test crate, which the default filter drops
    log_visit_start!("v1", "patientA");
    log_visit_outcome!("v1", "patientA", false, Some(503u16));
    log_retry_attempt!(2, 3, "HIE returned 503");

    assert!(init_logging("info", &config).is_err());
    drop(guard);

    let contents: String = std::fs::read_dir(&log_path)
        .unwrap()
        .map(|entry| std::fs::read_to_string(entry.unwrap().path()).unwrap())
        .collect();
    let lines: Vec<serde_json::Value> = contents
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();

    let initialized = lines
        .iter()
        .find(|l| l["fields"]["message"] == "Logging initialized")
        .expect("initialisation line missing");
    assert_eq!(initialized["level"], "INFO");
    assert_eq!(initialized["fields"]["local_enabled"], true);
    assert_eq!(initialized["target"], "hie_bridge::logging::structured");
}

#[test]
fn test_invalid_level_is_rejected_before_install() {
    let config = LoggingConfig {
        local_enabled: false,
        ..LoggingConfig::default()
    };
    assert!(init_logging("verbose", &config).is_err());
}
