//! Logging and observability
//!
//! Structured logging through `tracing`, with a console layer and an
//! optional JSON rolling file. The macros below keep the field names of the
//! per-visit log lines consistent between the batch and stream drivers.

pub mod structured;

pub use structured::{init_logging, parse_log_level, LoggingGuard};

/// Log the start of processing for one visit
///
/// # Example
///
/// ```no_run
/// use hie_bridge::log_visit_start;
///
/// log_visit_start!("v1", "patientA");
/// ```
#[macro_export]
macro_rules! log_visit_start {
    ($visit_id:expr, $patient_id:expr) => {
        tracing::info!(
            visit_id = %$visit_id,
            patient_id = %$patient_id,
            "Processing visit"
        );
    };
}

/// Log the outcome of one visit
///
/// # Example
///
/// ```no_run
/// use hie_bridge::log_visit_outcome;
///
/// log_visit_outcome!("v1", "patientA", true, Some(201u16));
/// ```
#[macro_export]
macro_rules! log_visit_outcome {
    ($visit_id:expr, $patient_id:expr, $success:expr, $http_status:expr) => {
        if $success {
            tracing::info!(
                visit_id = %$visit_id,
                patient_id = %$patient_id,
                http_status = ?$http_status,
                "Visit delivered"
            );
        } else {
            tracing::warn!(
                visit_id = %$visit_id,
                patient_id = %$patient_id,
                http_status = ?$http_status,
                "Visit delivery failed"
            );
        }
    };
}

/// Log a retry attempt
///
/// # Example
///
/// ```no_run
/// use hie_bridge::log_retry_attempt;
///
/// log_retry_attempt!(2, 3, "Connection timeout");
/// ```
#[macro_export]
macro_rules! log_retry_attempt {
    ($attempt:expr, $max_attempts:expr, $reason:expr) => {
        tracing::warn!(
            attempt = $attempt,
            max_attempts = $max_attempts,
            reason = %$reason,
            "Retrying operation"
        );
    };
}
