//! Domain error types
//!
//! This module defines the error hierarchy for hie-bridge. The top-level
//! [`BridgeError`] carries the synchronisation taxonomy (query, mapping,
//! malformed reference, delivery, dead-letter) plus the ambient failures of
//! configuration, storage and transport. Third-party error types never leak
//! through the public API.

use thiserror::Error;

/// Main hie-bridge error type
///
/// This is the primary error type used throughout the application.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Data-source failure while discovering visits or fetching clinical data.
    /// Fatal to the current batch date.
    #[error("Query error: {0}")]
    Query(String),

    /// An identifier has no HIE mapping. Soft: the reference is omitted and
    /// processing continues.
    #[error("Mapping unavailable for {kind} id '{local_id}'")]
    MappingUnavailable { kind: String, local_id: String },

    /// A reference does not point at the expected resource type.
    /// Fatal to the current visit or message only.
    #[error("Malformed reference '{reference}': expected {expected}/<id>")]
    MalformedReference { expected: String, reference: String },

    /// The bundle could not be delivered to the SHR
    #[error("Delivery error (status {status:?}): {message}")]
    Delivery { status: Option<u16>, message: String },

    /// The dead-letter sink itself is unreachable
    #[error("Dead-letter error: {0}")]
    DeadLetter(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// AMRS-related errors
    #[error("AMRS error: {0}")]
    Amrs(#[from] AmrsError),

    /// HIE-related errors
    #[error("HIE error: {0}")]
    Hie(#[from] HieError),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Authentication errors
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Network/connection errors
    #[error("Connection error: {0}")]
    Connection(String),

    /// State management errors
    #[error("State error: {0}")]
    State(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

impl BridgeError {
    /// Creates a malformed reference error
    pub fn malformed_reference(expected: impl Into<String>, reference: impl Into<String>) -> Self {
        Self::MalformedReference {
            expected: expected.into(),
            reference: reference.into(),
        }
    }

    /// HTTP status carried by a delivery failure, if any
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Delivery { status, .. } => *status,
            Self::Hie(HieError::ServerError { status, .. })
            | Self::Hie(HieError::ClientError { status, .. }) => Some(*status),
            _ => None,
        }
    }

    /// Whether the failure is worth retrying on the stream path
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::MalformedReference { .. } | Self::Validation(_) | Self::Configuration(_) => false,
            Self::Delivery { status, .. } => !matches!(status, Some(s) if (400..500).contains(s)),
            Self::Amrs(AmrsError::AuthenticationFailed(_))
            | Self::Amrs(AmrsError::PatientNotFound(_))
            | Self::Hie(HieError::ClientError { .. }) => false,
            _ => true,
        }
    }
}

/// AMRS-specific errors
///
/// Errors that occur when talking to the AMRS (OpenMRS) REST API.
#[derive(Debug, Error)]
pub enum AmrsError {
    /// Failed to connect to AMRS
    #[error("Failed to connect to AMRS: {0}")]
    ConnectionFailed(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Invalid response from server
    #[error("Invalid response from server: {0}")]
    InvalidResponse(String),

    /// Patient not found
    #[error("Patient not found: {0}")]
    PatientNotFound(String),

    /// Query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Timeout
    #[error("Request timeout: {0}")]
    Timeout(String),
}

/// HIE-specific errors
///
/// Errors that occur when talking to the HIE (SHR, registries, mapping and
/// token endpoints).
#[derive(Debug, Error)]
pub enum HieError {
    /// Failed to connect to the HIE
    #[error("Failed to connect to HIE: {0}")]
    ConnectionFailed(String),

    /// Token request failed
    #[error("Token request failed: {0}")]
    TokenFailed(String),

    /// Invalid response from server
    #[error("Invalid response from server: {0}")]
    InvalidResponse(String),

    /// Server error (5xx)
    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    /// Client error (4xx)
    #[error("Client error: {status} - {message}")]
    ClientError { status: u16, message: String },

    /// Timeout
    #[error("Request timeout: {0}")]
    Timeout(String),
}

impl HieError {
    /// Classify a non-success HTTP status into a client or server error
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        if status >= 500 {
            Self::ServerError { status, message }
        } else {
            Self::ClientError { status, message }
        }
    }
}

/// Per-visit error detail recorded in batch summaries
#[derive(Debug, Clone)]
pub struct VisitErrorDetail {
    /// Visit the error belongs to
    pub visit_id: String,

    /// Patient the visit belongs to
    pub patient_id: String,

    /// HTTP status of the delivery attempt, when one was made
    pub http_status: Option<u16>,

    /// Error message
    pub message: String,
}

impl VisitErrorDetail {
    /// Creates a new visit error detail
    pub fn new(
        visit_id: impl Into<String>,
        patient_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            visit_id: visit_id.into(),
            patient_id: patient_id.into(),
            http_status: None,
            message: message.into(),
        }
    }

    /// Sets the HTTP status
    pub fn with_http_status(mut self, status: Option<u16>) -> Self {
        self.http_status = status;
        self
    }
}

impl From<std::io::Error> for BridgeError {
    fn from(err: std::io::Error) -> Self {
        BridgeError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        BridgeError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for BridgeError {
    fn from(err: toml::de::Error) -> Self {
        BridgeError::Configuration(format!("TOML parse error: {err}"))
    }
}
