//! Stream messages and dead-letter entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// One inbound message from the FHIR event stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FhirEventMessage {
    /// Producer-assigned message key
    #[serde(default)]
    pub key: Option<String>,

    /// FHIR Bundle carrying the encounter and its observations
    pub payload: Value,

    /// When the message was taken off the stream
    #[serde(default = "Utc::now")]
    pub received_at: DateTime<Utc>,
}

impl FhirEventMessage {
    pub fn new(key: Option<String>, payload: Value) -> Self {
        Self {
            key,
            payload,
            received_at: Utc::now(),
        }
    }
}

/// A message that failed every processing attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadLetterEntry {
    pub original_event: FhirEventMessage,
    pub error: String,
    pub attempts: usize,
    pub failed_at: DateTime<Utc>,
    /// Hex SHA-256 of the serialised payload, for replay de-duplication
    pub event_digest: String,
}

impl DeadLetterEntry {
    pub fn new(original_event: FhirEventMessage, error: impl Into<String>, attempts: usize) -> Self {
        let event_digest = digest_payload(&original_event.payload);
        Self {
            original_event,
            error: error.into(),
            attempts,
            failed_at: Utc::now(),
            event_digest,
        }
    }
}

fn digest_payload(payload: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payload.to_string().as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}
