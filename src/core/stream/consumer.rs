//! FHIR event consumer
//!
//! Each message carries a FHIR bundle for one encounter. The consumer checks
//! that the encounter's location has an HIE facility code, rebuilds a
//! dataset from the bundle and pushes it through the shared transform and
//! delivery path. Messages that still fail after the retry budget are sent
//! to the dead-letter sink.

use crate::adapters::hie::{BundleSink, DeadLetterSink, IdentityResolver};
use crate::adapters::retry::retry_with_backoff;
use crate::config::RetryConfig;
use crate::core::delivery::deliver;
use crate::core::status::{RunCounts, ServiceStatus, StatusTracker};
use crate::core::transform::FhirTransformer;
use crate::domain::{BridgeError, ClinicalDataset, DeadLetterEntry, FhirEventMessage, Result};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// What happened to one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// Bundle accepted with this HTTP status
    Delivered(u16),
    /// Every attempt failed; the message went to the dead-letter sink
    DeadLettered { attempts: usize },
}

/// Consumes encounter bundles from the event stream
pub struct FhirEventConsumer {
    resolver: Arc<dyn IdentityResolver>,
    transformer: Arc<FhirTransformer>,
    sink: Arc<dyn BundleSink>,
    dead_letter: Arc<dyn DeadLetterSink>,
    retry: RetryConfig,
    status: StatusTracker,
    delivered: AtomicUsize,
    failed: AtomicUsize,
}

impl FhirEventConsumer {
    pub fn new(
        resolver: Arc<dyn IdentityResolver>,
        transformer: Arc<FhirTransformer>,
        sink: Arc<dyn BundleSink>,
        dead_letter: Arc<dyn DeadLetterSink>,
        retry: RetryConfig,
    ) -> Self {
        Self {
            resolver,
            transformer,
            sink,
            dead_letter,
            retry,
            status: StatusTracker::new(),
            delivered: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
        }
    }

    pub async fn status(&self) -> ServiceStatus {
        self.status.snapshot().await
    }

    /// Handles one message; failures end in the dead-letter sink, never in the caller
    pub async fn on_fhir_event(&self, message: FhirEventMessage) -> EventOutcome {
        let result = retry_with_backoff(&self.retry, || self.process(&message)).await;

        let (outcome, error) = match result {
            Ok(http_status) => {
                self.delivered.fetch_add(1, Ordering::Relaxed);
                tracing::info!(key = ?message.key, http_status, "Event delivered");
                (EventOutcome::Delivered(http_status), None)
            }
            Err((e, attempts)) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(key = ?message.key, attempts, error = %e, "Event failed, dead-lettering");
                let error = e.to_string();
                let entry = DeadLetterEntry::new(message, error.clone(), attempts);
                if let Err(dl) = self.dead_letter.post(&entry).await {
                    tracing::error!(
                        event_digest = %entry.event_digest,
                        error = %dl,
                        "Failed to post dead-letter entry"
                    );
                }
                (EventOutcome::DeadLettered { attempts }, Some(error))
            }
        };

        self.status.update_counts(self.counts(), error).await;
        outcome
    }

    /// Drains the queue until it closes or shutdown is signalled
    pub async fn run(
        &self,
        mut receiver: mpsc::Receiver<FhirEventMessage>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        if !self.status.try_start().await {
            tracing::warn!("Consumer already running");
            return;
        }
        tracing::info!("Event consumer started");

        // a dropped shutdown sender means no shutdown will ever be signalled
        let mut watching = true;
        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                message = receiver.recv() => match message {
                    Some(message) => {
                        self.on_fhir_event(message).await;
                    }
                    None => break,
                },
                changed = shutdown.changed(), if watching => {
                    if changed.is_err() {
                        watching = false;
                    }
                }
            }
        }

        let counts = self.counts();
        tracing::info!(
            delivered = counts.delivered,
            failed = counts.failed,
            "Event consumer stopped"
        );
        self.status.finish(Some(counts), None).await;
    }

    fn counts(&self) -> RunCounts {
        let delivered = self.delivered.load(Ordering::Relaxed);
        let failed = self.failed.load(Ordering::Relaxed);
        RunCounts {
            processed: delivered + failed,
            skipped: 0,
            delivered,
            failed,
        }
    }

    async fn process(&self, message: &FhirEventMessage) -> Result<u16> {
        let encounter_id = encounter_id_in(&message.payload)?;

        let context = self
            .resolver
            .get_encounter_context(encounter_id)
            .await?
            .ok_or_else(|| {
                BridgeError::Validation(format!("No visit context for encounter {encounter_id}"))
            })?;

        if self
            .resolver
            .get_facility_code_for_location(&context.location_uuid)
            .await?
            .is_none()
        {
            return Err(BridgeError::Validation(format!(
                "No facility code for location {}",
                context.location_uuid
            )));
        }

        tracing::debug!(
            encounter_id,
            visit_id = %context.visit_uuid,
            location_id = %context.location_uuid,
            "Resolved encounter context"
        );

        let dataset = ClinicalDataset::from_bundle(&message.payload)?;
        let bundle = self.transformer.transform(&dataset).await?;
        deliver(self.sink.as_ref(), &bundle).await
    }
}

/// Id of the first Encounter in an inbound bundle
fn encounter_id_in(payload: &Value) -> Result<&str> {
    payload
        .get("entry")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|entry| entry.get("resource"))
        .find(|resource| resource.get("resourceType").and_then(Value::as_str) == Some("Encounter"))
        .and_then(|encounter| encounter.get("id").and_then(Value::as_str))
        .ok_or_else(|| BridgeError::Validation("event holds no Encounter with an id".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_encounter_id_found_after_other_resources() {
        let payload = json!({"entry": [
            {"resource": {"resourceType": "Patient", "id": "p1"}},
            {"resource": {"resourceType": "Encounter", "id": "e1"}}
        ]});
        assert_eq!(encounter_id_in(&payload).unwrap(), "e1");
    }

    #[test]
    fn test_missing_encounter_is_not_retryable() {
        let err = encounter_id_in(&json!({"entry": []})).unwrap_err();
        assert!(!err.is_retryable());
    }
}
