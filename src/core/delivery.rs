//! Bundle delivery shared by the batch and stream drivers

use crate::adapters::hie::BundleSink;
use crate::domain::fhir::FhirBundle;
use crate::domain::{BridgeError, Result};

/// Longest response body kept in a delivery error
const MAX_ERROR_BODY: usize = 500;

/// Posts a bundle and returns the accepting HTTP status
///
/// # Errors
///
/// Returns [`BridgeError::Delivery`] when any endpoint rejects the bundle
/// or cannot be reached.
pub async fn deliver(sink: &dyn BundleSink, bundle: &FhirBundle) -> Result<u16> {
    let outcome = sink.post_bundle(bundle).await?;
    if outcome.is_success() {
        return Ok(outcome.status);
    }

    let body: String = outcome.body.chars().take(MAX_ERROR_BODY).collect();
    Err(BridgeError::Delivery {
        status: Some(outcome.status),
        message: format!("HIE rejected bundle {}: {body}", bundle.id),
    })
}
