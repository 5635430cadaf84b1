//! HIE-facing traits consumed by the pipeline

use super::models::DeliveryOutcome;
use crate::domain::fhir::FhirBundle;
use crate::domain::{DeadLetterEntry, EncounterContext, IdentityMapping, MappingKind, Result};
use async_trait::async_trait;

/// Resolves AMRS identifiers to HIE identifiers
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Resolves every id in one round trip; unknown ids are left out
    async fn resolve(&self, kind: MappingKind, ids: &[String]) -> Result<Vec<IdentityMapping>>;

    /// HIE facility code of an AMRS location; `None` when unknown
    async fn get_facility_code_for_location(&self, location_id: &str) -> Result<Option<String>>;

    /// Visit and location an encounter belongs to; `None` when unknown
    async fn get_encounter_context(&self, encounter_id: &str)
        -> Result<Option<EncounterContext>>;
}

/// Delivers bundles to the shared health record
#[async_trait]
pub trait BundleSink: Send + Sync {
    /// Posts the bundle; transport failures are errors, HTTP rejections are outcomes
    async fn post_bundle(&self, bundle: &FhirBundle) -> Result<DeliveryOutcome>;
}

/// Receives stream events that exhausted their retries
#[async_trait]
pub trait DeadLetterSink: Send + Sync {
    async fn post(&self, entry: &DeadLetterEntry) -> Result<()>;
}
