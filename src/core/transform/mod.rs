//! AMRS → HIE FHIR transformation
//!
//! Rewrites AMRS encounters and observations into an HIE-ready bundle.
//! Observations are routed by concept: regular observations are rewritten
//! in place, clinical notes are merged into one Composition, and each drug
//! observation becomes a MedicationRequest.

pub mod classify;
pub mod encounter;
pub mod references;
pub mod synthesize;
pub mod transformer;

pub use classify::{ConceptSets, ObservationKind};
pub use references::RegistryUrls;
pub use transformer::FhirTransformer;
