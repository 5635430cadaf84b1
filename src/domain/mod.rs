//! Domain models and types for hie-bridge.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`VisitId`], [`PatientId`])
//! - **Visit and dataset models** ([`Visit`], [`ClosedVisits`], [`ClinicalDataset`])
//! - **Typed FHIR resources** ([`fhir::FhirResource`], [`fhir::FhirBundle`])
//! - **Identity mapping types** ([`MappingKind`], [`EncounterMapping`])
//! - **Error types** ([`BridgeError`], [`AmrsError`], [`HieError`])
//! - **Result type alias** ([`Result`])
//!
//! # Type Safety
//!
//! Identifiers use the newtype pattern so a patient id cannot be passed
//! where a visit id is expected:
//!
//! ```rust
//! use hie_bridge::domain::{PatientId, VisitId};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let visit_id = VisitId::new("v1")?;
//! let patient_id = PatientId::new("patientA")?;
//!
//! // This won't compile
//! // let wrong: VisitId = patient_id;
//! # Ok(())
//! # }
//! ```

pub mod dataset;
pub mod errors;
pub mod event;
pub mod fhir;
pub mod ids;
pub mod mapping;
pub mod result;
pub mod visit;

// Re-export commonly used types for convenience
pub use dataset::ClinicalDataset;
pub use errors::{AmrsError, BridgeError, HieError, VisitErrorDetail};
pub use event::{DeadLetterEntry, FhirEventMessage};
pub use ids::{parse_visit_date, PatientId, VisitId};
pub use mapping::{EncounterContext, EncounterMapping, IdentityMapping, MappingKind};
pub use result::Result;
pub use visit::{ClosedVisits, Visit};
