//! FHIR R4 model
//!
//! Only the slice of FHIR this bridge reads from AMRS and writes to the SHR
//! is modelled.

pub mod bundle;
pub mod datatypes;
pub mod resources;

pub use bundle::{BundleEntry, BundleRequest, FhirBundle};
pub use datatypes::{CodeableConcept, Coding, Narrative, Period, Quantity, Reference};
pub use resources::{
    Composition, CompositionSection, Dosage, DoseAndRate, Encounter, EncounterLocation,
    EncounterParticipant, FhirResource, MedicationRequest, Observation, Patient, Timing,
    TimingRepeat,
};
