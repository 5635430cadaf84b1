//! AMRS (OpenMRS) integration
//!
//! [`VisitSource`] and [`ClinicalDataSource`] are the seams the pipeline
//! depends on; [`AmrsClient`] implements both against the OpenMRS REST and
//! FHIR2 APIs.

pub mod client;
pub mod models;
mod source;

pub use client::AmrsClient;
pub use source::{ClinicalDataSource, VisitSource};
