//! Stream driver
//!
//! Event messages arrive over a typed `mpsc` queue and are handled one at a
//! time by [`FhirEventConsumer`].

pub mod consumer;

pub use crate::domain::FhirEventMessage;
pub use consumer::{EventOutcome, FhirEventConsumer};
