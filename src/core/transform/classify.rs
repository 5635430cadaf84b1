//! Observation routing by concept
//!
//! Each observation is routed by its concept codes, first match wins:
//! drug orders become MedicationRequests, clinical notes are merged into one
//! Composition, and everything else stays an Observation.

use crate::config::TransformConfig;
use crate::domain::fhir::Observation;
use std::collections::HashSet;

/// Concepts recorded when a drug is prescribed
pub const DEFAULT_DRUG_CONCEPTS: &[&str] = &["1282", "1895", "160570", "166365"];

/// Concepts carrying free-text clinical notes
pub const DEFAULT_NOTE_CONCEPTS: &[&str] = &["162169", "160632", "159395", "165095"];

/// Where an observation ends up in the outbound bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObservationKind {
    Drug,
    ClinicalNote,
    Regular,
}

/// Drug and note concept codes
#[derive(Debug, Clone)]
pub struct ConceptSets {
    drug: HashSet<String>,
    note: HashSet<String>,
}

impl Default for ConceptSets {
    fn default() -> Self {
        Self {
            drug: DEFAULT_DRUG_CONCEPTS.iter().map(|c| c.to_string()).collect(),
            note: DEFAULT_NOTE_CONCEPTS.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl ConceptSets {
    /// Defaults extended with the configured codes
    pub fn from_config(config: &TransformConfig) -> Self {
        let mut sets = Self::default();
        sets.drug.extend(config.drug_concepts.iter().cloned());
        sets.note.extend(config.note_concepts.iter().cloned());
        sets
    }

    pub fn is_drug(&self, code: &str) -> bool {
        self.drug.contains(code)
    }

    pub fn is_note(&self, code: &str) -> bool {
        self.note.contains(code)
    }

    /// Routes one observation
    pub fn classify(&self, observation: &Observation) -> ObservationKind {
        let coded_value = observation
            .value_codeable_concept
            .iter()
            .flat_map(|v| v.codes());

        if observation.code.codes().chain(coded_value).any(|c| self.is_drug(c)) {
            ObservationKind::Drug
        } else if observation.code.codes().any(|c| self.is_note(c)) {
            ObservationKind::ClinicalNote
        } else {
            ObservationKind::Regular
        }
    }
}
