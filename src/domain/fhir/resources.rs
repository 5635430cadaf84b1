//! Typed FHIR resources
//!
//! Input resources (`Patient`, `Encounter`, `Observation`) keep fields this
//! crate does not model in an `other` map so that they pass through the
//! transform untouched. Output resources are wrapped in [`FhirResource`],
//! whose variants check their required fields before a bundle entry is built.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::datatypes::{CodeableConcept, Narrative, Period, Quantity, Reference};
use crate::domain::{BridgeError, Result};

fn patient_type() -> String {
    "Patient".to_string()
}

fn encounter_type() -> String {
    "Encounter".to_string()
}

fn observation_type() -> String {
    "Observation".to_string()
}

fn medication_request_type() -> String {
    "MedicationRequest".to_string()
}

fn composition_type() -> String {
    "Composition".to_string()
}

fn require(resource: &str, field: &str, present: bool) -> Result<()> {
    if present {
        Ok(())
    } else {
        Err(BridgeError::Validation(format!(
            "{resource} is missing required field '{field}'"
        )))
    }
}

fn non_empty(value: &str) -> bool {
    !value.trim().is_empty()
}

/// FHIR Patient, as read from AMRS
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    #[serde(default = "patient_type")]
    pub resource_type: String,
    pub id: String,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl Patient {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            resource_type: patient_type(),
            id: id.into(),
            other: Map::new(),
        }
    }
}

/// A participant in an encounter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncounterParticipant {
    #[serde(default, rename = "type", skip_serializing_if = "Vec::is_empty")]
    pub participant_type: Vec<CodeableConcept>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub individual: Option<Reference>,
}

/// A location where an encounter took place
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncounterLocation {
    pub location: Reference,
}

/// FHIR Encounter
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Encounter {
    #[serde(default = "encounter_type")]
    pub resource_type: String,
    pub id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<super::datatypes::Coding>,
    #[serde(default, rename = "type", skip_serializing_if = "Vec::is_empty")]
    pub encounter_type: Vec<CodeableConcept>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<Reference>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub participant: Vec<EncounterParticipant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<Period>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub location: Vec<EncounterLocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_provider: Option<Reference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_of: Option<Reference>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl Encounter {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            resource_type: encounter_type(),
            id: id.into(),
            status: "finished".to_string(),
            class: None,
            encounter_type: Vec::new(),
            subject: None,
            participant: Vec::new(),
            period: None,
            location: Vec::new(),
            service_provider: None,
            part_of: None,
            other: Map::new(),
        }
    }

    fn validate(&self) -> Result<()> {
        require("Encounter", "id", non_empty(&self.id))?;
        require("Encounter", "status", non_empty(&self.status))?;
        require("Encounter", "class", self.class.is_some())
    }
}

/// FHIR Observation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    #[serde(default = "observation_type")]
    pub resource_type: String,
    pub id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub code: CodeableConcept,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<Reference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encounter: Option<Reference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_date_time: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub performer: Vec<Reference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_quantity: Option<Quantity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_codeable_concept: Option<CodeableConcept>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_string: Option<String>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl Observation {
    pub fn new(id: impl Into<String>, code: CodeableConcept) -> Self {
        Self {
            resource_type: observation_type(),
            id: id.into(),
            status: "final".to_string(),
            code,
            subject: None,
            encounter: None,
            effective_date_time: None,
            performer: Vec::new(),
            value_quantity: None,
            value_codeable_concept: None,
            value_string: None,
            other: Map::new(),
        }
    }

    /// Free text carried by a clinical-note observation
    pub fn note_text(&self) -> Option<&str> {
        self.value_string
            .as_deref()
            .or(self.code.text.as_deref())
            .filter(|t| !t.is_empty())
    }

    fn validate(&self) -> Result<()> {
        require("Observation", "id", non_empty(&self.id))?;
        require("Observation", "status", non_empty(&self.status))?;
        require("Observation", "code", !self.code.is_empty())
    }
}

/// Repetition pattern of a dosage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingRepeat {
    pub frequency: u32,
    pub period: f64,
    pub period_unit: String,
}

/// When a medication should be given
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timing {
    pub repeat: TimingRepeat,
}

/// Amount of medication per dose
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoseAndRate {
    pub dose_quantity: Quantity,
}

/// How a medication should be taken
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dosage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub timing: Timing,
    pub route: CodeableConcept,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dose_and_rate: Vec<DoseAndRate>,
}

/// FHIR MedicationRequest, synthesised from a drug observation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationRequest {
    #[serde(default = "medication_request_type")]
    pub resource_type: String,
    pub id: String,
    pub status: String,
    pub intent: String,
    pub medication_codeable_concept: CodeableConcept,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<Reference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encounter: Option<Reference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authored_on: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requester: Option<Reference>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dosage_instruction: Vec<Dosage>,
}

impl MedicationRequest {
    fn validate(&self) -> Result<()> {
        require("MedicationRequest", "id", non_empty(&self.id))?;
        require("MedicationRequest", "status", non_empty(&self.status))?;
        require("MedicationRequest", "intent", non_empty(&self.intent))?;
        require(
            "MedicationRequest",
            "medicationCodeableConcept",
            !self.medication_codeable_concept.is_empty(),
        )
    }
}

/// A titled section of a composition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositionSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<CodeableConcept>,
    pub text: Narrative,
}

/// FHIR Composition, the consolidated clinical note of a patient-day
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Composition {
    #[serde(default = "composition_type")]
    pub resource_type: String,
    pub id: String,
    pub status: String,
    #[serde(rename = "type")]
    pub composition_type: CodeableConcept,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<Reference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encounter: Option<Reference>,
    pub date: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub author: Vec<Reference>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub section: Vec<CompositionSection>,
}

impl Composition {
    fn validate(&self) -> Result<()> {
        require("Composition", "id", non_empty(&self.id))?;
        require("Composition", "status", non_empty(&self.status))?;
        require("Composition", "type", !self.composition_type.is_empty())?;
        require("Composition", "date", non_empty(&self.date))?;
        require("Composition", "title", non_empty(&self.title))
    }
}

/// Any resource that can be placed in an outbound bundle
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum FhirResource {
    Encounter(Encounter),
    Observation(Observation),
    MedicationRequest(MedicationRequest),
    Composition(Composition),
}

impl FhirResource {
    pub fn id(&self) -> &str {
        match self {
            Self::Encounter(r) => &r.id,
            Self::Observation(r) => &r.id,
            Self::MedicationRequest(r) => &r.id,
            Self::Composition(r) => &r.id,
        }
    }

    pub fn resource_type(&self) -> &'static str {
        match self {
            Self::Encounter(_) => "Encounter",
            Self::Observation(_) => "Observation",
            Self::MedicationRequest(_) => "MedicationRequest",
            Self::Composition(_) => "Composition",
        }
    }

    /// Checks the required fields of the wrapped resource
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Encounter(r) => r.validate(),
            Self::Observation(r) => r.validate(),
            Self::MedicationRequest(r) => r.validate(),
            Self::Composition(r) => r.validate(),
        }
    }
}
