//! Resources synthesised after every encounter has been seen
//!
//! Clinical notes of a patient-day become one Composition. Each drug
//! observation becomes its own MedicationRequest with fixed dosing.

use super::encounter::strip_internal_fields;
use super::references::{bundle_local, RegistryUrls};
use crate::domain::fhir::datatypes::systems;
use crate::domain::fhir::{
    CodeableConcept, Coding, Composition, CompositionSection, Dosage, DoseAndRate,
    MedicationRequest, Narrative, Observation, Quantity, Reference, Timing, TimingRepeat,
};
use crate::domain::EncounterMapping;

/// Separator between note texts in the consolidated composition
pub const NOTE_SEPARATOR: &str = "\n\n";

const DEFAULT_NOTE_TITLE: &str = "Clinical Note";

/// An observation held back until all encounters are processed
#[derive(Debug, Clone)]
pub struct DeferredObservation {
    pub observation: Observation,
    pub encounter_id: String,
    pub mapping: EncounterMapping,
}

impl DeferredObservation {
    fn requester(&self, urls: &RegistryUrls) -> Option<Reference> {
        self.mapping
            .practitioner
            .as_deref()
            .map(|remote| urls.practitioner(remote))
    }
}

/// One Composition holding every note's text, or `None` without notes
///
/// Coding, date and author come from the first note. `fallback_date` is
/// used when that note carries no effective time.
pub fn composition_from_notes(
    notes: &[DeferredObservation],
    subject: Option<&Reference>,
    urls: &RegistryUrls,
    fallback_date: &str,
) -> Option<Composition> {
    let first = notes.first()?;

    let text = notes
        .iter()
        .filter_map(|n| n.observation.note_text())
        .collect::<Vec<_>>()
        .join(NOTE_SEPARATOR);

    let code = first.observation.code.clone();
    let title = code
        .text
        .clone()
        .or_else(|| code.coding.iter().find_map(|c| c.display.clone()))
        .unwrap_or_else(|| DEFAULT_NOTE_TITLE.to_string());

    Some(Composition {
        resource_type: "Composition".to_string(),
        id: first.observation.id.clone(),
        status: "final".to_string(),
        composition_type: code.clone(),
        subject: subject.cloned(),
        encounter: Some(bundle_local(&first.encounter_id)),
        date: first
            .observation
            .effective_date_time
            .clone()
            .unwrap_or_else(|| fallback_date.to_string()),
        author: first.requester(urls).into_iter().collect(),
        title: title.clone(),
        section: vec![CompositionSection {
            title: Some(title),
            code: Some(code),
            text: Narrative::generated(&text),
        }],
    })
}

/// Once daily, oral, one tablet
pub fn default_dosage() -> Dosage {
    Dosage {
        text: Some("1 tablet by mouth once daily".to_string()),
        timing: Timing {
            repeat: TimingRepeat {
                frequency: 1,
                period: 1.0,
                period_unit: "d".to_string(),
            },
        },
        route: CodeableConcept::single(Coding::new(systems::SNOMED, "26643006", "Oral route")),
        dose_and_rate: vec![DoseAndRate {
            dose_quantity: Quantity {
                value: Some(1.0),
                unit: Some("tablet".to_string()),
                system: Some(systems::UCUM.to_string()),
                code: Some("{tbl}".to_string()),
            },
        }],
    }
}

/// MedicationRequest for one drug observation
///
/// The prescribed drug is the observation's coded answer when it has one,
/// otherwise its concept.
pub fn medication_request_from(
    drug: &DeferredObservation,
    subject: Option<&Reference>,
    urls: &RegistryUrls,
) -> MedicationRequest {
    let mut source = drug.observation.clone();
    strip_internal_fields(&mut source.other);

    let medication = source
        .value_codeable_concept
        .filter(|v| !v.is_empty())
        .unwrap_or(source.code);

    MedicationRequest {
        resource_type: "MedicationRequest".to_string(),
        id: source.id,
        status: "active".to_string(),
        intent: "order".to_string(),
        medication_codeable_concept: medication,
        subject: subject.cloned(),
        encounter: Some(bundle_local(&drug.encounter_id)),
        authored_on: source.effective_date_time,
        requester: drug.requester(urls),
        dosage_instruction: vec![default_dosage()],
    }
}
