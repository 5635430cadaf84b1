//! Encounter and observation rewriting

use super::references::{bundle_local, RegistryUrls};
use crate::domain::fhir::datatypes::systems;
use crate::domain::fhir::{Coding, Encounter, EncounterParticipant, Observation, Reference};
use crate::domain::{BridgeError, EncounterMapping, MappingKind};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Fields that only make sense inside AMRS
const INTERNAL_FIELDS: &[&str] = &["meta", "text", "contained", "extension", "identifier"];

pub fn strip_internal_fields(other: &mut Map<String, Value>) {
    for field in INTERNAL_FIELDS {
        other.remove(*field);
    }
}

/// Administrative class stamped on every outbound encounter
pub fn ambulatory_class() -> Coding {
    Coding::new(systems::V3_ACT_CODE, "AMB", "ambulatory")
}

fn warn_unmapped(kind: MappingKind, local_id: &str, resource_id: &str) {
    let err = BridgeError::MappingUnavailable {
        kind: kind.to_string(),
        local_id: local_id.to_string(),
    };
    tracing::warn!(resource_id = %resource_id, error = %err, "Reference omitted");
}

/// Rewrites an AMRS encounter for the SHR
///
/// Registry references replace local ones; references without a mapping are
/// omitted. `location` and `partOf` are dropped.
pub fn transform_encounter(
    source: &Encounter,
    subject: Option<&Reference>,
    practitioners: &HashMap<String, String>,
    mapping: &EncounterMapping,
    urls: &RegistryUrls,
) -> Encounter {
    let mut encounter = source.clone();
    strip_internal_fields(&mut encounter.other);

    encounter.subject = subject.cloned();
    encounter.class = Some(ambulatory_class());
    if encounter.status.trim().is_empty() {
        encounter.status = "finished".to_string();
    }

    encounter.participant = source
        .participant
        .iter()
        .filter_map(|participant| {
            let individual = participant
                .individual
                .as_ref()
                .and_then(|r| r.id_for("Practitioner"))
                .and_then(|local| match practitioners.get(local) {
                    Some(remote) => Some(urls.practitioner(remote)),
                    None => {
                        warn_unmapped(MappingKind::Practitioner, local, &source.id);
                        None
                    }
                });
            if individual.is_none() && participant.participant_type.is_empty() {
                return None;
            }
            Some(EncounterParticipant {
                participant_type: participant.participant_type.clone(),
                individual,
            })
        })
        .collect();

    encounter.service_provider = match &mapping.facility {
        Some(remote) => Some(urls.organization(remote)),
        None => {
            for location in source.location.iter().filter_map(|l| l.location.id_for("Location")) {
                warn_unmapped(MappingKind::Facility, location, &source.id);
            }
            None
        }
    };
    encounter.location.clear();
    encounter.part_of = None;

    encounter
}

/// Rewrites a regular AMRS observation for the SHR
///
/// The encounter reference points at the encounter's bundle entry and the
/// performer becomes the encounter's mapped practitioner.
pub fn transform_observation(
    source: &Observation,
    encounter_id: &str,
    subject: Option<&Reference>,
    mapping: &EncounterMapping,
    urls: &RegistryUrls,
) -> Observation {
    let mut observation = source.clone();
    strip_internal_fields(&mut observation.other);

    observation.subject = subject.cloned();
    observation.encounter = Some(bundle_local(encounter_id));
    observation.performer = mapping
        .practitioner
        .as_deref()
        .map(|remote| vec![urls.practitioner(remote)])
        .unwrap_or_default();
    if observation.status.trim().is_empty() {
        observation.status = "final".to_string();
    }

    observation
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fhir::CodeableConcept;
    use serde_json::json;

    fn urls() -> RegistryUrls {
        RegistryUrls {
            client_registry: "https://cr".to_string(),
            health_worker_registry: "https://hwr".to_string(),
            facility_registry: "https://fr".to_string(),
        }
    }

    fn amrs_encounter() -> Encounter {
        serde_json::from_value(json!({
            "resourceType": "Encounter",
            "id": "enc-1",
            "status": "finished",
            "meta": {"lastUpdated": "2024-01-15T10:00:00Z"},
            "text": {"status": "generated", "div": "<div/>"},
            "identifier": [{"value": "local"}],
            "subject": {"reference": "Patient/p1"},
            "participant": [
                {"individual": {"reference": "Practitioner/doc-1"}},
                {"individual": {"reference": "Practitioner/doc-2"}}
            ],
            "location": [{"location": {"reference": "Location/loc-1"}}],
            "partOf": {"reference": "Encounter/visit-1"},
            "period": {"start": "2024-01-15T09:00:00Z"}
        }))
        .unwrap()
    }

    #[test]
    fn test_encounter_references_are_rewritten() {
        let practitioners = HashMap::from([("doc-1".to_string(), "HWR-1".to_string())]);
        let mapping = EncounterMapping {
            practitioner: Some("HWR-1".to_string()),
            facility: Some("FAC-1".to_string()),
        };
        let subject = urls().patient("CR-1");

        let out = transform_encounter(&amrs_encounter(), Some(&subject), &practitioners, &mapping, &urls());

        assert_eq!(out.subject, Some(subject));
        assert_eq!(out.class.as_ref().and_then(|c| c.code.as_deref()), Some("AMB"));
        assert_eq!(out.participant.len(), 1);
        assert_eq!(
            out.participant[0].individual.as_ref().and_then(|r| r.reference.as_deref()),
            Some("https://hwr/Practitioner/HWR-1")
        );
        assert_eq!(
            out.service_provider.and_then(|r| r.reference),
            Some("https://fr/Organization/FAC-1".to_string())
        );
        assert!(out.location.is_empty());
        assert!(out.part_of.is_none());
        assert!(!out.other.contains_key("meta"));
        assert!(!out.other.contains_key("identifier"));
        assert!(out.period.is_some());
    }

    #[test]
    fn test_unmapped_references_are_omitted() {
        let out = transform_encounter(
            &amrs_encounter(),
            None,
            &HashMap::new(),
            &EncounterMapping::default(),
            &urls(),
        );
        assert!(out.subject.is_none());
        assert!(out.participant.is_empty());
        assert!(out.service_provider.is_none());

        let value = serde_json::to_value(&out).unwrap();
        assert!(value.get("participant").is_none());
        assert!(value.get("location").is_none());
    }

    #[test]
    fn test_observation_points_at_bundle_encounter() {
        let mut obs = Observation::new("obs-1", CodeableConcept::default());
        obs.performer = vec![Reference::to("Practitioner/doc-1")];
        obs.other.insert("meta".to_string(), json!({}));
        obs.other.insert("valueBoolean".to_string(), json!(true));
        let mapping = EncounterMapping {
            practitioner: Some("HWR-1".to_string()),
            facility: None,
        };

        let out = transform_observation(&obs, "enc-1", None, &mapping, &urls());

        assert_eq!(out.encounter, Some(bundle_local("enc-1")));
        assert_eq!(out.performer, vec![urls().practitioner("HWR-1")]);
        assert!(!out.other.contains_key("meta"));
        assert_eq!(out.other["valueBoolean"], json!(true));
    }
}
