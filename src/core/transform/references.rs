//! Reference extraction and rewriting
//!
//! AMRS resources refer to practitioners, locations and patients by local
//! id. Outbound resources refer to the HIE registries instead.

use crate::config::HieConfig;
use crate::domain::fhir::{Encounter, Reference};
use crate::domain::{BridgeError, EncounterMapping, Result};
use std::collections::{BTreeSet, HashMap};

/// Base URLs of the HIE registries that outbound references point at
#[derive(Debug, Clone)]
pub struct RegistryUrls {
    pub client_registry: String,
    pub health_worker_registry: String,
    pub facility_registry: String,
}

impl RegistryUrls {
    pub fn from_config(config: &HieConfig) -> Self {
        Self {
            client_registry: config.client_registry_url.trim_end_matches('/').to_string(),
            health_worker_registry: config
                .health_worker_registry_url
                .trim_end_matches('/')
                .to_string(),
            facility_registry: config.facility_registry_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn patient(&self, remote_id: &str) -> Reference {
        Reference::to(format!("{}/Patient/{remote_id}", self.client_registry))
    }

    pub fn practitioner(&self, remote_id: &str) -> Reference {
        Reference::to(format!(
            "{}/Practitioner/{remote_id}",
            self.health_worker_registry
        ))
    }

    pub fn organization(&self, remote_id: &str) -> Reference {
        Reference::to(format!("{}/Organization/{remote_id}", self.facility_registry))
    }
}

/// Bundle-local reference to a resource carried in the same bundle
pub fn bundle_local(id: &str) -> Reference {
    Reference::to(format!("urn:uuid:{id}"))
}

/// The `<id>` of a `<resource_type>/<id>` reference
///
/// A reference with no `reference` string (display or identifier only)
/// yields `None`.
///
/// # Errors
///
/// Returns [`BridgeError::MalformedReference`] for any other shape.
pub fn local_id<'a>(reference: &'a Reference, resource_type: &str) -> Result<Option<&'a str>> {
    let Some(raw) = reference.reference.as_deref() else {
        return Ok(None);
    };
    reference
        .id_for(resource_type)
        .map(Some)
        .ok_or_else(|| BridgeError::malformed_reference(resource_type, raw))
}

fn collect_ids<'a>(
    references: impl Iterator<Item = &'a Reference>,
    resource_type: &str,
    encounter_id: &str,
) -> Result<BTreeSet<String>> {
    let mut ids = BTreeSet::new();
    for reference in references {
        match local_id(reference, resource_type)? {
            Some(id) => {
                ids.insert(id.to_string());
            }
            None => tracing::warn!(
                encounter_id,
                resource_type,
                display = ?reference.display,
                "Reference without an id, treated as unmapped"
            ),
        }
    }
    Ok(ids)
}

/// Deduplicated practitioner ids of every participant of every encounter
pub fn practitioner_ids(encounters: &[Encounter]) -> Result<Vec<String>> {
    let mut ids = BTreeSet::new();
    for encounter in encounters {
        let individuals = encounter.participant.iter().filter_map(|p| p.individual.as_ref());
        ids.extend(collect_ids(individuals, "Practitioner", &encounter.id)?);
    }
    Ok(ids.into_iter().collect())
}

/// Deduplicated location ids of every encounter
pub fn facility_ids(encounters: &[Encounter]) -> Result<Vec<String>> {
    let mut ids = BTreeSet::new();
    for encounter in encounters {
        let locations = encounter.location.iter().map(|l| &l.location);
        ids.extend(collect_ids(locations, "Location", &encounter.id)?);
    }
    Ok(ids.into_iter().collect())
}

/// HIE ids that apply to one encounter: its first mapped practitioner and
/// its first mapped location
pub fn encounter_mapping(
    encounter: &Encounter,
    practitioners: &HashMap<String, String>,
    facilities: &HashMap<String, String>,
) -> EncounterMapping {
    let practitioner = encounter
        .participant
        .iter()
        .filter_map(|p| p.individual.as_ref())
        .filter_map(|r| r.id_for("Practitioner"))
        .find_map(|id| practitioners.get(id).cloned());
    let facility = encounter
        .location
        .iter()
        .filter_map(|l| l.location.id_for("Location"))
        .find_map(|id| facilities.get(id).cloned());

    EncounterMapping {
        practitioner,
        facility,
    }
}
