//! Clinical data for one patient on one date

use serde_json::Value;
use std::collections::HashMap;

use super::fhir::{Encounter, Observation, Patient};
use super::{BridgeError, Result};

/// A patient with their encounters and the observations of each encounter
///
/// `observations` is keyed by encounter id. Observation order within an
/// encounter is preserved.
#[derive(Debug, Clone)]
pub struct ClinicalDataset {
    pub patient: Patient,
    pub encounters: Vec<Encounter>,
    pub observations: HashMap<String, Vec<Observation>>,
}

impl ClinicalDataset {
    pub fn new(patient: Patient) -> Self {
        Self {
            patient,
            encounters: Vec::new(),
            observations: HashMap::new(),
        }
    }

    /// Adds an encounter with its observations
    pub fn with_encounter(mut self, encounter: Encounter, observations: Vec<Observation>) -> Self {
        self.observations
            .entry(encounter.id.clone())
            .or_default()
            .extend(observations);
        self.encounters.push(encounter);
        self
    }

    /// Observations recorded under an encounter
    pub fn observations_for(&self, encounter_id: &str) -> &[Observation] {
        self.observations
            .get(encounter_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn observation_count(&self) -> usize {
        self.observations.values().map(Vec::len).sum()
    }

    /// The part of the dataset that belongs to one visit
    ///
    /// Encounters are matched on `partOf = Encounter/<visit_id>`. When no
    /// encounter carries `partOf` at all, the whole dataset is returned; a
    /// visit no encounter names otherwise gets an empty dataset.
    pub fn for_visit(&self, visit_id: &str) -> Self {
        if self.encounters.iter().all(|e| e.part_of.is_none()) {
            return self.clone();
        }

        let encounters: Vec<Encounter> = self
            .encounters
            .iter()
            .filter(|e| {
                e.part_of
                    .as_ref()
                    .and_then(|r| r.id_for("Encounter"))
                    .is_some_and(|id| id == visit_id)
            })
            .cloned()
            .collect();

        let observations = encounters
            .iter()
            .map(|e| (e.id.clone(), self.observations_for(&e.id).to_vec()))
            .collect();
        Self {
            patient: self.patient.clone(),
            encounters,
            observations,
        }
    }

    /// Attaches observations to encounters by their `encounter` reference
    ///
    /// Observations referring to an encounter outside the dataset, or to no
    /// encounter, go to `fallback_encounter` when given and are dropped
    /// otherwise. Returns the number of observations dropped.
    pub fn attach_observations(
        &mut self,
        observations: Vec<Observation>,
        fallback_encounter: Option<&str>,
    ) -> usize {
        let mut dropped = 0;
        for obs in observations {
            let target = obs
                .encounter
                .as_ref()
                .and_then(|r| r.reference.as_deref())
                .map(encounter_id_from_reference)
                .filter(|id| self.encounters.iter().any(|e| e.id == *id))
                .map(str::to_string)
                .or_else(|| fallback_encounter.map(str::to_string));
            match target {
                Some(encounter_id) => self.observations.entry(encounter_id).or_default().push(obs),
                None => dropped += 1,
            }
        }
        dropped
    }

    /// Rebuilds a dataset from an inbound FHIR bundle
    ///
    /// The bundle must hold at least one Encounter. When it carries no
    /// Patient, one is derived from the first encounter's subject.
    pub fn from_bundle(bundle: &Value) -> Result<Self> {
        let entries = bundle
            .get("entry")
            .and_then(Value::as_array)
            .ok_or_else(|| BridgeError::Validation("bundle has no entry array".to_string()))?;

        let mut patient: Option<Patient> = None;
        let mut encounters = Vec::new();
        let mut observations = Vec::new();

        for entry in entries {
            let Some(resource) = entry.get("resource") else {
                continue;
            };
            match resource.get("resourceType").and_then(Value::as_str) {
                Some("Patient") if patient.is_none() => {
                    patient = Some(serde_json::from_value(resource.clone())?);
                }
                Some("Encounter") => {
                    encounters.push(serde_json::from_value::<Encounter>(resource.clone())?);
                }
                Some("Observation") => {
                    observations.push(serde_json::from_value::<Observation>(resource.clone())?);
                }
                _ => {}
            }
        }

        let first = encounters
            .first()
            .ok_or_else(|| BridgeError::Validation("bundle holds no Encounter".to_string()))?;
        let first_id = first.id.clone();

        let patient = match patient {
            Some(p) => p,
            None => {
                let id = first
                    .subject
                    .as_ref()
                    .and_then(|s| s.id_for("Patient"))
                    .ok_or_else(|| {
                        BridgeError::Validation(
                            "bundle holds no Patient and the encounter has no subject".to_string(),
                        )
                    })?;
                Patient::new(id)
            }
        };

        let mut dataset = Self::new(patient);
        for encounter in encounters {
            dataset.observations.entry(encounter.id.clone()).or_default();
            dataset.encounters.push(encounter);
        }
        dataset.attach_observations(observations, Some(&first_id));
        Ok(dataset)
    }
}

/// Strips `Encounter/` or `urn:uuid:` from an encounter reference
fn encounter_id_from_reference(reference: &str) -> &str {
    reference
        .strip_prefix("Encounter/")
        .or_else(|| reference.strip_prefix("urn:uuid:"))
        .unwrap_or(reference)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_bundle_groups_observations() {
        let bundle = json!({
            "resourceType": "Bundle",
            "entry": [
                {"resource": {"resourceType": "Patient", "id": "p1"}},
                {"resource": {"resourceType": "Encounter", "id": "e1", "status": "finished"}},
                {"resource": {"resourceType": "Encounter", "id": "e2", "status": "finished"}},
                {"resource": {"resourceType": "Observation", "id": "o1", "status": "final",
                    "code": {"text": "Weight"}, "encounter": {"reference": "Encounter/e2"}}},
                {"resource": {"resourceType": "Observation", "id": "o2", "status": "final",
                    "code": {"text": "Height"}}}
            ]
        });

        let dataset = ClinicalDataset::from_bundle(&bundle).unwrap();
        assert_eq!(dataset.patient.id, "p1");
        assert_eq!(dataset.encounters.len(), 2);
        assert_eq!(dataset.observations_for("e2")[0].id, "o1");
        assert_eq!(dataset.observations_for("e1")[0].id, "o2");
        assert_eq!(dataset.observation_count(), 2);
    }

    fn visit_encounter(id: &str, visit_id: Option<&str>) -> Encounter {
        let mut enc = Encounter::new(id);
        enc.part_of = visit_id.map(|v| crate::domain::fhir::Reference::to(format!("Encounter/{v}")));
        enc
    }

    fn ids(dataset: &ClinicalDataset) -> Vec<&str> {
        dataset.encounters.iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn test_for_visit_keeps_sibling_visits_apart() {
        let dataset = ClinicalDataset::new(Patient::new("p1"))
            .with_encounter(
                visit_encounter("e1", Some("v1")),
                vec![Observation::new("o1", Default::default())],
            )
            .with_encounter(visit_encounter("e2", None), vec![]);

        let v1 = dataset.for_visit("v1");
        assert_eq!(ids(&v1), vec!["e1"]);
        assert_eq!(v1.observation_count(), 1);

        let v2 = dataset.for_visit("v2");
        assert!(v2.encounters.is_empty());
        assert_eq!(v2.observation_count(), 0);
    }

    #[test]
    fn test_for_visit_without_part_of_uses_whole_dataset() {
        let dataset = ClinicalDataset::new(Patient::new("p1"))
            .with_encounter(visit_encounter("e1", None), vec![])
            .with_encounter(visit_encounter("e2", None), vec![]);

        assert_eq!(ids(&dataset.for_visit("v1")), vec!["e1", "e2"]);
    }

    #[test]
    fn test_from_bundle_derives_patient_from_subject() {
        let bundle = json!({
            "entry": [
                {"resource": {"resourceType": "Encounter", "id": "e1",
                    "subject": {"reference": "Patient/p9"}}}
            ]
        });
        let dataset = ClinicalDataset::from_bundle(&bundle).unwrap();
        assert_eq!(dataset.patient.id, "p9");
    }

    #[test]
    fn test_from_bundle_without_encounter_fails() {
        let bundle = json!({"entry": [{"resource": {"resourceType": "Patient", "id": "p1"}}]});
        assert!(matches!(
            ClinicalDataset::from_bundle(&bundle),
            Err(BridgeError::Validation(_))
        ));
    }

    #[test]
    fn test_attach_without_fallback_drops_orphans() {
        let mut dataset =
            ClinicalDataset::new(Patient::new("p1")).with_encounter(Encounter::new("e1"), vec![]);
        let mut orphan = Observation::new("o1", Default::default());
        orphan.encounter = Some(crate::domain::fhir::Reference::to("Encounter/other"));
        assert_eq!(dataset.attach_observations(vec![orphan], None), 1);
        assert!(dataset.observations_for("e1").is_empty());
    }

    #[test]
    fn test_for_visit_selects_encounters_of_the_visit() {
        let mut e1 = Encounter::new("e1");
        e1.part_of = Some(crate::domain::fhir::Reference::to("Encounter/v1"));
        let mut e2 = Encounter::new("e2");
        e2.part_of = Some(crate::domain::fhir::Reference::to("Encounter/v2"));
        let dataset = ClinicalDataset::new(Patient::new("p1"))
            .with_encounter(e1, vec![Observation::new("o1", Default::default())])
            .with_encounter(e2, vec![Observation::new("o2", Default::default())]);

        let v1 = dataset.for_visit("v1");
        assert_eq!(v1.encounters.len(), 1);
        assert_eq!(v1.observations_for("e1")[0].id, "o1");
        assert_eq!(v1.observation_count(), 1);

        assert_eq!(dataset.for_visit("unknown").encounters.len(), 2);
    }
}
