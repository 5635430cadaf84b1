//! Shared fixtures and in-process fakes for the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use hie_bridge::adapters::amrs::{ClinicalDataSource, VisitSource};
use hie_bridge::adapters::hie::{BundleSink, DeadLetterSink, DeliveryOutcome, IdentityResolver};
use hie_bridge::core::mapping::IdentityMappingService;
use hie_bridge::core::transform::{ConceptSets, FhirTransformer, RegistryUrls};
use hie_bridge::domain::fhir::{
    CodeableConcept, Coding, Encounter, EncounterLocation, EncounterParticipant, FhirBundle,
    Observation, Patient, Reference,
};
use hie_bridge::domain::{
    BridgeError, ClinicalDataset, ClosedVisits, DeadLetterEntry, EncounterContext,
    IdentityMapping, MappingKind, PatientId, Result, Visit, VisitId,
};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const CIEL: &str = "https://openconceptlab.org/orgs/CIEL/sources/CIEL";
pub const CLIENT_REGISTRY: &str = "https://hie.test/cr";
pub const HEALTH_WORKER_REGISTRY: &str = "https://hie.test/hwr";
pub const FACILITY_REGISTRY: &str = "https://hie.test/fr";

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn visit(visit_id: &str, patient_id: &str, closed: NaiveDate, hour: u32) -> Visit {
    Visit {
        visit_id: VisitId::new(visit_id).unwrap(),
        patient_id: PatientId::new(patient_id).unwrap(),
        closed_at: Utc
            .from_utc_datetime(&closed.and_hms_opt(hour, 0, 0).unwrap()),
    }
}

pub fn concept(code: &str, display: &str) -> CodeableConcept {
    CodeableConcept::single(Coding::new(CIEL, code, display))
}

/// Encounter of `visit_id` attended by `practitioner` at `location`
pub fn encounter(id: &str, visit_id: &str, practitioner: &str, location: &str) -> Encounter {
    let mut enc = Encounter::new(id);
    enc.subject = None;
    enc.participant = vec![EncounterParticipant {
        participant_type: Vec::new(),
        individual: Some(Reference::to(format!("Practitioner/{practitioner}"))),
    }];
    enc.location = vec![EncounterLocation {
        location: Reference::to(format!("Location/{location}")),
    }];
    enc.part_of = Some(Reference::to(format!("Encounter/{visit_id}")));
    enc
}

pub fn observation(id: &str, code: &str, display: &str) -> Observation {
    let mut obs = Observation::new(id, concept(code, display));
    obs.performer = vec![Reference::to("Practitioner/prov-1")];
    obs
}

pub fn note(id: &str, text: &str) -> Observation {
    let mut obs = Observation::new(id, concept("162169", "Clinical note"));
    obs.value_string = Some(text.to_string());
    obs
}

pub fn drug(id: &str) -> Observation {
    let mut obs = Observation::new(id, concept("1282", "Drug orders"));
    obs.value_codeable_concept = Some(concept("71617", "Paracetamol"));
    obs
}

/// One encounter with two regular observations, one drug and one note
pub fn scenario_dataset(patient_id: &str, visit_id: &str) -> ClinicalDataset {
    ClinicalDataset::new(Patient::new(patient_id)).with_encounter(
        encounter(&format!("enc-{visit_id}"), visit_id, "prov-1", "loc-1"),
        vec![
            observation(&format!("{visit_id}-weight"), "5089", "Weight"),
            observation(&format!("{visit_id}-height"), "5090", "Height"),
            drug(&format!("{visit_id}-drug")),
            note(&format!("{visit_id}-note"), "Patient stable"),
        ],
    )
}

pub fn entry_types(bundle: &FhirBundle) -> Vec<String> {
    bundle
        .entry
        .iter()
        .map(|e| e.resource.resource_type().to_string())
        .collect()
}

pub fn bundle_json(bundle: &FhirBundle) -> Value {
    serde_json::to_value(bundle).unwrap()
}

/// Resolver answering from fixed tables and counting calls per kind
#[derive(Default)]
pub struct FakeResolver {
    pub mappings: HashMap<(MappingKind, String), String>,
    pub facility_codes: HashMap<String, String>,
    pub contexts: HashMap<String, EncounterContext>,
    pub calls: Mutex<Vec<(MappingKind, Vec<String>)>>,
    pub delay: Option<Duration>,
}

impl FakeResolver {
    /// Maps prov-1, loc-1 and every `patients` id
    pub fn standard(patients: &[&str]) -> Self {
        let mut resolver = Self::default()
            .with(MappingKind::Practitioner, "prov-1", "HWR-1")
            .with(MappingKind::Facility, "loc-1", "FR-1");
        for p in patients {
            resolver = resolver.with(MappingKind::Patient, p, &format!("CR-{p}"));
        }
        resolver
    }

    pub fn with(mut self, kind: MappingKind, local: &str, remote: &str) -> Self {
        self.mappings
            .insert((kind, local.to_string()), remote.to_string());
        self
    }

    pub fn with_context(mut self, encounter_id: &str, location: &str, visit_id: &str) -> Self {
        self.contexts.insert(
            encounter_id.to_string(),
            EncounterContext {
                location_uuid: location.to_string(),
                visit_uuid: visit_id.to_string(),
            },
        );
        self
    }

    pub fn with_facility_code(mut self, location: &str, code: &str) -> Self {
        self.facility_codes
            .insert(location.to_string(), code.to_string());
        self
    }

    pub fn calls_for(&self, kind: MappingKind) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _)| *k == kind)
            .count()
    }
}

#[async_trait]
impl IdentityResolver for FakeResolver {
    async fn resolve(&self, kind: MappingKind, ids: &[String]) -> Result<Vec<IdentityMapping>> {
        self.calls.lock().unwrap().push((kind, ids.to_vec()));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(ids
            .iter()
            .filter_map(|id| {
                self.mappings
                    .get(&(kind, id.clone()))
                    .map(|remote| IdentityMapping {
                        local_id: id.clone(),
                        remote_id: remote.clone(),
                        kind,
                    })
            })
            .collect())
    }

    async fn get_facility_code_for_location(&self, location_id: &str) -> Result<Option<String>> {
        Ok(self.facility_codes.get(location_id).cloned())
    }

    async fn get_encounter_context(&self, encounter_id: &str) -> Result<Option<EncounterContext>> {
        Ok(self.contexts.get(encounter_id).cloned())
    }
}

pub fn transformer(resolver: Arc<FakeResolver>) -> FhirTransformer {
    let mapping = Arc::new(IdentityMappingService::new(
        resolver,
        Duration::from_secs(3600),
        1000,
    ));
    FhirTransformer::new(
        mapping,
        RegistryUrls {
            client_registry: CLIENT_REGISTRY.to_string(),
            health_worker_registry: HEALTH_WORKER_REGISTRY.to_string(),
            facility_registry: FACILITY_REGISTRY.to_string(),
        },
        ConceptSets::default(),
    )
}

/// AMRS stand-in serving fixed visits and datasets
#[derive(Default)]
pub struct FakeAmrs {
    pub visits: HashMap<NaiveDate, Vec<Visit>>,
    pub datasets: HashMap<String, ClinicalDataset>,
    pub fail_discovery: bool,
    pub fetches: AtomicUsize,
}

impl FakeAmrs {
    pub fn with_visit(mut self, visit: Visit, dataset: ClinicalDataset) -> Self {
        let closed = visit.closed_at.date_naive();
        let patient = visit.patient_id.as_str().to_string();
        self.visits.entry(closed).or_default().push(visit);
        match self.datasets.get_mut(&patient) {
            Some(existing) => {
                for enc in dataset.encounters {
                    let observations = dataset
                        .observations
                        .get(&enc.id)
                        .cloned()
                        .unwrap_or_default();
                    existing
                        .observations
                        .entry(enc.id.clone())
                        .or_default()
                        .extend(observations);
                    existing.encounters.push(enc);
                }
            }
            None => {
                self.datasets.insert(patient, dataset);
            }
        }
        self
    }
}

#[async_trait]
impl VisitSource for FakeAmrs {
    async fn find_closed_visits(&self, date: NaiveDate) -> Result<ClosedVisits> {
        if self.fail_discovery {
            return Err(BridgeError::Query("AMRS unavailable".to_string()));
        }
        Ok(ClosedVisits::from_visits(
            self.visits.get(&date).cloned().unwrap_or_default(),
        ))
    }
}

#[async_trait]
impl ClinicalDataSource for FakeAmrs {
    async fn get_patient_data_for_date(
        &self,
        patient_id: &PatientId,
        _date: NaiveDate,
    ) -> Result<ClinicalDataset> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.datasets
            .get(patient_id.as_str())
            .cloned()
            .ok_or_else(|| BridgeError::Query(format!("no data for {patient_id}")))
    }
}

/// Sink recording every bundle; rejects bundles mentioning a listed resource id
#[derive(Default)]
pub struct RecordingSink {
    pub bundles: Mutex<Vec<FhirBundle>>,
    pub reject_ids: HashSet<String>,
    pub reject_status: u16,
    pub failures_before_success: AtomicUsize,
}

impl RecordingSink {
    pub fn rejecting(ids: &[&str], status: u16) -> Self {
        Self {
            reject_ids: ids.iter().map(|s| s.to_string()).collect(),
            reject_status: status,
            ..Self::default()
        }
    }

    pub fn posted(&self) -> usize {
        self.bundles.lock().unwrap().len()
    }
}

#[async_trait]
impl BundleSink for RecordingSink {
    async fn post_bundle(&self, bundle: &FhirBundle) -> Result<DeliveryOutcome> {
        self.bundles.lock().unwrap().push(bundle.clone());

        if self
            .failures_before_success
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Ok(DeliveryOutcome {
                status: 503,
                body: "unavailable".to_string(),
            });
        }

        let rejected = bundle
            .entry
            .iter()
            .any(|e| self.reject_ids.contains(e.resource.id()));
        Ok(if rejected {
            DeliveryOutcome {
                status: self.reject_status,
                body: "rejected".to_string(),
            }
        } else {
            DeliveryOutcome {
                status: 201,
                body: String::new(),
            }
        })
    }
}

#[derive(Default)]
pub struct RecordingDeadLetter {
    pub entries: Mutex<Vec<DeadLetterEntry>>,
    pub unreachable: bool,
}

#[async_trait]
impl DeadLetterSink for RecordingDeadLetter {
    async fn post(&self, entry: &DeadLetterEntry) -> Result<()> {
        if self.unreachable {
            return Err(BridgeError::DeadLetter("connection refused".to_string()));
        }
        self.entries.lock().unwrap().push(entry.clone());
        Ok(())
    }
}
