//! FHIR bundle construction
//!
//! [`FhirTransformer::transform`] turns one patient's clinical dataset into
//! an HIE-ready collection bundle:
//!
//! 1. collect practitioner and location ids from every encounter
//! 2. resolve practitioners, facilities and the patient concurrently
//! 3. rewrite each encounter and its regular observations in order
//! 4. hold drug and note observations back, then append one Composition for
//!    all notes and one MedicationRequest per drug

use super::classify::{ConceptSets, ObservationKind};
use super::encounter::{transform_encounter, transform_observation};
use super::references::{encounter_mapping, facility_ids, practitioner_ids, RegistryUrls};
use super::synthesize::{composition_from_notes, medication_request_from, DeferredObservation};
use crate::config::BridgeConfig;
use crate::core::mapping::IdentityMappingService;
use crate::domain::fhir::{FhirBundle, FhirResource};
use crate::domain::{BridgeError, ClinicalDataset, MappingKind, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use std::sync::Arc;

/// Builds outbound bundles from clinical datasets
pub struct FhirTransformer {
    mapping: Arc<IdentityMappingService>,
    urls: RegistryUrls,
    concepts: ConceptSets,
}

impl FhirTransformer {
    pub fn new(mapping: Arc<IdentityMappingService>, urls: RegistryUrls, concepts: ConceptSets) -> Self {
        Self {
            mapping,
            urls,
            concepts,
        }
    }

    pub fn from_config(mapping: Arc<IdentityMappingService>, config: &BridgeConfig) -> Self {
        Self::new(
            mapping,
            RegistryUrls::from_config(&config.hie),
            ConceptSets::from_config(&config.transform),
        )
    }

    /// Builds the bundle for `dataset`, stamped with the current time
    pub async fn transform(&self, dataset: &ClinicalDataset) -> Result<FhirBundle> {
        self.transform_at(dataset, Utc::now()).await
    }

    /// Builds the bundle for `dataset`, stamped with `timestamp`
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::MalformedReference`] when a participant or
    /// location reference has the wrong resource type, mapping errors from
    /// the resolver, and validation errors for resources missing required
    /// fields.
    pub async fn transform_at(
        &self,
        dataset: &ClinicalDataset,
        timestamp: DateTime<Utc>,
    ) -> Result<FhirBundle> {
        let practitioner_ids = practitioner_ids(&dataset.encounters)?;
        let facility_ids = facility_ids(&dataset.encounters)?;
        let patient_ids = vec![dataset.patient.id.clone()];

        let (practitioners, facilities, patients) = tokio::try_join!(
            self.mapping.resolve_practitioner_ids(&practitioner_ids),
            self.mapping.resolve_facility_ids(&facility_ids),
            self.mapping.resolve_patient_ids(&patient_ids),
        )?;

        let subject = match patients.get(&dataset.patient.id) {
            Some(remote) => Some(self.urls.patient(remote)),
            None => {
                let err = BridgeError::MappingUnavailable {
                    kind: MappingKind::Patient.to_string(),
                    local_id: dataset.patient.id.clone(),
                };
                tracing::warn!(error = %err, "Subject reference omitted");
                None
            }
        };

        let mut bundle = FhirBundle::collection(timestamp);
        let mut notes = Vec::new();
        let mut drugs = Vec::new();

        for encounter in &dataset.encounters {
            let mapping = encounter_mapping(encounter, &practitioners, &facilities);
            let rewritten = transform_encounter(
                encounter,
                subject.as_ref(),
                &practitioners,
                &mapping,
                &self.urls,
            );
            bundle.push(FhirResource::Encounter(rewritten))?;

            for observation in dataset.observations_for(&encounter.id) {
                match self.concepts.classify(observation) {
                    ObservationKind::Regular => {
                        let rewritten = transform_observation(
                            observation,
                            &encounter.id,
                            subject.as_ref(),
                            &mapping,
                            &self.urls,
                        );
                        bundle.push(FhirResource::Observation(rewritten))?;
                    }
                    kind => {
                        let deferred = DeferredObservation {
                            observation: observation.clone(),
                            encounter_id: encounter.id.clone(),
                            mapping: mapping.clone(),
                        };
                        if kind == ObservationKind::Drug {
                            drugs.push(deferred);
                        } else {
                            notes.push(deferred);
                        }
                    }
                }
            }
        }

        let fallback_date = timestamp.to_rfc3339_opts(SecondsFormat::Secs, true);
        if let Some(composition) =
            composition_from_notes(&notes, subject.as_ref(), &self.urls, &fallback_date)
        {
            bundle.push(FhirResource::Composition(composition))?;
        }
        for drug in &drugs {
            let request = medication_request_from(drug, subject.as_ref(), &self.urls);
            bundle.push(FhirResource::MedicationRequest(request))?;
        }

        tracing::debug!(
            patient_id = %dataset.patient.id,
            encounters = dataset.encounters.len(),
            entries = bundle.len(),
            notes = notes.len(),
            drugs = drugs.len(),
            "Bundle built"
        );

        Ok(bundle)
    }
}
