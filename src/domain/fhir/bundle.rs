//! Outbound FHIR collection bundle

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::resources::FhirResource;
use crate::domain::Result;

/// HTTP request stanza of a bundle entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BundleRequest {
    pub method: String,
    pub url: String,
}

/// One entry of a bundle
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleEntry {
    pub full_url: String,
    pub resource: FhirResource,
    pub request: BundleRequest,
}

impl BundleEntry {
    /// Builds an entry after validating the resource's required fields
    ///
    /// The entry gets `fullUrl = urn:uuid:<id>` and a `POST <resourceType>`
    /// request.
    pub fn new(resource: FhirResource) -> Result<Self> {
        resource.validate()?;
        Ok(Self {
            full_url: format!("urn:uuid:{}", resource.id()),
            request: BundleRequest {
                method: "POST".to_string(),
                url: resource.resource_type().to_string(),
            },
            resource,
        })
    }
}

/// FHIR bundle of type `collection`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FhirBundle {
    pub resource_type: String,
    pub id: String,
    #[serde(rename = "type")]
    pub bundle_type: String,
    pub timestamp: String,
    pub entry: Vec<BundleEntry>,
}

impl FhirBundle {
    /// Creates an empty collection bundle with a fresh id
    pub fn collection(timestamp: DateTime<Utc>) -> Self {
        Self {
            resource_type: "Bundle".to_string(),
            id: Uuid::new_v4().to_string(),
            bundle_type: "collection".to_string(),
            timestamp: timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            entry: Vec::new(),
        }
    }

    /// Validates and appends a resource
    pub fn push(&mut self, resource: FhirResource) -> Result<()> {
        self.entry.push(BundleEntry::new(resource)?);
        Ok(())
    }

    /// Number of entries holding the given resource type
    pub fn count_of(&self, resource_type: &str) -> usize {
        self.entry
            .iter()
            .filter(|e| e.resource.resource_type() == resource_type)
            .count()
    }

    pub fn len(&self) -> usize {
        self.entry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entry.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fhir::datatypes::{CodeableConcept, Coding};
    use crate::domain::fhir::resources::Observation;

    fn observation(id: &str) -> FhirResource {
        FhirResource::Observation(Observation::new(
            id,
            CodeableConcept::single(Coding::new("urn:amrs", "5089", "Weight")),
        ))
    }

    #[test]
    fn test_entry_full_url_and_request() {
        let entry = BundleEntry::new(observation("obs-1")).unwrap();
        assert_eq!(entry.full_url, "urn:uuid:obs-1");
        assert_eq!(entry.request.method, "POST");
        assert_eq!(entry.request.url, "Observation");
    }

    #[test]
    fn test_invalid_resource_is_rejected_before_append() {
        let mut bundle = FhirBundle::collection(Utc::now());
        let invalid = FhirResource::Observation(Observation::new("", CodeableConcept::default()));
        assert!(bundle.push(invalid).is_err());
        assert!(bundle.is_empty());
    }

    #[test]
    fn test_bundle_serialization_shape() {
        let mut bundle = FhirBundle::collection(Utc::now());
        bundle.push(observation("obs-1")).unwrap();
        let json = serde_json::to_value(&bundle).unwrap();
        assert_eq!(json["resourceType"], "Bundle");
        assert_eq!(json["type"], "collection");
        assert_eq!(json["entry"][0]["fullUrl"], "urn:uuid:obs-1");
        assert_eq!(json["entry"][0]["resource"]["resourceType"], "Observation");
        assert_eq!(json["entry"][0]["request"]["url"], "Observation");
        assert_eq!(bundle.count_of("Observation"), 1);
    }

    #[test]
    fn test_bundles_get_unique_ids() {
        let now = Utc::now();
        assert_ne!(FhirBundle::collection(now).id, FhirBundle::collection(now).id);
    }
}
