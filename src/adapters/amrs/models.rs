//! AMRS REST and FHIR API models
//!
//! Wire structures returned by the OpenMRS REST (`/ws/rest/v1`) and FHIR
//! (`/ws/fhir2/R4`) modules. They are kept apart from the domain model and
//! converted with `to_domain`.

use crate::domain::{AmrsError, PatientId, Result, Visit, VisitId};
use chrono::{DateTime, FixedOffset, Utc};
use serde::Deserialize;
use serde_json::Value;

/// Custom representation requested for visit listings
pub const VISIT_REPRESENTATION: &str = "custom:(uuid,patient:(uuid),stopDatetime)";

/// Hypermedia link in a REST listing
#[derive(Debug, Clone, Deserialize)]
pub struct RestLink {
    pub rel: String,
    pub uri: String,
}

/// Page of a REST resource listing
#[derive(Debug, Clone, Deserialize)]
pub struct RestPage<T> {
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
    #[serde(default)]
    pub links: Vec<RestLink>,
}

impl<T> RestPage<T> {
    /// URI of the next page, if any
    pub fn next_uri(&self) -> Option<&str> {
        self.links
            .iter()
            .find(|l| l.rel == "next")
            .map(|l| l.uri.as_str())
    }
}

/// Patient stub inside a visit
#[derive(Debug, Clone, Deserialize)]
pub struct RestPatientRef {
    pub uuid: String,
}

/// Visit as returned by the custom representation
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestVisit {
    pub uuid: String,
    pub patient: RestPatientRef,
    #[serde(default)]
    pub stop_datetime: Option<String>,
}

impl RestVisit {
    /// Converts to a domain visit; open visits (no stop time) yield `None`
    pub fn to_domain(&self) -> Result<Option<Visit>> {
        let Some(ref stop) = self.stop_datetime else {
            return Ok(None);
        };

        let closed_at = parse_openmrs_datetime(stop)?;
        let visit_id = VisitId::new(self.uuid.clone())
            .map_err(AmrsError::InvalidResponse)?;
        let patient_id = PatientId::new(self.patient.uuid.clone())
            .map_err(AmrsError::InvalidResponse)?;

        Ok(Some(Visit {
            visit_id,
            patient_id,
            closed_at,
        }))
    }
}

/// Parses OpenMRS timestamps (`2024-01-15T10:30:00.000+0000`) and RFC 3339
pub fn parse_openmrs_datetime(value: &str) -> Result<DateTime<Utc>> {
    DateTime::<FixedOffset>::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f%z")
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            AmrsError::InvalidResponse(format!("Invalid timestamp '{value}': {e}")).into()
        })
}

/// Link of a FHIR search bundle
#[derive(Debug, Clone, Deserialize)]
pub struct FhirLink {
    pub relation: String,
    pub url: String,
}

/// Entry of a FHIR search bundle
#[derive(Debug, Clone, Deserialize)]
pub struct FhirSearchEntry {
    #[serde(default)]
    pub resource: Option<Value>,
}

/// Page of a FHIR search result
#[derive(Debug, Clone, Deserialize)]
pub struct FhirSearchBundle {
    #[serde(default)]
    pub entry: Vec<FhirSearchEntry>,
    #[serde(default)]
    pub link: Vec<FhirLink>,
}

impl FhirSearchBundle {
    pub fn next_url(&self) -> Option<&str> {
        self.link
            .iter()
            .find(|l| l.relation == "next")
            .map(|l| l.url.as_str())
    }

    /// Resources of the page
    pub fn resources(self) -> impl Iterator<Item = Value> {
        self.entry.into_iter().filter_map(|e| e.resource)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_openmrs_datetime() {
        let dt = parse_openmrs_datetime("2024-01-15T23:30:00.000+0300").unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-01-15T20:30:00+00:00");

        let dt = parse_openmrs_datetime("2024-01-15T10:00:00Z").unwrap();
        assert_eq!(dt.date_naive().to_string(), "2024-01-15");

        assert!(parse_openmrs_datetime("yesterday").is_err());
    }

    #[test]
    fn test_rest_visit_to_domain() {
        let page: RestPage<RestVisit> = serde_json::from_value(json!({
            "results": [
                {"uuid": "v1", "patient": {"uuid": "p1"}, "stopDatetime": "2024-01-15T10:00:00.000+0000"},
                {"uuid": "v2", "patient": {"uuid": "p1"}, "stopDatetime": null}
            ],
            "links": [{"rel": "next", "uri": "https://amrs/ws/rest/v1/visit?startIndex=100"}]
        }))
        .unwrap();

        assert_eq!(page.next_uri(), Some("https://amrs/ws/rest/v1/visit?startIndex=100"));
        let closed = page.results[0].to_domain().unwrap().unwrap();
        assert_eq!(closed.visit_id.as_str(), "v1");
        assert!(page.results[1].to_domain().unwrap().is_none());
    }

    #[test]
    fn test_fhir_search_bundle_resources() {
        let bundle: FhirSearchBundle = serde_json::from_value(json!({
            "resourceType": "Bundle",
            "entry": [{"resource": {"resourceType": "Encounter", "id": "e1"}}, {}],
            "link": [{"relation": "self", "url": "x"}]
        }))
        .unwrap();
        assert!(bundle.next_url().is_none());
        assert_eq!(bundle.resources().count(), 1);
    }
}
