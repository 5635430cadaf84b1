//! AMRS (OpenMRS) REST client
//!
//! Discovers closed visits through the REST visit resource and reads
//! clinical data through the FHIR2 module. Every request carries HTTP basic
//! credentials and is retried with exponential backoff.

use super::models::{FhirSearchBundle, RestPage, RestVisit, VISIT_REPRESENTATION};
use super::source::{ClinicalDataSource, VisitSource};
use crate::adapters::retry::retry_request;
use crate::config::AmrsConfig;
use crate::domain::fhir::{Encounter, Observation, Patient};
use crate::domain::{
    AmrsError, BridgeError, ClinicalDataset, ClosedVisits, PatientId, Result,
};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration as ChronoDuration, NaiveDate};
use reqwest::{Client, ClientBuilder, StatusCode};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

const REST_PATH: &str = "ws/rest/v1";
const FHIR_PATH: &str = "ws/fhir2/R4";

/// HTTP client for one AMRS instance
pub struct AmrsClient {
    base_url: Url,
    client: Client,
    config: AmrsConfig,
}

impl AmrsClient {
    /// Create a new client
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the base URL is invalid or the
    /// HTTP client cannot be built.
    pub fn new(config: AmrsConfig) -> Result<Self> {
        let mut base = config.base_url.trim_end_matches('/').to_string();
        base.push('/');
        let base_url = Url::parse(&base).map_err(|e| {
            BridgeError::Configuration(format!("Invalid amrs.base_url '{}': {e}", config.base_url))
        })?;

        let mut builder = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(30));
        if !config.tls_verify {
            builder = builder.danger_accept_invalid_certs(true);
        }
        let client = builder.build().map_err(|e| {
            BridgeError::Configuration(format!("Failed to build AMRS HTTP client: {e}"))
        })?;

        Ok(Self {
            base_url,
            client,
            config,
        })
    }

    fn auth_header_value(&self) -> String {
        let credentials = format!(
            "{}:{}",
            self.config.username,
            self.config.password.expose_secret().as_str()
        );
        format!(
            "Basic {}",
            general_purpose::STANDARD.encode(credentials.as_bytes())
        )
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| BridgeError::Configuration(format!("Invalid AMRS path '{path}': {e}")))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        retry_request(&self.config.retry, || self.get_json_once(url)).await
    }

    async fn get_json_once<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let resp = self
            .client
            .get(url)
            .header("Authorization", self.auth_header_value())
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AmrsError::Timeout(e.to_string())
                } else {
                    AmrsError::ConnectionFailed(e.to_string())
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let err = match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    AmrsError::AuthenticationFailed(format!("{status}: {body}"))
                }
                StatusCode::NOT_FOUND => AmrsError::PatientNotFound(url.to_string()),
                _ => AmrsError::QueryFailed(format!("GET {url} failed with {status}: {body}")),
            };
            return Err(err.into());
        }

        let value = resp
            .json::<T>()
            .await
            .map_err(|e| AmrsError::InvalidResponse(e.to_string()))?;
        Ok(value)
    }

    /// Runs a FHIR search and follows `next` links until exhausted
    async fn search_all<T: DeserializeOwned>(&self, first: Url) -> Result<Vec<T>> {
        let mut resources = Vec::new();
        let mut next = Some(first.to_string());

        while let Some(url) = next.take() {
            let page: FhirSearchBundle = self.get_json(&url).await?;
            next = page.next_url().map(str::to_string);
            for resource in page.resources() {
                resources.push(serde_json::from_value(resource).map_err(|e| {
                    AmrsError::InvalidResponse(format!("Unreadable FHIR resource: {e}"))
                })?);
            }
        }

        Ok(resources)
    }

    fn date_window(&self, date: NaiveDate) -> (String, String) {
        let next_day = date + ChronoDuration::days(1);
        (format!("ge{date}"), format!("lt{next_day}"))
    }
}

#[async_trait]
impl VisitSource for AmrsClient {
    async fn find_closed_visits(&self, date: NaiveDate) -> Result<ClosedVisits> {
        let from = date - ChronoDuration::days(i64::from(self.config.visit_lookback_days));
        let mut url = self.endpoint(&format!("{REST_PATH}/visit"))?;
        url.query_pairs_mut()
            .append_pair("fromStartDate", &from.to_string())
            .append_pair("includeInactive", "true")
            .append_pair("v", VISIT_REPRESENTATION)
            .append_pair("limit", &self.config.page_size.to_string());

        tracing::debug!(date = %date, from_start_date = %from, "Querying AMRS visits");

        let mut visits = Vec::new();
        let mut next = Some(url.to_string());
        let mut pages = 0usize;

        while let Some(page_url) = next.take() {
            let page: RestPage<RestVisit> = self.get_json(&page_url).await?;
            pages += 1;
            next = page.next_uri().map(str::to_string);

            for raw in &page.results {
                if let Some(visit) = raw.to_domain()? {
                    if visit.closed_at.date_naive() == date {
                        visits.push(visit);
                    }
                }
            }
        }

        let closed = ClosedVisits::from_visits(visits);
        tracing::info!(
            date = %date,
            pages = pages,
            patients = closed.patient_count(),
            visits = closed.visit_count(),
            "Closed visits discovered"
        );
        Ok(closed)
    }
}

#[async_trait]
impl ClinicalDataSource for AmrsClient {
    async fn get_patient_data_for_date(
        &self,
        patient_id: &PatientId,
        date: NaiveDate,
    ) -> Result<ClinicalDataset> {
        let patient_url = self.endpoint(&format!("{FHIR_PATH}/Patient/{patient_id}"))?;
        let patient: Patient = self.get_json(patient_url.as_str()).await?;

        let (ge, lt) = self.date_window(date);
        let count = self.config.page_size.to_string();

        let mut encounter_url = self.endpoint(&format!("{FHIR_PATH}/Encounter"))?;
        encounter_url
            .query_pairs_mut()
            .append_pair("subject", patient_id.as_str())
            .append_pair("date", &ge)
            .append_pair("date", &lt)
            .append_pair("_count", &count);
        let encounters: Vec<Encounter> = self.search_all(encounter_url).await?;

        let mut observation_url = self.endpoint(&format!("{FHIR_PATH}/Observation"))?;
        observation_url
            .query_pairs_mut()
            .append_pair("subject", patient_id.as_str())
            .append_pair("date", &ge)
            .append_pair("date", &lt)
            .append_pair("_count", &count);
        let observations: Vec<Observation> = self.search_all(observation_url).await?;

        let mut dataset = ClinicalDataset::new(patient);
        for encounter in encounters {
            dataset.observations.entry(encounter.id.clone()).or_default();
            dataset.encounters.push(encounter);
        }
        let dropped = dataset.attach_observations(observations, None);
        if dropped > 0 {
            tracing::debug!(
                patient_id = %patient_id,
                dropped = dropped,
                "Observations outside the day's encounters ignored"
            );
        }

        Ok(dataset)
    }
}
