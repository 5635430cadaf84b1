//! HIE HTTP client
//!
//! One [`HieClient`] serves every HIE-facing seam: identity lookups against
//! the mapping service, bundle delivery to the SHR and its mirrors, and the
//! dead-letter endpoint. Requests carry a bearer token from
//! [`TokenProvider`]; lookups are retried with exponential backoff while
//! deliveries are attempted once and reported as outcomes.

use super::auth::TokenProvider;
use super::models::{
    combine_outcomes, DeliveryOutcome, FacilityCodeResponse, MappingRequest, MappingResponse,
};
use super::traits::{BundleSink, DeadLetterSink, IdentityResolver};
use crate::adapters::retry::retry_request;
use crate::config::HieConfig;
use crate::domain::fhir::FhirBundle;
use crate::domain::{
    BridgeError, DeadLetterEntry, EncounterContext, HieError, IdentityMapping, MappingKind,
    Result,
};
use async_trait::async_trait;
use futures::future::join_all;
use reqwest::{Client, ClientBuilder, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

const FHIR_JSON: &str = "application/fhir+json";

/// Client for the HIE mapping, SHR and dead-letter endpoints
pub struct HieClient {
    client: Client,
    tokens: TokenProvider,
    config: HieConfig,
}

impl HieClient {
    /// Create a new client
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the HTTP client cannot be built.
    pub fn new(config: HieConfig) -> Result<Self> {
        let mut builder = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(config.timeout_seconds));
        if !config.tls_verify {
            builder = builder.danger_accept_invalid_certs(true);
        }
        let client = builder.build().map_err(|e| {
            BridgeError::Configuration(format!("Failed to build HIE HTTP client: {e}"))
        })?;

        let tokens = TokenProvider::new(client.clone(), &config);

        Ok(Self {
            client,
            tokens,
            config,
        })
    }

    fn mapping_endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.mapping_url.trim_end_matches('/'), path)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let bearer = self.tokens.bearer_header().await?;
        let response = request
            .header("Authorization", bearer)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    HieError::Timeout(e.to_string())
                } else {
                    HieError::ConnectionFailed(e.to_string())
                }
            })?;

        if response.status() == StatusCode::UNAUTHORIZED {
            self.tokens.invalidate().await;
        }
        Ok(response)
    }

    /// Reads a JSON body, mapping 404 to `None`
    async fn read_optional<T: DeserializeOwned>(&self, response: Response) -> Result<Option<T>> {
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if status == StatusCode::UNAUTHORIZED {
            return Err(BridgeError::Authentication(
                "HIE rejected the access token".to_string(),
            ));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HieError::from_status(status.as_u16(), body).into());
        }

        let value = response
            .json::<T>()
            .await
            .map_err(|e| HieError::InvalidResponse(e.to_string()))?;
        Ok(Some(value))
    }

    async fn resolve_once(
        &self,
        kind: MappingKind,
        ids: &[String],
    ) -> Result<Vec<IdentityMapping>> {
        let request = self
            .client
            .post(self.mapping_endpoint(kind.as_str()))
            .json(&MappingRequest { ids });
        let response = self.send(request).await?;

        let mappings = self
            .read_optional::<MappingResponse>(response)
            .await?
            .map(|r| r.to_domain(kind))
            .unwrap_or_default();
        Ok(mappings)
    }

    async fn get_optional<T: DeserializeOwned>(&self, url: &str) -> Result<Option<T>> {
        let response = self.send(self.client.get(url)).await?;
        self.read_optional(response).await
    }

    async fn post_bundle_to(&self, url: &str, body: &str) -> Result<DeliveryOutcome> {
        let request = self
            .client
            .post(url)
            .header("Content-Type", FHIR_JSON)
            .body(body.to_string());

        let response = self.send(request).await.map_err(|e| BridgeError::Delivery {
            status: None,
            message: format!("POST {url}: {e}"),
        })?;

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        tracing::debug!(url = %url, http_status = status, "Bundle posted");
        Ok(DeliveryOutcome { status, body })
    }
}

#[async_trait]
impl IdentityResolver for HieClient {
    async fn resolve(&self, kind: MappingKind, ids: &[String]) -> Result<Vec<IdentityMapping>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        tracing::debug!(kind = %kind, count = ids.len(), "Resolving identity mappings");
        let mappings = retry_request(&self.config.retry, || self.resolve_once(kind, ids)).await?;
        tracing::debug!(
            kind = %kind,
            requested = ids.len(),
            resolved = mappings.len(),
            "Identity mappings resolved"
        );
        Ok(mappings)
    }

    async fn get_facility_code_for_location(&self, location_id: &str) -> Result<Option<String>> {
        let url = self.mapping_endpoint(&format!("facility-code/{location_id}"));
        let response: Option<FacilityCodeResponse> =
            retry_request(&self.config.retry, || self.get_optional(&url)).await?;
        Ok(response.and_then(|r| r.code).filter(|c| !c.is_empty()))
    }

    async fn get_encounter_context(
        &self,
        encounter_id: &str,
    ) -> Result<Option<EncounterContext>> {
        let url = self.mapping_endpoint(&format!("encounter-context/{encounter_id}"));
        retry_request(&self.config.retry, || self.get_optional(&url)).await
    }
}

#[async_trait]
impl BundleSink for HieClient {
    async fn post_bundle(&self, bundle: &FhirBundle) -> Result<DeliveryOutcome> {
        let body = serde_json::to_string(bundle)?;
        let urls = self.config.delivery_urls();

        let results = join_all(urls.iter().map(|url| self.post_bundle_to(url, &body))).await;
        let outcomes = results.into_iter().collect::<Result<Vec<_>>>()?;

        combine_outcomes(outcomes).ok_or_else(|| {
            BridgeError::Configuration("No HIE delivery endpoint configured".to_string())
        })
    }
}

#[async_trait]
impl DeadLetterSink for HieClient {
    async fn post(&self, entry: &DeadLetterEntry) -> Result<()> {
        let url = self
            .config
            .dead_letter_url
            .as_deref()
            .ok_or_else(|| BridgeError::DeadLetter("hie.dead_letter_url is not set".to_string()))?;

        let response = self
            .send(self.client.post(url).json(entry))
            .await
            .map_err(|e| BridgeError::DeadLetter(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BridgeError::DeadLetter(format!("{status}: {body}")));
        }
        Ok(())
    }
}
