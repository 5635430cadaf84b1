//! HIE API request and response bodies

use crate::domain::{IdentityMapping, MappingKind};
use serde::{Deserialize, Serialize};

/// Body of a batched mapping lookup
#[derive(Debug, Clone, Serialize)]
pub struct MappingRequest<'a> {
    pub ids: &'a [String],
}

/// One local → remote pair as returned by the mapping endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingPair {
    pub local_id: String,
    #[serde(default)]
    pub remote_id: Option<String>,
}

/// Response of the mapping endpoint
///
/// Unknown ids are either left out or returned with a null `remoteId`.
#[derive(Debug, Clone, Deserialize)]
pub struct MappingResponse {
    #[serde(default)]
    pub mappings: Vec<MappingPair>,
}

impl MappingResponse {
    pub fn to_domain(self, kind: MappingKind) -> Vec<IdentityMapping> {
        self.mappings
            .into_iter()
            .filter_map(|pair| {
                let remote_id = pair.remote_id.filter(|r| !r.is_empty())?;
                Some(IdentityMapping {
                    local_id: pair.local_id,
                    remote_id,
                    kind,
                })
            })
            .collect()
    }
}

/// Response of the facility-code lookup
#[derive(Debug, Clone, Deserialize)]
pub struct FacilityCodeResponse {
    #[serde(default)]
    pub code: Option<String>,
}

/// OAuth2 client-credentials token response
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_expires_in")]
    pub expires_in: u64,
}

fn default_expires_in() -> u64 {
    300
}

/// Status and body returned by one delivery endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryOutcome {
    pub status: u16,
    pub body: String,
}

impl DeliveryOutcome {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Picks the reported outcome of a multi-endpoint delivery
///
/// The first rejecting endpoint wins; when every endpoint accepted, the
/// primary's outcome is reported.
pub fn combine_outcomes(outcomes: Vec<DeliveryOutcome>) -> Option<DeliveryOutcome> {
    match outcomes.iter().position(|o| !o.is_success()) {
        Some(i) => outcomes.into_iter().nth(i),
        None => outcomes.into_iter().next(),
    }
}
