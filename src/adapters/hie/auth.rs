//! HIE access-token provider
//!
//! Tokens come from the OAuth2 client-credentials grant and are cached in a
//! `moka` cache keyed by client id. Each entry expires `expires_in` minus the
//! configured refresh margin after it was fetched. Concurrent callers that
//! miss the cache share a single token request through `try_get_with`.

use crate::config::{HieConfig, SecretString};
use crate::domain::{BridgeError, HieError, Result};
use moka::future::Cache;
use moka::Expiry;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::Serialize;
use std::time::{Duration, Instant};

use super::models::TokenResponse;

/// Access token with its remaining cache lifetime
#[derive(Clone)]
struct CachedToken {
    access_token: SecretString,
    ttl: Duration,
}

struct TokenExpiry;

impl Expiry<String, CachedToken> for TokenExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CachedToken,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

#[derive(Serialize)]
struct ClientCredentialsRequest<'a> {
    grant_type: &'static str,
    client_id: &'a str,
    client_secret: &'a str,
}

/// Fetches and caches bearer tokens for HIE requests
pub struct TokenProvider {
    client: Client,
    token_url: String,
    client_id: String,
    client_secret: SecretString,
    refresh_margin: Duration,
    cache: Cache<String, CachedToken>,
}

impl TokenProvider {
    pub fn new(client: Client, config: &HieConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(16)
            .expire_after(TokenExpiry)
            .build();

        Self {
            client,
            token_url: config.token_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            refresh_margin: Duration::from_secs(config.token_refresh_margin_seconds),
            cache,
        }
    }

    /// Returns a valid access token, fetching one when none is cached
    pub async fn access_token(&self) -> Result<SecretString> {
        self.cache
            .try_get_with(self.client_id.clone(), self.fetch_token())
            .await
            .map(|cached| cached.access_token)
            .map_err(|e| BridgeError::Authentication(e.to_string()))
    }

    /// `Authorization` header value for the current token
    pub async fn bearer_header(&self) -> Result<String> {
        let token = self.access_token().await?;
        Ok(format!("Bearer {}", token.expose_secret().as_str()))
    }

    /// Drops the cached token so the next call fetches a fresh one
    pub async fn invalidate(&self) {
        self.cache.invalidate(&self.client_id).await;
    }

    async fn fetch_token(&self) -> Result<CachedToken> {
        tracing::debug!(
            token_url = %self.token_url,
            client_id = %self.client_id,
            "Requesting HIE access token"
        );

        let body = ClientCredentialsRequest {
            grant_type: "client_credentials",
            client_id: &self.client_id,
            client_secret: self.client_secret.expose_secret().as_str(),
        };

        let response = self
            .client
            .post(&self.token_url)
            .form(&body)
            .send()
            .await
            .map_err(|e| HieError::ConnectionFailed(format!("Token request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(HieError::TokenFailed(format!("status {status}: {text}")).into());
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| HieError::InvalidResponse(format!("Unreadable token response: {e}")))?;

        let ttl = Duration::from_secs(token.expires_in).saturating_sub(self.refresh_margin);
        tracing::info!(
            expires_in = token.expires_in,
            cached_for_secs = ttl.as_secs(),
            "Acquired HIE access token"
        );

        Ok(CachedToken {
            access_token: crate::config::secret_string(token.access_token),
            ttl,
        })
    }
}
