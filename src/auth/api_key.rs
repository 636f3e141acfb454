//! API-key exchange token provider.
//!
//! Exchanges a long-lived API key for a short-lived bearer token at an identity
//! endpoint, caches it in memory and refreshes before expiration.

use crate::auth::TokenProvider;
use crate::error::InferenceError;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

const DEFAULT_GRANT_TYPE: &str = "api_key";
const EXPIRY_SAFETY_WINDOW: i64 = 300; // 5 minutes

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
    /// Absolute expiry (unix seconds), preferred over `expires_in` when present
    expiration: Option<i64>,
}

#[derive(Clone)]
struct CachedToken {
    token: SecretString,
    exp_unix: i64,
}

/// Token provider that trades an API key for bearer tokens.
pub struct ApiKeyTokenProvider {
    http: reqwest::Client,
    token_url: String,
    api_key: SecretString,
    grant_type: String,
    // Held across the refresh so concurrent callers wait for a single fetch
    cache: Mutex<Option<CachedToken>>,
    // Set by `invalidate`, consumed under the cache lock
    stale: AtomicBool,
}

impl ApiKeyTokenProvider {
    pub fn new(http: reqwest::Client, token_url: impl Into<String>, api_key: SecretString) -> Self {
        Self {
            http,
            token_url: token_url.into(),
            api_key,
            grant_type: DEFAULT_GRANT_TYPE.to_string(),
            cache: Mutex::new(None),
            stale: AtomicBool::new(false),
        }
    }

    pub fn with_grant_type(mut self, grant_type: impl Into<String>) -> Self {
        self.grant_type = grant_type.into();
        self
    }

    async fn fetch_new_token(&self) -> Result<CachedToken, InferenceError> {
        tracing::debug!(url = %self.token_url, "Exchanging API key for bearer token");
        let form = [
            ("grant_type", self.grant_type.as_str()),
            ("apikey", self.api_key.expose_secret()),
        ];
        let resp = self
            .http
            .post(&self.token_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&form)
            .send()
            .await
            .map_err(|e| InferenceError::HttpError(format!("Token endpoint request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(InferenceError::AuthenticationError(format!(
                "token endpoint returned http={status} body_sample={}",
                body.chars().take(200).collect::<String>()
            )));
        }

        let tr: TokenResponse = resp.json().await.map_err(|e| {
            InferenceError::ParseError(format!("Failed to parse token response: {e}"))
        })?;

        let now = chrono::Utc::now().timestamp();
        let exp_unix = tr
            .expiration
            .or_else(|| tr.expires_in.map(|secs| now + secs))
            .unwrap_or(now + 3600);

        Ok(CachedToken {
            token: SecretString::from(tr.access_token),
            exp_unix,
        })
    }
}

#[async_trait::async_trait]
impl TokenProvider for ApiKeyTokenProvider {
    async fn token(&self) -> Result<SecretString, InferenceError> {
        let mut guard = self.cache.lock().await;
        if self.stale.swap(false, Ordering::AcqRel) {
            guard.take();
        }
        let now = chrono::Utc::now().timestamp();
        if let Some(cached) = guard.as_ref()
            && cached.exp_unix - EXPIRY_SAFETY_WINDOW > now
        {
            return Ok(cached.token.clone());
        }

        let fresh = self.fetch_new_token().await?;
        let token = fresh.token.clone();
        *guard = Some(fresh);
        Ok(token)
    }

    fn invalidate(&self) {
        tracing::debug!("bearer token invalidated");
        self.stale.store(true, Ordering::Release);
    }
}
