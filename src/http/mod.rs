//! HTTP plumbing shared by every service.
//!
//! [`HttpTransport`] builds URLs (base URL, path, `version` and scope query
//! parameters), injects the bearer token, sends the request and turns
//! non-success responses into [`InferenceError`] values.

pub mod errors;

pub use errors::{TOKEN_EXPIRED_CODE, classify_http_error, error_from_envelope};

use crate::auth::TokenProvider;
use crate::config::ClientConfig;
use crate::error::InferenceError;
use crate::observability::mask_secret;
use crate::streaming::{EventStream, decode_events};
use futures_util::TryStreamExt;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use reqwest::{Method, RequestBuilder, Response, Url};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

/// Correlation id sent with every request and logged alongside it.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    api_version: String,
    default_headers: HeaderMap,
    timeout: Duration,
    tokens: Arc<dyn TokenProvider>,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url)
            .field("api_version", &self.api_version)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl HttpTransport {
    pub fn new(config: &ClientConfig, tokens: Arc<dyn TokenProvider>) -> Result<Self, InferenceError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| {
                InferenceError::ConfigurationError(format!("failed to build HTTP client: {e}"))
            })?;
        Self::with_client(client, config, tokens)
    }

    /// Use a caller-provided `reqwest::Client`.
    pub fn with_client(
        client: reqwest::Client,
        config: &ClientConfig,
        tokens: Arc<dyn TokenProvider>,
    ) -> Result<Self, InferenceError> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .map_err(|e| InferenceError::ConfigurationError(format!("Invalid user agent: {e}")))?,
        );
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                InferenceError::ConfigurationError(format!("Invalid header name '{name}': {e}"))
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                InferenceError::ConfigurationError(format!("Invalid header value: {e}"))
            })?;
            default_headers.insert(name, value);
        }

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            api_version: config.api_version.clone(),
            default_headers,
            timeout: config.timeout,
            tokens,
        })
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Full URL for `path` with the `version` parameter and `query` appended.
    pub fn url(&self, path: &str, query: &[(&'static str, String)]) -> Result<Url, InferenceError> {
        let mut url = Url::parse(&format!("{}{}", self.base_url, path))
            .map_err(|e| InferenceError::ConfigurationError(format!("Invalid URL for {path}: {e}")))?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("version", &self.api_version);
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&'static str, String)],
    ) -> Result<RequestBuilder, InferenceError> {
        let url = self.url(path, query)?;
        let token = self.tokens.token().await?;
        let bearer = format!("Bearer {}", token.expose_secret());
        let mut auth = HeaderValue::from_str(&bearer).map_err(|e| {
            InferenceError::AuthenticationError(format!("Invalid bearer token: {e}"))
        })?;
        auth.set_sensitive(true);
        let request_id = uuid::Uuid::new_v4().to_string();

        tracing::debug!(
            method = %method,
            url = %url,
            request_id = %request_id,
            authorization = %mask_secret(&bearer),
            "sending request"
        );

        Ok(self
            .client
            .request(method, url)
            .headers(self.default_headers.clone())
            .header(AUTHORIZATION, auth)
            .header(REQUEST_ID_HEADER, request_id))
    }

    /// Send and classify failures; a 401 invalidates the cached token.
    async fn execute(&self, builder: RequestBuilder) -> Result<Response, InferenceError> {
        let response = builder.send().await.map_err(|e| {
            tracing::warn!(error = %e, "request failed before a response arrived");
            InferenceError::from(e)
        })?;
        let status = response.status();
        if status.is_success() {
            tracing::debug!(status = status.as_u16(), "request succeeded");
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let error = classify_http_error(status.as_u16(), &body);
        tracing::warn!(status = status.as_u16(), error = %error, "request failed");
        if status.as_u16() == 401 || error.is_token_expired() {
            self.tokens.invalidate();
        }
        Err(error)
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, InferenceError> {
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| {
            InferenceError::ParseError(format!(
                "unexpected response body: {e}; body_sample={}",
                String::from_utf8_lossy(&bytes[..bytes.len().min(200)])
            ))
        })
    }

    pub async fn post_json<B, T>(
        &self,
        path: &str,
        body: &B,
        timeout: Option<Duration>,
    ) -> Result<T, InferenceError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self
            .request(Method::POST, path, &[])
            .await?
            .header(ACCEPT, "application/json")
            .json(body)
            .timeout(timeout.unwrap_or(self.timeout));
        Self::decode(self.execute(builder).await?).await
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&'static str, String)],
    ) -> Result<T, InferenceError> {
        let builder = self
            .request(Method::GET, path, query)
            .await?
            .header(ACCEPT, "application/json")
            .timeout(self.timeout);
        Self::decode(self.execute(builder).await?).await
    }

    pub async fn get_bytes(
        &self,
        path: &str,
        query: &[(&'static str, String)],
    ) -> Result<bytes::Bytes, InferenceError> {
        let builder = self
            .request(Method::GET, path, query)
            .await?
            .timeout(self.timeout);
        Ok(self.execute(builder).await?.bytes().await?)
    }

    /// DELETE without a response body.
    pub async fn delete(
        &self,
        path: &str,
        query: &[(&'static str, String)],
    ) -> Result<(), InferenceError> {
        let builder = self
            .request(Method::DELETE, path, query)
            .await?
            .timeout(self.timeout);
        self.execute(builder).await?;
        Ok(())
    }

    pub async fn delete_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&'static str, String)],
    ) -> Result<T, InferenceError> {
        let builder = self
            .request(Method::DELETE, path, query)
            .await?
            .header(ACCEPT, "application/json")
            .timeout(self.timeout);
        Self::decode(self.execute(builder).await?).await
    }

    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&'static str, String)],
        form: reqwest::multipart::Form,
    ) -> Result<T, InferenceError> {
        let builder = self
            .request(Method::POST, path, query)
            .await?
            .header(ACCEPT, "application/json")
            .multipart(form)
            .timeout(self.timeout);
        Self::decode(self.execute(builder).await?).await
    }

    /// POST `body` and expose the response as server-sent events.
    ///
    /// `timeout` bounds the wait for response headers only; the body may
    /// stream for as long as the server keeps it open.
    pub async fn open_stream<B>(
        &self,
        path: &str,
        body: &B,
        timeout: Option<Duration>,
    ) -> Result<EventStream, InferenceError>
    where
        B: Serialize + ?Sized,
    {
        let builder = self
            .request(Method::POST, path, &[])
            .await?
            .header(ACCEPT, "text/event-stream")
            .json(body);
        let bound = timeout.unwrap_or(self.timeout);
        let response = tokio::time::timeout(bound, self.execute(builder))
            .await
            .map_err(|_| InferenceError::timeout(path, bound))??;
        tracing::debug!(path, "stream opened");
        let bytes = response.bytes_stream().map_err(InferenceError::from);
        Ok(decode_events(bytes))
    }
}
