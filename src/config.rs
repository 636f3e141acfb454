//! Client configuration.
//!
//! [`ClientConfig`] carries everything the services need besides the request
//! itself: endpoint, credentials, project/space scope, timeouts, polling
//! defaults, the I/O pool size and the retry options.

use crate::error::InferenceError;
use crate::retry::RetryOptions;
use crate::types::Scope;
use secrecy::SecretString;
use std::collections::HashMap;
use std::time::Duration;

pub const DEFAULT_API_VERSION: &str = "2025-04-23";

const ENV_URL: &str = "INFERA_URL";
const ENV_API_KEY: &str = "INFERA_API_KEY";
const ENV_PROJECT_ID: &str = "INFERA_PROJECT_ID";
const ENV_SPACE_ID: &str = "INFERA_SPACE_ID";
const ENV_API_VERSION: &str = "INFERA_API_VERSION";
const ENV_TOKEN_URL: &str = "INFERA_TOKEN_URL";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the inference service (no trailing slash)
    pub base_url: String,
    /// API key used as bearer token unless a custom token provider is supplied
    pub api_key: Option<SecretString>,
    /// Identity endpoint trading the API key for bearer tokens; when absent
    /// the API key itself is sent as the bearer token
    pub token_url: Option<String>,
    /// Default project/space scope merged into requests that do not set one
    pub scope: Scope,
    /// Value of the `version` query parameter sent with every request
    pub api_version: String,
    /// Default request timeout; requests may override it
    pub timeout: Duration,
    pub connect_timeout: Duration,
    /// Default sleep between status polls of long-running operations
    pub poll_interval: Duration,
    /// Default overall bound for long-running operations
    pub poll_timeout: Duration,
    /// Maximum number of streaming calls whose callbacks run concurrently.
    ///
    /// A streaming call keeps its slot until its stream ends. Further calls
    /// get no callbacks until a slot frees, and stop reading the network once
    /// their event buffer is full.
    pub io_pool_size: usize,
    pub retry: RetryOptions,
    pub user_agent: String,
    pub headers: HashMap<String, String>,
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Build a configuration from `INFERA_*` environment variables.
    pub fn from_env() -> Result<Self, InferenceError> {
        let mut builder = Self::builder();
        if let Ok(url) = std::env::var(ENV_URL) {
            builder = builder.base_url(url);
        }
        if let Ok(key) = std::env::var(ENV_API_KEY) {
            builder = builder.api_key(key);
        }
        if let Ok(project) = std::env::var(ENV_PROJECT_ID) {
            builder = builder.project_id(project);
        }
        if let Ok(space) = std::env::var(ENV_SPACE_ID) {
            builder = builder.space_id(space);
        }
        if let Ok(version) = std::env::var(ENV_API_VERSION) {
            builder = builder.api_version(version);
        }
        if let Ok(url) = std::env::var(ENV_TOKEN_URL) {
            builder = builder.token_url(url);
        }
        builder.build()
    }
}

/// Builder for [`ClientConfig`]
#[derive(Debug, Clone, Default)]
pub struct ClientConfigBuilder {
    base_url: Option<String>,
    api_key: Option<SecretString>,
    token_url: Option<String>,
    project_id: Option<String>,
    space_id: Option<String>,
    api_version: Option<String>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    poll_interval: Option<Duration>,
    poll_timeout: Option<Duration>,
    io_pool_size: Option<usize>,
    retry: Option<RetryOptions>,
    user_agent: Option<String>,
    headers: HashMap<String, String>,
}

impl ClientConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::from(key.into()));
        self
    }

    pub fn token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = Some(url.into());
        self
    }

    pub fn project_id(mut self, id: impl Into<String>) -> Self {
        self.project_id = Some(id.into());
        self
    }

    pub fn space_id(mut self, id: impl Into<String>) -> Self {
        self.space_id = Some(id.into());
        self
    }

    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub const fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    pub const fn poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = Some(timeout);
        self
    }

    pub const fn io_pool_size(mut self, size: usize) -> Self {
        self.io_pool_size = Some(size);
        self
    }

    pub fn retry(mut self, options: RetryOptions) -> Self {
        self.retry = Some(options);
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn build(self) -> Result<ClientConfig, InferenceError> {
        let base_url = self
            .base_url
            .ok_or_else(|| {
                InferenceError::ConfigurationError(format!(
                    "base URL is required (set {ENV_URL} or call base_url())"
                ))
            })?
            .trim_end_matches('/')
            .to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(InferenceError::ConfigurationError(format!(
                "base URL must start with http:// or https://, got {base_url}"
            )));
        }
        if self.project_id.is_some() && self.space_id.is_some() {
            return Err(InferenceError::ConfigurationError(
                "project_id and space_id are mutually exclusive".to_string(),
            ));
        }
        let io_pool_size = self.io_pool_size.unwrap_or(8);
        if io_pool_size == 0 {
            return Err(InferenceError::ConfigurationError(
                "io_pool_size must be at least 1".to_string(),
            ));
        }

        Ok(ClientConfig {
            base_url,
            api_key: self.api_key,
            token_url: self.token_url,
            scope: Scope {
                project_id: self.project_id,
                space_id: self.space_id,
            },
            api_version: self
                .api_version
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            timeout: self.timeout.unwrap_or(Duration::from_secs(60)),
            connect_timeout: self.connect_timeout.unwrap_or(Duration::from_secs(10)),
            poll_interval: self.poll_interval.unwrap_or(Duration::from_secs(2)),
            poll_timeout: self.poll_timeout.unwrap_or(Duration::from_secs(600)),
            io_pool_size,
            retry: self.retry.unwrap_or_default(),
            user_agent: self
                .user_agent
                .unwrap_or_else(|| format!("infera/{}", env!("CARGO_PKG_VERSION"))),
            headers: self.headers,
        })
    }
}
