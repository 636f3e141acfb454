//! Error Handling Module
//!
//! A single error type, [`InferenceError`], is shared by every service in the
//! crate. Variants are grouped so callers can tell a remote domain failure from
//! a local transport failure from a timeout:
//!
//! ```rust,ignore
//! use infera::error::{ErrorCategory, InferenceError};
//!
//! let error = InferenceError::api_error(404, "Not found");
//! assert_eq!(error.category(), ErrorCategory::Remote);
//! assert!(!error.is_retryable());
//! ```

use std::time::Duration;
use thiserror::Error;

/// Coarse error classification used for logging and retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Connection refused, I/O interruption, broken body stream.
    Network,
    /// Structured error returned by the remote service.
    Remote,
    /// Credentials rejected or expired.
    Authentication,
    /// Malformed payloads, SSE framing or JSON decoding failures.
    Protocol,
    /// A configured time bound was exceeded.
    Timeout,
    /// Caller misuse detected before any network activity.
    Validation,
    /// Object storage collaborator failures.
    Storage,
    /// Cancellation and internal invariants.
    Internal,
}

#[derive(Debug, Clone, Error)]
pub enum InferenceError {
    /// Transport-level HTTP failure (request could not be sent or body not read)
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Connection could not be established
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Structured error returned by the remote service
    #[error("API error {code}: {message}")]
    ApiError {
        code: u16,
        message: String,
        /// Remote error payload, verbatim when it was JSON
        details: Option<serde_json::Value>,
    },

    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The bearer token was rejected because it expired; safe to retry after refresh
    #[error("Authentication token expired: {0}")]
    TokenExpired(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimitError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("JSON error: {0}")]
    JsonError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Stream error: {0}")]
    StreamError(String),

    /// A polling or waiting bound was exceeded
    #[error("Timed out after {timeout:?} waiting for {resource}")]
    Timeout { resource: String, timeout: Duration },

    /// A long-running operation reached a failed or cancelled terminal state
    #[error("Operation on {resource} ended with status {status}")]
    OperationFailed {
        resource: String,
        status: String,
        details: Option<serde_json::Value>,
    },

    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl InferenceError {
    /// Remote error without a payload.
    pub fn api_error(code: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Remote error carrying the original payload.
    pub fn api_error_with_details(
        code: u16,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self::ApiError {
            code,
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn timeout(resource: impl Into<String>, timeout: Duration) -> Self {
        Self::Timeout {
            resource: resource.into(),
            timeout,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::HttpError(_) | Self::ConnectionError(_) => ErrorCategory::Network,
            Self::ApiError { .. }
            | Self::RateLimitError(_)
            | Self::NotFound(_)
            | Self::OperationFailed { .. } => ErrorCategory::Remote,
            Self::AuthenticationError(_) | Self::TokenExpired(_) => ErrorCategory::Authentication,
            Self::JsonError(_) | Self::ParseError(_) | Self::StreamError(_) => {
                ErrorCategory::Protocol
            }
            Self::Timeout { .. } => ErrorCategory::Timeout,
            Self::InvalidInput(_) | Self::ConfigurationError(_) => ErrorCategory::Validation,
            Self::StorageError(_) => ErrorCategory::Storage,
            Self::Cancelled(_) | Self::InternalError(_) => ErrorCategory::Internal,
        }
    }

    /// HTTP status associated with the error, when there is one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::ApiError { code, .. } => Some(*code),
            Self::AuthenticationError(_) | Self::TokenExpired(_) => Some(401),
            Self::RateLimitError(_) => Some(429),
            Self::NotFound(_) => Some(404),
            _ => None,
        }
    }

    /// Remote payload carried by the error, if any.
    pub fn details(&self) -> Option<&serde_json::Value> {
        match self {
            Self::ApiError { details, .. } | Self::OperationFailed { details, .. } => {
                details.as_ref()
            }
            _ => None,
        }
    }

    /// Only token expiry is transient. Timeouts and every other failure are terminal.
    pub fn is_retryable(&self) -> bool {
        self.is_token_expired()
    }

    pub fn is_token_expired(&self) -> bool {
        matches!(self, Self::TokenExpired(_))
    }
}

impl From<reqwest::Error> for InferenceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            Self::ConnectionError(err.to_string())
        } else {
            Self::HttpError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for InferenceError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonError(err.to_string())
    }
}
