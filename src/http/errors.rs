//! Remote error classification.
//!
//! The service reports failures as
//! `{"errors": [{"code", "message"}], "trace", "status_code"}`. The payload is
//! kept verbatim in the `details` of [`InferenceError::ApiError`].

use crate::error::InferenceError;
use serde::Deserialize;

/// Error code signalling that the bearer token must be refreshed
pub const TOKEN_EXPIRED_CODE: &str = "authentication_token_expired";

#[derive(Debug, Deserialize)]
struct ErrorEntry {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    errors: Vec<ErrorEntry>,
    #[serde(default)]
    trace: Option<String>,
    #[serde(default)]
    status_code: Option<u16>,
}

impl ErrorEnvelope {
    fn summary(&self) -> String {
        let parts: Vec<String> = self
            .errors
            .iter()
            .map(|e| match (&e.code, &e.message) {
                (Some(code), Some(message)) => format!("{code}: {message}"),
                (Some(code), None) => code.clone(),
                (None, Some(message)) => message.clone(),
                (None, None) => "unknown error".to_string(),
            })
            .collect();
        let mut summary = parts.join("; ");
        if let Some(trace) = &self.trace {
            summary.push_str(&format!(" (trace: {trace})"));
        }
        summary
    }

    fn token_expired(&self) -> bool {
        self.errors
            .iter()
            .any(|e| e.code.as_deref() == Some(TOKEN_EXPIRED_CODE))
    }
}

/// Error carried by a remote error envelope, if `payload` is one.
pub fn error_from_envelope(
    payload: &serde_json::Value,
    fallback_status: u16,
) -> Option<InferenceError> {
    payload.get("errors")?.as_array().filter(|e| !e.is_empty())?;
    let envelope: ErrorEnvelope = serde_json::from_value(payload.clone()).ok()?;
    let status = envelope.status_code.unwrap_or(fallback_status);
    let message = envelope.summary();

    if envelope.token_expired() || status == 401 {
        return Some(InferenceError::TokenExpired(message));
    }
    Some(InferenceError::api_error_with_details(
        status,
        message,
        payload.clone(),
    ))
}

/// Classify a non-success HTTP response.
pub fn classify_http_error(status: u16, body_text: &str) -> InferenceError {
    let json = serde_json::from_str::<serde_json::Value>(body_text).ok();
    if let Some(error) = json.as_ref().and_then(|v| error_from_envelope(v, status)) {
        return error;
    }

    let message = if body_text.trim().is_empty() {
        format!("HTTP {status}")
    } else {
        json.as_ref()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()))
            .map(str::to_string)
            .unwrap_or_else(|| body_text.to_string())
    };

    match status {
        401 => InferenceError::TokenExpired(message),
        403 => InferenceError::AuthenticationError(message),
        404 => InferenceError::NotFound(message),
        429 => InferenceError::RateLimitError(message),
        _ => InferenceError::ApiError {
            code: status,
            message,
            details: json,
        },
    }
}
