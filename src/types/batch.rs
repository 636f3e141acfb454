//! Batch job types
//!
//! A batch job processes a JSONL input file asynchronously. Jobs are created
//! against an uploaded file, polled until terminal, and their output file is
//! downloaded and decoded line by line into [`BatchResult`] values.

use super::common::Scope;
use crate::error::InferenceError;
use crate::lro::OperationStatus;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

pub const DEFAULT_COMPLETION_WINDOW: &str = "24h";

#[derive(Debug, Clone, Serialize)]
pub struct BatchCreateRequest {
    pub input_file_id: String,
    /// Endpoint every line of the input file targets, e.g. `/v1/chat/completions`
    pub endpoint: String,
    pub completion_window: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, String>>,
    #[serde(flatten)]
    pub scope: Scope,
    /// Overrides the client's poll timeout in `submit_and_fetch`
    #[serde(skip)]
    pub timeout: Option<Duration>,
}

impl BatchCreateRequest {
    pub fn new(input_file_id: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            input_file_id: input_file_id.into(),
            endpoint: endpoint.into(),
            completion_window: DEFAULT_COMPLETION_WINDOW.to_string(),
            metadata: None,
            scope: Scope::default(),
            timeout: None,
        }
    }

    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn validate(&self) -> Result<(), InferenceError> {
        if self.input_file_id.is_empty() {
            return Err(InferenceError::InvalidInput(
                "input_file_id must not be empty".to_string(),
            ));
        }
        if self.endpoint.is_empty() {
            return Err(InferenceError::InvalidInput(
                "endpoint must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRequestCounts {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub completed: u64,
    #[serde(default)]
    pub failed: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchJob {
    pub id: String,
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub input_file_id: String,
    #[serde(default)]
    pub completion_window: String,
    /// Raw remote status; see [`BatchJob::status`]
    #[serde(rename = "status", default)]
    pub raw_status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_file_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_file_id: Option<String>,
    /// Remote error payload, kept verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_counts: Option<BatchRequestCounts>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, String>>,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_progress_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

impl BatchJob {
    pub fn status(&self) -> OperationStatus {
        OperationStatus::from_wire(&self.raw_status)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchList {
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub data: Vec<BatchJob>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_id: Option<String>,
    #[serde(default)]
    pub has_more: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchResponseBody {
    #[serde(default)]
    pub status_code: u16,
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub body: serde_json::Value,
}

/// One line of a batch output file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub custom_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<BatchResponseBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<serde_json::Value>,
}

impl BatchResult {
    /// Decode a JSONL output file, skipping blank lines.
    pub fn parse_jsonl(content: &[u8]) -> Result<Vec<BatchResult>, InferenceError> {
        let text = std::str::from_utf8(content)
            .map_err(|e| InferenceError::ParseError(format!("batch output is not UTF-8: {e}")))?;
        text.lines()
            .filter(|line| !line.trim().is_empty())
            .enumerate()
            .map(|(n, line)| {
                serde_json::from_str(line).map_err(|e| {
                    InferenceError::ParseError(format!("batch output line {}: {e}", n + 1))
                })
            })
            .collect()
    }
}
