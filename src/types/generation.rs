//! Text generation (prompt completion) types

use super::common::Scope;
use crate::error::InferenceError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextGenerationParameters {
    /// "greedy" or "sample"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decoding_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_new_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_new_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub random_seed: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repetition_penalty: Option<f32>,
    /// Server-side generation bound in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_stop_sequence: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TextGenerationRequest {
    pub input: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    #[serde(skip)]
    pub deployment_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<TextGenerationParameters>,
    #[serde(flatten)]
    pub scope: Scope,
    #[serde(skip)]
    pub timeout: Option<Duration>,
}

impl TextGenerationRequest {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            ..Default::default()
        }
    }

    pub fn model(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = Some(model_id.into());
        self
    }

    pub fn deployment(mut self, deployment_id: impl Into<String>) -> Self {
        self.deployment_id = Some(deployment_id.into());
        self
    }

    pub fn parameters(mut self, parameters: TextGenerationParameters) -> Self {
        self.parameters = Some(parameters);
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
        match (&self.model_id, &self.deployment_id) {
            (None, None) => Err(InferenceError::InvalidInput(
                "either model_id or deployment_id must be provided".to_string(),
            )),
            (Some(_), Some(_)) => Err(InferenceError::InvalidInput(
                "model_id must not be set when calling a deployment".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextGenerationResult {
    #[serde(default)]
    pub generated_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_token_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_token_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextGenerationResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default)]
    pub results: Vec<TextGenerationResult>,
}

impl TextGenerationResponse {
    pub fn text(&self) -> Option<&str> {
        self.results.first().map(|r| r.generated_text.as_str())
    }

    pub fn stop_reason(&self) -> Option<&str> {
        self.results.first().and_then(|r| r.stop_reason.as_deref())
    }
}
