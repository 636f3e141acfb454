//! Embedding and rerank types

use super::common::Scope;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingReturnOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_text: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub truncate_input_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_options: Option<EmbeddingReturnOptions>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EmbeddingRequest {
    pub model_id: String,
    pub inputs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<EmbeddingParameters>,
    #[serde(flatten)]
    pub scope: Scope,
}

impl EmbeddingRequest {
    pub fn new(model_id: impl Into<String>, inputs: Vec<String>) -> Self {
        Self {
            model_id: model_id.into(),
            inputs,
            ..Default::default()
        }
    }

    pub fn parameters(mut self, parameters: EmbeddingParameters) -> Self {
        self.parameters = Some(parameters);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub embedding: Vec<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    #[serde(default)]
    pub model_id: String,
    #[serde(default)]
    pub results: Vec<Embedding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_token_count: Option<u32>,
}

impl EmbeddingResponse {
    pub fn vectors(&self) -> Vec<&[f32]> {
        self.results.iter().map(|r| r.embedding.as_slice()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RerankInput {
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RerankReturnOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_n: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RerankParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub truncate_input_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_options: Option<RerankReturnOptions>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RerankRequest {
    pub model_id: String,
    pub query: String,
    pub inputs: Vec<RerankInput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<RerankParameters>,
    #[serde(flatten)]
    pub scope: Scope,
}

impl RerankRequest {
    pub fn new(model_id: impl Into<String>, query: impl Into<String>, inputs: Vec<String>) -> Self {
        Self {
            model_id: model_id.into(),
            query: query.into(),
            inputs: inputs.into_iter().map(|text| RerankInput { text }).collect(),
            ..Default::default()
        }
    }

    pub fn top_n(mut self, top_n: u32) -> Self {
        let parameters = self.parameters.get_or_insert_with(Default::default);
        parameters
            .return_options
            .get_or_insert_with(Default::default)
            .top_n = Some(top_n);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RerankResult {
    pub index: usize,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<RerankInput>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RerankResponse {
    #[serde(default)]
    pub model_id: String,
    #[serde(default)]
    pub results: Vec<RerankResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_token_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}
