//! Decoding of streamed payloads into [`PartialDelta`] values.

use super::sse::StreamEvent;
use crate::error::InferenceError;
use crate::http::errors::error_from_envelope;
use crate::types::Usage;
use serde::Deserialize;

/// One piece of a streamed tool call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolCallFragment {
    pub index: usize,
    pub id: Option<String>,
    pub name: Option<String>,
    pub arguments: Option<String>,
}

/// A fragment of model output decoded from one stream event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialDelta {
    pub id: Option<String>,
    pub model_id: Option<String>,
    pub model: Option<String>,
    pub model_version: Option<String>,
    pub created: Option<i64>,
    pub created_at: Option<String>,
    pub role: Option<String>,
    pub content: Option<String>,
    /// Native reasoning text, when the model reports it separately
    pub reasoning_content: Option<String>,
    pub tool_calls: Vec<ToolCallFragment>,
    /// Raw remote value; may be an empty string
    pub finish_reason: Option<String>,
    pub usage: Option<Usage>,
    pub generated_token_count: Option<u32>,
    pub input_token_count: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct ChatChunk {
    id: Option<String>,
    model_id: Option<String>,
    model: Option<String>,
    model_version: Option<String>,
    created: Option<i64>,
    created_at: Option<String>,
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    usage: Option<Usage>,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    role: Option<String>,
    content: Option<String>,
    reasoning_content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ChunkToolCall>,
}

#[derive(Debug, Deserialize)]
struct ChunkToolCall {
    #[serde(default)]
    index: usize,
    id: Option<String>,
    function: Option<ChunkFunction>,
}

#[derive(Debug, Deserialize)]
struct ChunkFunction {
    name: Option<String>,
    arguments: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct GenerationChunk {
    model_id: Option<String>,
    model_version: Option<String>,
    created_at: Option<String>,
    #[serde(default)]
    results: Vec<GenerationChunkResult>,
}

#[derive(Debug, Default, Deserialize)]
struct GenerationChunkResult {
    generated_text: Option<String>,
    generated_token_count: Option<u32>,
    input_token_count: Option<u32>,
    stop_reason: Option<String>,
}

fn parse_payload(event: &StreamEvent) -> Result<serde_json::Value, InferenceError> {
    let value: serde_json::Value = serde_json::from_str(&event.data)
        .map_err(|e| InferenceError::ParseError(format!("malformed stream payload: {e}")))?;
    if let Some(error) = error_from_envelope(&value, 500) {
        return Err(error);
    }
    Ok(value)
}

impl PartialDelta {
    /// Decode a chat chunk; only the first choice is considered.
    pub fn decode_chat(event: &StreamEvent) -> Result<Self, InferenceError> {
        let chunk: ChatChunk = serde_json::from_value(parse_payload(event)?)
            .map_err(|e| InferenceError::ParseError(format!("unexpected chat chunk: {e}")))?;
        let choice = chunk.choices.into_iter().next().unwrap_or_default();
        Ok(Self {
            id: chunk.id,
            model_id: chunk.model_id,
            model: chunk.model,
            model_version: chunk.model_version,
            created: chunk.created,
            created_at: chunk.created_at,
            role: choice.delta.role,
            content: choice.delta.content,
            reasoning_content: choice.delta.reasoning_content,
            tool_calls: choice
                .delta
                .tool_calls
                .into_iter()
                .map(|call| {
                    let (name, arguments) = call
                        .function
                        .map(|f| (f.name, f.arguments))
                        .unwrap_or_default();
                    ToolCallFragment {
                        index: call.index,
                        id: call.id,
                        name,
                        arguments,
                    }
                })
                .collect(),
            finish_reason: choice.finish_reason,
            usage: chunk.usage,
            ..Default::default()
        })
    }

    /// Decode a text generation chunk; only the first result is considered.
    pub fn decode_generation(event: &StreamEvent) -> Result<Self, InferenceError> {
        let chunk: GenerationChunk = serde_json::from_value(parse_payload(event)?).map_err(|e| {
            InferenceError::ParseError(format!("unexpected generation chunk: {e}"))
        })?;
        let result = chunk.results.into_iter().next().unwrap_or_default();
        Ok(Self {
            model_id: chunk.model_id,
            model_version: chunk.model_version,
            created_at: chunk.created_at,
            content: result.generated_text,
            finish_reason: result.stop_reason,
            generated_token_count: result.generated_token_count,
            input_token_count: result.input_token_count,
            ..Default::default()
        })
    }

    pub fn has_content(&self) -> bool {
        self.content.as_deref().is_some_and(|c| !c.is_empty())
    }
}
