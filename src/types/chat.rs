//! Chat request/response types

use super::common::{Scope, Usage};
use super::tools::{Tool, ToolCall, ToolChoice, ToolChoiceOption};
use crate::error::InferenceError;
use crate::streaming::ExtractionTags;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Why the model stopped producing tokens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    TimeLimit,
    Cancelled,
    Error,
    Other(String),
}

impl FinishReason {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Stop => "stop",
            Self::Length => "length",
            Self::ToolCalls => "tool_calls",
            Self::TimeLimit => "time_limit",
            Self::Cancelled => "cancelled",
            Self::Error => "error",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for FinishReason {
    fn from(value: String) -> Self {
        match value.as_str() {
            "stop" | "eos_token" | "stop_sequence" => Self::Stop,
            "length" | "max_tokens" => Self::Length,
            "tool_calls" => Self::ToolCalls,
            "time_limit" => Self::TimeLimit,
            "cancelled" => Self::Cancelled,
            "error" => Self::Error,
            _ => Self::Other(value),
        }
    }
}

impl From<FinishReason> for String {
    fn from(value: FinishReason) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for FinishReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A chat message, tagged by role on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum ChatMessage {
    System {
        content: String,
    },
    User {
        content: UserContent,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    Assistant(AssistantMessage),
    Tool {
        content: String,
        tool_call_id: String,
    },
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::System {
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::User {
            content: UserContent::Text(content.into()),
            name: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant(AssistantMessage {
            content: Some(content.into()),
            ..Default::default()
        })
    }

    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::Tool {
            content: content.into(),
            tool_call_id: tool_call_id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Assistant output, both as a response message and as conversation history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssistantMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Thinking text, either native reasoning or extracted from tags
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
}

/// Sampling and decoding parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logprobs: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_logprobs: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_completion_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    /// Server-side generation bound in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_format: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ChatRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    /// Routes the call to a deployment instead of a model
    #[serde(skip)]
    pub deployment_id: Option<String>,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice_option: Option<ToolChoiceOption>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
    #[serde(flatten)]
    pub parameters: ChatParameters,
    #[serde(flatten)]
    pub scope: Scope,
    /// Splits thinking text out of the content stream
    #[serde(skip)]
    pub extraction_tags: Option<ExtractionTags>,
    /// Overrides the client's default request timeout
    #[serde(skip)]
    pub timeout: Option<Duration>,
}

impl ChatRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
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

    pub fn tools(mut self, tools: Vec<Tool>) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn tool_choice_option(mut self, option: ToolChoiceOption) -> Self {
        self.tool_choice_option = Some(option);
        self
    }

    pub fn tool_choice(mut self, choice: ToolChoice) -> Self {
        self.tool_choice = Some(choice);
        self
    }

    pub fn parameters(mut self, parameters: ChatParameters) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn extraction_tags(mut self, tags: ExtractionTags) -> Self {
        self.extraction_tags = Some(tags);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Whether the request forces the model to call a tool.
    pub fn forces_tool_use(&self) -> bool {
        self.tool_choice.is_some()
            || matches!(self.tool_choice_option, Some(ToolChoiceOption::Required))
    }

    pub fn validate(&self) -> Result<(), InferenceError> {
        match (&self.model_id, &self.deployment_id) {
            (None, None) => {
                return Err(InferenceError::InvalidInput(
                    "either model_id or deployment_id must be provided".to_string(),
                ));
            }
            (Some(_), Some(_)) => {
                return Err(InferenceError::InvalidInput(
                    "model_id must not be set when calling a deployment".to_string(),
                ));
            }
            _ => {}
        }
        if self.deployment_id.as_deref().is_some_and(str::is_empty) {
            return Err(InferenceError::InvalidInput(
                "deployment_id must not be empty".to_string(),
            ));
        }
        if self.messages.is_empty() {
            return Err(InferenceError::InvalidInput(
                "messages must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatChoice {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub message: AssistantMessage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
    /// Unix seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl ChatResponse {
    fn first(&self) -> Option<&ChatChoice> {
        self.choices.first()
    }

    /// Visible content of the first choice
    pub fn content(&self) -> Option<&str> {
        self.first().and_then(|c| c.message.content.as_deref())
    }

    pub fn thinking(&self) -> Option<&str> {
        self.first()
            .and_then(|c| c.message.reasoning_content.as_deref())
    }

    pub fn tool_calls(&self) -> &[ToolCall] {
        self.first()
            .and_then(|c| c.message.tool_calls.as_deref())
            .unwrap_or(&[])
    }

    pub fn finish_reason(&self) -> Option<&FinishReason> {
        self.first().and_then(|c| c.finish_reason.as_ref())
    }

    /// The first choice as a message that can be appended to the conversation.
    pub fn to_assistant_message(&self) -> ChatMessage {
        ChatMessage::Assistant(self.first().map(|c| c.message.clone()).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_flattened_parameters_and_scope() {
        let request = ChatRequest::new(vec![ChatMessage::user("hi")])
            .model("m-1")
            .deployment("ignored-on-wire")
            .scope(Scope::project("p-1"))
            .parameters(ChatParameters {
                temperature: Some(0.5),
                ..Default::default()
            });
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model_id"], "m-1");
        assert_eq!(json["project_id"], "p-1");
        assert_eq!(json["temperature"], 0.5);
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "hi");
        assert!(json.get("deployment_id").is_none());
    }

    #[test]
    fn validation_requires_exactly_one_target() {
        let base = ChatRequest::new(vec![ChatMessage::user("hi")]);
        assert!(matches!(
            base.clone().validate(),
            Err(InferenceError::InvalidInput(_))
        ));
        assert!(base.clone().model("m").validate().is_ok());
        assert!(base.clone().deployment("d").validate().is_ok());
        assert!(base.model("m").deployment("d").validate().is_err());
        assert!(ChatRequest::new(vec![]).model("m").validate().is_err());
    }

    #[test]
    fn forced_tool_use_detection() {
        let base = ChatRequest::new(vec![ChatMessage::user("hi")]);
        assert!(!base.forces_tool_use());
        assert!(base
            .clone()
            .tool_choice_option(ToolChoiceOption::Required)
            .forces_tool_use());
        assert!(base.tool_choice(ToolChoice::function("f")).forces_tool_use());
    }

    #[test]
    fn response_accessors_and_assistant_message() {
        let response: ChatResponse = serde_json::from_value(serde_json::json!({
            "id": "chat-1",
            "model_id": "m-1",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": "Hello",
                    "tool_calls": [{"id": "c1", "type": "function", "function": {"name": "f", "arguments": "{}"}}]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 3, "completion_tokens": 2, "total_tokens": 5}
        }))
        .unwrap();

        assert_eq!(response.content(), Some("Hello"));
        assert_eq!(response.finish_reason(), Some(&FinishReason::ToolCalls));
        assert_eq!(response.tool_calls().len(), 1);
        match response.to_assistant_message() {
            ChatMessage::Assistant(msg) => assert_eq!(msg.content.as_deref(), Some("Hello")),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn unknown_finish_reason_round_trips() {
        let reason: FinishReason = serde_json::from_value(serde_json::json!("weird")).unwrap();
        assert_eq!(reason, FinishReason::Other("weird".into()));
        assert_eq!(serde_json::to_value(&reason).unwrap(), "weird");
    }
}
