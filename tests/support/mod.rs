//! Shared helpers for integration tests.
#![allow(dead_code)]

use infera::prelude::*;
use infera::types::ToolCall;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn client(base_url: &str) -> InferenceClient {
    client_with(base_url, |builder| builder)
}

pub fn client_with(
    base_url: &str,
    configure: impl FnOnce(infera::config::ClientConfigBuilder) -> infera::config::ClientConfigBuilder,
) -> InferenceClient {
    let builder = ClientConfig::builder()
        .base_url(base_url)
        .api_key("test-key")
        .project_id("proj-1")
        .poll_interval(Duration::from_millis(10))
        .poll_timeout(Duration::from_secs(5));
    InferenceClient::new(configure(builder).build().unwrap()).unwrap()
}

/// SSE body with one `data:` block per payload.
pub fn sse(payloads: &[Value]) -> String {
    payloads
        .iter()
        .map(|p| format!("id: 1\nevent: message\ndata: {p}\n\n"))
        .collect()
}

pub fn content_chunk(text: &str) -> Value {
    serde_json::json!({
        "id": "chat-1",
        "model_id": "granite",
        "choices": [{"index": 0, "delta": {"content": text}, "finish_reason": null}]
    })
}

pub fn finish_chunk(reason: &str) -> Value {
    serde_json::json!({
        "id": "chat-1",
        "choices": [{"index": 0, "delta": {}, "finish_reason": reason}],
        "usage": {"prompt_tokens": 5, "completion_tokens": 2, "total_tokens": 7}
    })
}

/// Records every callback as a readable line.
#[derive(Clone, Default)]
pub struct Recorder(Arc<Mutex<Vec<String>>>);

impl Recorder {
    pub fn calls(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    fn push(&self, line: String) {
        self.0.lock().unwrap().push(line);
    }
}

impl ChatHandler for Recorder {
    fn on_partial_response(&mut self, text: &str, _delta: &PartialDelta) {
        self.push(format!("response:{text}"));
    }

    fn on_partial_thinking(&mut self, text: &str, _delta: &PartialDelta) {
        self.push(format!("thinking:{text}"));
    }

    fn on_partial_tool_call(&mut self, call: PartialToolCall) {
        self.push(format!("partial_tool:{}:{}", call.index, call.arguments));
    }

    fn on_complete_tool_call(&mut self, call: ToolCall) {
        self.push(format!(
            "tool:{}:{}:{}",
            call.id, call.function.name, call.function.arguments
        ));
    }

    fn on_complete_response(&mut self, response: &ChatResponse) {
        self.push(format!(
            "complete:{}",
            response.content().unwrap_or_default()
        ));
    }

    fn on_error(&mut self, error: &InferenceError) {
        self.push(format!("error:{error}"));
    }
}

impl TextGenerationHandler for Recorder {
    fn on_partial_response(&mut self, text: &str, _delta: &PartialDelta) {
        self.push(format!("response:{text}"));
    }

    fn on_complete_response(&mut self, response: &TextGenerationResponse) {
        self.push(format!("complete:{}", response.text().unwrap_or_default()));
    }

    fn on_error(&mut self, error: &InferenceError) {
        self.push(format!("error:{error}"));
    }
}
