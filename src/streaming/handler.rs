//! Callback traits for streaming calls.
//!
//! Every method has a no-op default, so a handler only implements what it
//! needs. Callbacks of one call run sequentially, in event order, on a worker
//! of the client's I/O pool; they never overlap and never run on the task
//! reading the network.

use super::delta::PartialDelta;
use crate::error::InferenceError;
use crate::types::{ChatResponse, TextGenerationResponse, ToolCall};

/// Callback view of one tool-call fragment.
///
/// `id` and `name` are the values established so far for this index;
/// `arguments` is only the chunk carried by this fragment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialToolCall {
    pub index: usize,
    pub id: Option<String>,
    pub name: Option<String>,
    pub arguments: String,
}

pub trait ChatHandler: Send + 'static {
    fn on_partial_response(&mut self, _text: &str, _delta: &PartialDelta) {}

    fn on_partial_thinking(&mut self, _text: &str, _delta: &PartialDelta) {}

    fn on_partial_tool_call(&mut self, _call: PartialToolCall) {}

    fn on_complete_tool_call(&mut self, _call: ToolCall) {}

    fn on_complete_response(&mut self, _response: &ChatResponse) {}

    fn on_error(&mut self, _error: &InferenceError) {}
}

pub trait TextGenerationHandler: Send + 'static {
    fn on_partial_response(&mut self, _text: &str, _delta: &PartialDelta) {}

    fn on_complete_response(&mut self, _response: &TextGenerationResponse) {}

    fn on_error(&mut self, _error: &InferenceError) {}
}

/// Handler that ignores every callback; the call's future still resolves.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHandler;

impl ChatHandler for NoopHandler {}

impl TextGenerationHandler for NoopHandler {}
