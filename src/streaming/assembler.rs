//! Streaming response assembly.
//!
//! [`ChatStreamAssembler`] owns all mutable state of one streaming chat call:
//! the aggregated response, the tool-call merger and the optional thinking
//! splitter. It is driven one event at a time and fires the handler's
//! callbacks as it goes. After `complete` or `fail` it fires nothing else.

use super::delta::PartialDelta;
use super::handler::{ChatHandler, PartialToolCall};
use super::sse::StreamEvent;
use super::tags::{ExtractionTags, ThinkingSplitter};
use super::tool_calls::ToolCallMerger;
use crate::error::InferenceError;
use crate::types::{
    AssistantMessage, ChatChoice, ChatMessage, ChatResponse, FinishReason, ToolCall, Usage,
};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblerState {
    Init,
    Streaming,
    Complete,
    Errored,
}

impl AssemblerState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Errored)
    }
}

/// Driven by the per-call consumer job.
pub trait StreamAssembler: Send + 'static {
    type Output: Send + 'static;

    /// Apply one event. An error leaves the assembler ready for [`Self::fail`].
    fn handle_event(&mut self, event: &StreamEvent) -> Result<(), InferenceError>;

    /// End of stream: flush buffers, fire the completion callbacks.
    fn complete(&mut self) -> Result<Self::Output, InferenceError>;

    /// Fire the error callback once and hand the error back.
    fn fail(&mut self, error: InferenceError) -> InferenceError;

    fn state(&self) -> AssemblerState;
}

/// Everything accumulated during one streaming chat call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregatedResponse {
    pub id: Option<String>,
    pub model_id: Option<String>,
    pub model: Option<String>,
    pub model_version: Option<String>,
    pub created: Option<i64>,
    pub created_at: Option<String>,
    pub content: String,
    pub thinking: String,
    pub tool_calls: Vec<ToolCall>,
    pub finish_reason: Option<FinishReason>,
    pub usage: Option<Usage>,
}

impl AggregatedResponse {
    fn absorb_metadata(&mut self, delta: &PartialDelta) {
        fn copy<T: Clone>(target: &mut Option<T>, source: &Option<T>) {
            if source.is_some() {
                target.clone_from(source);
            }
        }
        copy(&mut self.id, &delta.id);
        copy(&mut self.model_id, &delta.model_id);
        copy(&mut self.model, &delta.model);
        copy(&mut self.model_version, &delta.model_version);
        copy(&mut self.created, &delta.created);
        copy(&mut self.created_at, &delta.created_at);
        copy(&mut self.usage, &delta.usage);
    }

    fn message(&self) -> AssistantMessage {
        AssistantMessage {
            content: (!self.content.is_empty()).then(|| self.content.clone()),
            reasoning_content: (!self.thinking.is_empty()).then(|| self.thinking.clone()),
            name: None,
            tool_calls: (!self.tool_calls.is_empty()).then(|| self.tool_calls.clone()),
        }
    }

    pub fn to_chat_response(&self) -> ChatResponse {
        ChatResponse {
            id: self.id.clone(),
            model_id: self.model_id.clone(),
            model: self.model.clone(),
            model_version: self.model_version.clone(),
            created: self.created,
            created_at: self.created_at.clone(),
            choices: vec![ChatChoice {
                index: 0,
                message: self.message(),
                finish_reason: self.finish_reason.clone(),
            }],
            usage: self.usage.clone(),
        }
    }

    pub fn to_assistant_message(&self) -> ChatMessage {
        ChatMessage::Assistant(self.message())
    }
}

pub struct ChatStreamAssembler<H> {
    handler: H,
    state: AssemblerState,
    response: AggregatedResponse,
    merger: ToolCallMerger,
    splitter: Option<ThinkingSplitter>,
    completed: BTreeSet<usize>,
    raw_finish_reason: Option<String>,
    forces_tool_use: bool,
}

impl<H: ChatHandler> ChatStreamAssembler<H> {
    /// `forces_tool_use` enables the synthesized `tool_calls` finish reason
    /// for forced tool choice, where the service omits it.
    pub fn new(handler: H, tags: Option<ExtractionTags>, forces_tool_use: bool) -> Self {
        Self {
            handler,
            state: AssemblerState::Init,
            response: AggregatedResponse::default(),
            merger: ToolCallMerger::new(),
            splitter: tags.map(ThinkingSplitter::new),
            completed: BTreeSet::new(),
            raw_finish_reason: None,
            forces_tool_use,
        }
    }

    pub fn response(&self) -> &AggregatedResponse {
        &self.response
    }

    pub fn into_handler(self) -> H {
        self.handler
    }

    /// Apply an already decoded delta.
    pub fn apply(&mut self, delta: PartialDelta) {
        if self.state.is_terminal() {
            return;
        }
        self.state = AssemblerState::Streaming;
        self.response.absorb_metadata(&delta);

        if let Some(reasoning) = delta.reasoning_content.as_deref().filter(|r| !r.is_empty()) {
            self.response.thinking.push_str(reasoning);
            self.handler.on_partial_thinking(reasoning, &delta);
        }

        if let Some(content) = delta.content.as_deref().filter(|c| !c.is_empty()) {
            match self.splitter.as_mut() {
                Some(splitter) => {
                    let split = splitter.feed(content);
                    self.emit_text(&split.thinking, &split.visible, &delta);
                }
                None => self.emit_text("", content, &delta),
            }
        }

        for fragment in &delta.tool_calls {
            self.merger.update(
                fragment.index,
                fragment.id.as_deref(),
                fragment.name.as_deref(),
                fragment.arguments.as_deref(),
            );
            self.handler.on_partial_tool_call(PartialToolCall {
                index: fragment.index,
                id: self.merger.id(fragment.index).map(str::to_string),
                name: self.merger.name(fragment.index).map(str::to_string),
                arguments: fragment.arguments.clone().unwrap_or_default(),
            });
        }

        if let Some(reason) = &delta.finish_reason {
            self.raw_finish_reason = Some(reason.clone());
            if reason == FinishReason::ToolCalls.as_str() {
                self.complete_outstanding_tool_calls();
            }
        }
    }

    fn emit_text(&mut self, thinking: &str, visible: &str, delta: &PartialDelta) {
        if !thinking.is_empty() {
            self.response.thinking.push_str(thinking);
            self.handler.on_partial_thinking(thinking, delta);
        }
        if !visible.is_empty() {
            self.response.content.push_str(visible);
            self.handler.on_partial_response(visible, delta);
        }
    }

    fn complete_outstanding_tool_calls(&mut self) {
        let pending: Vec<usize> = self
            .merger
            .indices()
            .filter(|index| !self.completed.contains(index))
            .collect();
        for index in pending {
            if let Some(call) = self.merger.materialize(index) {
                self.completed.insert(index);
                self.handler.on_complete_tool_call(call);
            }
        }
    }

    fn metadata_delta(&self) -> PartialDelta {
        PartialDelta {
            id: self.response.id.clone(),
            model_id: self.response.model_id.clone(),
            model: self.response.model.clone(),
            model_version: self.response.model_version.clone(),
            created: self.response.created,
            created_at: self.response.created_at.clone(),
            ..Default::default()
        }
    }
}

impl<H: ChatHandler> StreamAssembler for ChatStreamAssembler<H> {
    type Output = ChatResponse;

    fn handle_event(&mut self, event: &StreamEvent) -> Result<(), InferenceError> {
        if self.state.is_terminal() {
            return Ok(());
        }
        let delta = PartialDelta::decode_chat(event)?;
        self.apply(delta);
        Ok(())
    }

    fn complete(&mut self) -> Result<ChatResponse, InferenceError> {
        if self.state.is_terminal() {
            return Err(InferenceError::InternalError(
                "stream already finished".to_string(),
            ));
        }

        if let Some(tail) = self.splitter.as_mut().map(ThinkingSplitter::finish) {
            let mut delta = self.metadata_delta();
            delta.content = Some(format!("{}{}", tail.thinking, tail.visible));
            self.emit_text(&tail.thinking, &tail.visible, &delta);
        }

        let finish_missing = self
            .raw_finish_reason
            .as_deref()
            .is_none_or(str::is_empty);
        if self.forces_tool_use && finish_missing && !self.merger.is_empty() {
            tracing::debug!("forced tool choice ended without finish reason, assuming tool_calls");
            self.raw_finish_reason = Some(FinishReason::ToolCalls.as_str().to_string());
        }

        self.complete_outstanding_tool_calls();
        self.response.tool_calls = self.merger.materialize_all();
        self.response.finish_reason = self
            .raw_finish_reason
            .clone()
            .filter(|r| !r.is_empty())
            .map(FinishReason::from);

        let response = self.response.to_chat_response();
        self.state = AssemblerState::Complete;
        self.handler.on_complete_response(&response);
        Ok(response)
    }

    fn fail(&mut self, error: InferenceError) -> InferenceError {
        if !self.state.is_terminal() {
            self.state = AssemblerState::Errored;
            self.handler.on_error(&error);
        }
        error
    }

    fn state(&self) -> AssemblerState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streaming::delta::ToolCallFragment;

    #[derive(Debug, Default)]
    struct Recorder {
        calls: Vec<String>,
        completed: Vec<ToolCall>,
        final_response: Option<ChatResponse>,
    }

    impl ChatHandler for Recorder {
        fn on_partial_response(&mut self, text: &str, _delta: &PartialDelta) {
            self.calls.push(format!("response:{text}"));
        }
        fn on_partial_thinking(&mut self, text: &str, _delta: &PartialDelta) {
            self.calls.push(format!("thinking:{text}"));
        }
        fn on_partial_tool_call(&mut self, call: PartialToolCall) {
            self.calls.push(format!("partial_tool:{}:{}", call.index, call.arguments));
        }
        fn on_complete_tool_call(&mut self, call: ToolCall) {
            self.calls.push(format!("tool:{}", call.function.name));
            self.completed.push(call);
        }
        fn on_complete_response(&mut self, response: &ChatResponse) {
            self.calls.push("complete".to_string());
            self.final_response = Some(response.clone());
        }
        fn on_error(&mut self, error: &InferenceError) {
            self.calls.push(format!("error:{error}"));
        }
    }

    fn content(text: &str) -> PartialDelta {
        PartialDelta {
            content: Some(text.to_string()),
            ..Default::default()
        }
    }

    fn finish(reason: &str) -> PartialDelta {
        PartialDelta {
            finish_reason: Some(reason.to_string()),
            ..Default::default()
        }
    }

    fn fragment(index: usize, name: Option<&str>, arguments: &str) -> PartialDelta {
        PartialDelta {
            tool_calls: vec![ToolCallFragment {
                index,
                id: name.map(|n| format!("call_{n}")),
                name: name.map(str::to_string),
                arguments: Some(arguments.to_string()),
            }],
            ..Default::default()
        }
    }

    #[test]
    fn content_deltas_concatenate() {
        let mut assembler = ChatStreamAssembler::new(Recorder::default(), None, false);
        assert_eq!(assembler.state(), AssemblerState::Init);
        assembler.apply(content("He"));
        assembler.apply(content("llo"));
        assembler.apply(finish("stop"));
        assert_eq!(assembler.state(), AssemblerState::Streaming);

        let response = assembler.complete().unwrap();
        assert_eq!(response.content(), Some("Hello"));
        assert!(response.tool_calls().is_empty());
        assert_eq!(response.finish_reason(), Some(&FinishReason::Stop));

        let recorder = assembler.into_handler();
        assert_eq!(
            recorder.calls,
            vec!["response:He", "response:llo", "complete"]
        );
    }

    #[test]
    fn tool_calls_complete_on_finish_reason() {
        let mut assembler = ChatStreamAssembler::new(Recorder::default(), None, false);
        assembler.apply(fragment(0, Some("f"), ""));
        assembler.apply(fragment(0, None, "{\"a\":1}"));
        assembler.apply(finish("tool_calls"));
        let response = assembler.complete().unwrap();

        let recorder = assembler.into_handler();
        assert_eq!(recorder.completed.len(), 1);
        assert_eq!(recorder.completed[0].function.name, "f");
        assert_eq!(recorder.completed[0].function.arguments, "{\"a\":1}");
        assert_eq!(
            recorder.calls,
            vec!["partial_tool:0:", "partial_tool:0:{\"a\":1}", "tool:f", "complete"]
        );
        assert_eq!(response.tool_calls(), recorder.completed.as_slice());
        assert_eq!(response.finish_reason(), Some(&FinishReason::ToolCalls));
    }

    #[test]
    fn outstanding_tool_calls_complete_at_stream_end_once() {
        let mut assembler = ChatStreamAssembler::new(Recorder::default(), None, false);
        assembler.apply(fragment(0, Some("f"), "{}"));
        assembler.apply(finish("tool_calls"));
        assembler.apply(fragment(1, Some("g"), "[]"));
        assembler.complete().unwrap();
        let recorder = assembler.into_handler();
        let names: Vec<_> = recorder
            .completed
            .iter()
            .map(|c| c.function.name.as_str())
            .collect();
        assert_eq!(names, vec!["f", "g"]);
    }

    #[test]
    fn forced_tool_choice_synthesizes_finish_reason() {
        let mut assembler = ChatStreamAssembler::new(Recorder::default(), None, true);
        assembler.apply(fragment(0, Some("f"), "{}"));
        assembler.apply(finish(""));
        let response = assembler.complete().unwrap();
        assert_eq!(response.finish_reason(), Some(&FinishReason::ToolCalls));
    }

    #[test]
    fn missing_finish_reason_is_left_alone_without_forced_choice() {
        let mut assembler = ChatStreamAssembler::new(Recorder::default(), None, false);
        assembler.apply(fragment(0, Some("f"), "{}"));
        let response = assembler.complete().unwrap();
        assert_eq!(response.finish_reason(), None);
        assert_eq!(response.tool_calls().len(), 1);
    }

    #[test]
    fn thinking_tags_split_content() {
        let tags = ExtractionTags::new("think", "response");
        let mut assembler = ChatStreamAssembler::new(Recorder::default(), Some(tags), false);
        for chunk in ["<thi", "nk>hello</res", "ponse>world"] {
            assembler.apply(content(chunk));
        }
        let response = assembler.complete().unwrap();
        assert_eq!(response.thinking(), Some("hello"));
        assert_eq!(response.content(), Some("world"));
        assert_eq!(
            assembler.into_handler().calls,
            vec!["thinking:hello", "response:world", "complete"]
        );
    }

    #[test]
    fn native_reasoning_is_forwarded_as_thinking() {
        let mut assembler = ChatStreamAssembler::new(Recorder::default(), None, false);
        assembler.apply(PartialDelta {
            reasoning_content: Some("hmm".into()),
            content: Some("ok".into()),
            ..Default::default()
        });
        let response = assembler.complete().unwrap();
        assert_eq!(response.thinking(), Some("hmm"));
        assert_eq!(
            assembler.into_handler().calls,
            vec!["thinking:hmm", "response:ok", "complete"]
        );
    }

    #[test]
    fn nothing_fires_after_error() {
        let mut assembler = ChatStreamAssembler::new(Recorder::default(), None, false);
        assembler.apply(content("a"));
        let err = assembler.fail(InferenceError::StreamError("boom".into()));
        assert!(matches!(err, InferenceError::StreamError(_)));
        assembler.apply(content("b"));
        assert!(assembler.complete().is_err());
        let _ = assembler.fail(InferenceError::StreamError("again".into()));
        assert_eq!(assembler.state(), AssemblerState::Errored);
        assert_eq!(
            assembler.into_handler().calls,
            vec!["response:a", "error:Stream error: boom"]
        );
    }

    #[test]
    fn metadata_comes_from_last_delta_carrying_it() {
        let mut assembler = ChatStreamAssembler::new(Recorder::default(), None, false);
        assembler.apply(PartialDelta {
            id: Some("c1".into()),
            model_id: Some("m".into()),
            ..content("x")
        });
        assembler.apply(PartialDelta {
            usage: Some(Usage {
                prompt_tokens: Some(1),
                completion_tokens: Some(1),
                total_tokens: Some(2),
            }),
            ..Default::default()
        });
        let response = assembler.complete().unwrap();
        assert_eq!(response.id.as_deref(), Some("c1"));
        assert_eq!(response.usage.and_then(|u| u.total_tokens), Some(2));
    }
}
