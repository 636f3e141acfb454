//! Streaming text generation assembly.

use super::assembler::{AssemblerState, StreamAssembler};
use super::delta::PartialDelta;
use super::handler::TextGenerationHandler;
use super::sse::StreamEvent;
use crate::error::InferenceError;
use crate::types::{TextGenerationResponse, TextGenerationResult};

pub struct TextGenerationAssembler<H> {
    handler: H,
    state: AssemblerState,
    model_id: Option<String>,
    model_version: Option<String>,
    created_at: Option<String>,
    text: String,
    generated_token_count: Option<u32>,
    input_token_count: Option<u32>,
    stop_reason: Option<String>,
}

impl<H: TextGenerationHandler> TextGenerationAssembler<H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            state: AssemblerState::Init,
            model_id: None,
            model_version: None,
            created_at: None,
            text: String::new(),
            generated_token_count: None,
            input_token_count: None,
            stop_reason: None,
        }
    }

    pub fn into_handler(self) -> H {
        self.handler
    }

    pub fn apply(&mut self, delta: PartialDelta) {
        if self.state.is_terminal() {
            return;
        }
        self.state = AssemblerState::Streaming;

        if delta.model_id.is_some() {
            self.model_id.clone_from(&delta.model_id);
        }
        if delta.model_version.is_some() {
            self.model_version.clone_from(&delta.model_version);
        }
        if delta.created_at.is_some() {
            self.created_at.clone_from(&delta.created_at);
        }
        // Token counts are running totals
        if delta.generated_token_count.is_some() {
            self.generated_token_count = delta.generated_token_count;
        }
        if delta.input_token_count.is_some() {
            self.input_token_count = delta.input_token_count;
        }
        if let Some(reason) = delta.finish_reason.as_deref().filter(|r| !r.is_empty()) {
            self.stop_reason = Some(reason.to_string());
        }

        if let Some(text) = delta.content.as_deref().filter(|t| !t.is_empty()) {
            self.text.push_str(text);
            self.handler.on_partial_response(text, &delta);
        }
    }
}

impl<H: TextGenerationHandler> StreamAssembler for TextGenerationAssembler<H> {
    type Output = TextGenerationResponse;

    fn handle_event(&mut self, event: &StreamEvent) -> Result<(), InferenceError> {
        if self.state.is_terminal() {
            return Ok(());
        }
        self.apply(PartialDelta::decode_generation(event)?);
        Ok(())
    }

    fn complete(&mut self) -> Result<TextGenerationResponse, InferenceError> {
        if self.state.is_terminal() {
            return Err(InferenceError::InternalError(
                "stream already finished".to_string(),
            ));
        }
        let response = TextGenerationResponse {
            model_id: self.model_id.clone(),
            model_version: self.model_version.clone(),
            created_at: self.created_at.clone(),
            results: vec![TextGenerationResult {
                generated_text: self.text.clone(),
                generated_token_count: self.generated_token_count,
                input_token_count: self.input_token_count,
                stop_reason: self.stop_reason.clone(),
            }],
        };
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
