//! Chat completions, plain and streamed.

use super::{ServiceContext, segment};
use crate::error::InferenceError;
use crate::streaming::{
    ChatHandler, ChatStreamAssembler, ExtractionTags, StreamingCall, spawn_streaming_call,
    split_complete,
};
use crate::types::{ChatRequest, ChatResponse};
use std::sync::Arc;

const CHAT_PATH: &str = "/ml/v1/text/chat";
const CHAT_STREAM_PATH: &str = "/ml/v1/text/chat_stream";

#[derive(Debug, Clone)]
pub struct ChatService {
    ctx: Arc<ServiceContext>,
}

impl ChatService {
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    fn path(request: &ChatRequest, stream: bool) -> String {
        match &request.deployment_id {
            Some(id) => format!(
                "/ml/v1/deployments/{}/text/{}",
                segment(id),
                if stream { "chat_stream" } else { "chat" }
            ),
            None if stream => CHAT_STREAM_PATH.to_string(),
            None => CHAT_PATH.to_string(),
        }
    }

    fn prepare(&self, request: &ChatRequest) -> Result<ChatRequest, InferenceError> {
        request.validate()?;
        let mut prepared = request.clone();
        prepared.scope = self.ctx.scope(&request.scope);
        Ok(prepared)
    }

    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, InferenceError> {
        let prepared = self.prepare(request)?;
        let path = Self::path(&prepared, false);
        let mut response: ChatResponse = self
            .ctx
            .transport
            .post_json(&path, &prepared, prepared.timeout)
            .await?;
        finish_choices(&mut response, prepared.extraction_tags.as_ref());
        Ok(response)
    }

    /// Submit a streamed chat and return the call driving `handler`.
    ///
    /// Errors raised before the stream opens are returned here and also
    /// reported to `handler.on_error`. Later errors resolve the returned call.
    pub async fn chat_streaming<H>(
        &self,
        request: &ChatRequest,
        mut handler: H,
    ) -> Result<StreamingCall<ChatResponse>, InferenceError>
    where
        H: ChatHandler,
    {
        let prepared = match self.prepare(request) {
            Ok(prepared) => prepared,
            Err(error) => {
                handler.on_error(&error);
                return Err(error);
            }
        };
        let path = Self::path(&prepared, true);
        let submit = self
            .ctx
            .config
            .retry
            .stream_submit_executor()
            .execute(|| {
                self.ctx
                    .transport
                    .open_stream(&path, &prepared, prepared.timeout)
            })
            .await;
        let events = match submit {
            Ok(events) => events,
            Err(error) => {
                handler.on_error(&error);
                return Err(error);
            }
        };

        tracing::debug!(path, "chat stream started");
        let assembler = ChatStreamAssembler::new(
            handler,
            prepared.extraction_tags.clone(),
            prepared.forces_tool_use(),
        );
        Ok(spawn_streaming_call(&self.ctx.executor, events, assembler))
    }
}

/// Move tagged thinking text out of every choice's content.
///
/// Empty text fields end up as `None`, the same shape a streamed call
/// assembles.
fn finish_choices(response: &mut ChatResponse, tags: Option<&ExtractionTags>) {
    for choice in &mut response.choices {
        let message = &mut choice.message;
        if let Some(tags) = tags
            && let Some(content) = message.content.take()
        {
            let (thinking, visible) = split_complete(tags, &content);
            message.content = Some(visible);
            if !thinking.is_empty() {
                message
                    .reasoning_content
                    .get_or_insert_with(String::new)
                    .push_str(&thinking);
            }
        }
        message.content = message.content.take().filter(|text| !text.is_empty());
        message.reasoning_content = message
            .reasoning_content
            .take()
            .filter(|text| !text.is_empty());
        message.tool_calls = message.tool_calls.take().filter(|calls| !calls.is_empty());
    }
}
