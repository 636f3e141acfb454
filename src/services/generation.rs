//! Prompt-completion text generation.

use super::{ServiceContext, segment};
use crate::error::InferenceError;
use crate::streaming::{
    StreamingCall, TextGenerationAssembler, TextGenerationHandler, spawn_streaming_call,
};
use crate::types::{TextGenerationRequest, TextGenerationResponse};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct GenerationService {
    ctx: Arc<ServiceContext>,
}

impl GenerationService {
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    fn path(request: &TextGenerationRequest, stream: bool) -> String {
        let leaf = if stream { "generation_stream" } else { "generation" };
        match &request.deployment_id {
            Some(id) => format!("/ml/v1/deployments/{}/text/{leaf}", segment(id)),
            None => format!("/ml/v1/text/{leaf}"),
        }
    }

    fn prepare(
        &self,
        request: &TextGenerationRequest,
    ) -> Result<TextGenerationRequest, InferenceError> {
        request.validate()?;
        let mut prepared = request.clone();
        prepared.scope = self.ctx.scope(&request.scope);
        Ok(prepared)
    }

    pub async fn generate(
        &self,
        request: &TextGenerationRequest,
    ) -> Result<TextGenerationResponse, InferenceError> {
        let prepared = self.prepare(request)?;
        self.ctx
            .transport
            .post_json(&Self::path(&prepared, false), &prepared, prepared.timeout)
            .await
    }

    pub async fn generate_streaming<H>(
        &self,
        request: &TextGenerationRequest,
        mut handler: H,
    ) -> Result<StreamingCall<TextGenerationResponse>, InferenceError>
    where
        H: TextGenerationHandler,
    {
        let opened = match self.prepare(request) {
            Ok(prepared) => {
                let path = Self::path(&prepared, true);
                self.ctx
                    .config
                    .retry
                    .stream_submit_executor()
                    .execute(|| {
                        self.ctx
                            .transport
                            .open_stream(&path, &prepared, prepared.timeout)
                    })
                    .await
            }
            Err(error) => Err(error),
        };
        match opened {
            Ok(events) => Ok(spawn_streaming_call(
                &self.ctx.executor,
                events,
                TextGenerationAssembler::new(handler),
            )),
            Err(error) => {
                handler.on_error(&error);
                Err(error)
            }
        }
    }
}
