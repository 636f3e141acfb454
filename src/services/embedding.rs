//! Embeddings and reranking.

use super::ServiceContext;
use crate::error::InferenceError;
use crate::types::{EmbeddingRequest, EmbeddingResponse, RerankRequest, RerankResponse};
use std::sync::Arc;

const EMBEDDINGS_PATH: &str = "/ml/v1/text/embeddings";
const RERANK_PATH: &str = "/ml/v1/text/rerank";

#[derive(Debug, Clone)]
pub struct EmbeddingService {
    ctx: Arc<ServiceContext>,
}

impl EmbeddingService {
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    pub async fn embed(&self, request: &EmbeddingRequest) -> Result<EmbeddingResponse, InferenceError> {
        if request.inputs.is_empty() {
            return Err(InferenceError::InvalidInput(
                "embeddings require at least one input".to_string(),
            ));
        }
        let mut prepared = request.clone();
        prepared.scope = self.ctx.scope(&request.scope);
        self.ctx
            .transport
            .post_json(EMBEDDINGS_PATH, &prepared, None)
            .await
    }

    pub async fn rerank(&self, request: &RerankRequest) -> Result<RerankResponse, InferenceError> {
        if request.inputs.is_empty() {
            return Err(InferenceError::InvalidInput(
                "rerank requires at least one input".to_string(),
            ));
        }
        if request.query.is_empty() {
            return Err(InferenceError::InvalidInput(
                "rerank query must not be empty".to_string(),
            ));
        }
        let mut prepared = request.clone();
        prepared.scope = self.ctx.scope(&request.scope);
        self.ctx.transport.post_json(RERANK_PATH, &prepared, None).await
    }
}
