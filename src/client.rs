//! Client facade
//!
//! [`InferenceClient`] owns the transport, the I/O executor and the
//! configuration, and hands out cheap service handles.
//!
//! ```rust,ignore
//! use infera::prelude::*;
//!
//! let client = InferenceClient::from_env()?;
//! let response = client
//!     .chat(&ChatRequest::new(vec![ChatMessage::user("Hello")]).model("granite-3-8b"))
//!     .await?;
//! println!("{}", response.content().unwrap_or_default());
//! ```

use crate::auth::{ApiKeyTokenProvider, StaticTokenProvider, TokenProvider};
use crate::config::ClientConfig;
use crate::error::InferenceError;
use crate::http::HttpTransport;
use crate::services::{
    BatchService, ChatService, EmbeddingService, FileService, ForecastService, GenerationService,
    ObjectStorage, ServiceContext, TextExtractionService,
};
use crate::streaming::{ChatHandler, StreamingCall, TextGenerationHandler};
use crate::types::{
    BatchCreateRequest, BatchResult, ChatRequest, ChatResponse, EmbeddingRequest,
    EmbeddingResponse, ExtractTextOptions, ExtractTextOutcome, ForecastRequest, ForecastResponse,
    RerankRequest, RerankResponse, TextExtractionRequest, TextGenerationRequest,
    TextGenerationResponse,
};
use bytes::Bytes;
use std::sync::Arc;

#[derive(Clone)]
pub struct InferenceClient {
    ctx: Arc<ServiceContext>,
    storage: Option<Arc<dyn ObjectStorage>>,
}

impl std::fmt::Debug for InferenceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceClient")
            .field("base_url", &self.ctx.config.base_url)
            .field("scope", &self.ctx.config.scope)
            .field("io_pool_size", &self.ctx.executor.size())
            .finish_non_exhaustive()
    }
}

impl InferenceClient {
    pub fn builder(config: ClientConfig) -> InferenceClientBuilder {
        InferenceClientBuilder {
            config,
            tokens: None,
            http: None,
            storage: None,
        }
    }

    /// Client configured from `INFERA_*` environment variables.
    pub fn from_env() -> Result<Self, InferenceError> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn new(config: ClientConfig) -> Result<Self, InferenceError> {
        Self::builder(config).build()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.ctx.config
    }

    pub fn chat_service(&self) -> ChatService {
        ChatService::new(Arc::clone(&self.ctx))
    }

    pub fn generation(&self) -> GenerationService {
        GenerationService::new(Arc::clone(&self.ctx))
    }

    pub fn embeddings(&self) -> EmbeddingService {
        EmbeddingService::new(Arc::clone(&self.ctx))
    }

    pub fn forecasts(&self) -> ForecastService {
        ForecastService::new(Arc::clone(&self.ctx))
    }

    pub fn files(&self) -> FileService {
        FileService::new(Arc::clone(&self.ctx))
    }

    pub fn batches(&self) -> BatchService {
        BatchService::new(Arc::clone(&self.ctx))
    }

    pub fn text_extraction(&self) -> TextExtractionService {
        let service = TextExtractionService::new(Arc::clone(&self.ctx));
        match &self.storage {
            Some(storage) => service.with_storage(Arc::clone(storage)),
            None => service,
        }
    }

    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, InferenceError> {
        self.chat_service().chat(request).await
    }

    pub async fn chat_streaming<H: ChatHandler>(
        &self,
        request: &ChatRequest,
        handler: H,
    ) -> Result<StreamingCall<ChatResponse>, InferenceError> {
        self.chat_service().chat_streaming(request, handler).await
    }

    pub async fn generate(
        &self,
        request: &TextGenerationRequest,
    ) -> Result<TextGenerationResponse, InferenceError> {
        self.generation().generate(request).await
    }

    pub async fn generate_streaming<H: TextGenerationHandler>(
        &self,
        request: &TextGenerationRequest,
        handler: H,
    ) -> Result<StreamingCall<TextGenerationResponse>, InferenceError> {
        self.generation().generate_streaming(request, handler).await
    }

    pub async fn embed(&self, request: &EmbeddingRequest) -> Result<EmbeddingResponse, InferenceError> {
        self.embeddings().embed(request).await
    }

    pub async fn rerank(&self, request: &RerankRequest) -> Result<RerankResponse, InferenceError> {
        self.embeddings().rerank(request).await
    }

    pub async fn forecast(&self, request: &ForecastRequest) -> Result<ForecastResponse, InferenceError> {
        self.forecasts().forecast(request).await
    }

    pub async fn submit_batch_and_fetch(
        &self,
        request: &BatchCreateRequest,
    ) -> Result<Vec<BatchResult>, InferenceError> {
        self.batches().submit_and_fetch(request).await
    }

    pub async fn extract_text(
        &self,
        document: Bytes,
        request: &TextExtractionRequest,
        options: &ExtractTextOptions,
    ) -> Result<ExtractTextOutcome, InferenceError> {
        self.text_extraction()
            .extract_text(document, request, options)
            .await
    }
}

pub struct InferenceClientBuilder {
    config: ClientConfig,
    tokens: Option<Arc<dyn TokenProvider>>,
    http: Option<reqwest::Client>,
    storage: Option<Arc<dyn ObjectStorage>>,
}

impl InferenceClientBuilder {
    /// Supply bearer tokens from a custom provider instead of the API key.
    pub fn token_provider(mut self, tokens: Arc<dyn TokenProvider>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http = Some(client);
        self
    }

    /// Object storage used by the text extraction workflow.
    pub fn object_storage(mut self, storage: Arc<dyn ObjectStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn build(self) -> Result<InferenceClient, InferenceError> {
        let config = self.config;
        let http = match self.http {
            Some(client) => client,
            None => reqwest::Client::builder()
                .connect_timeout(config.connect_timeout)
                .build()
                .map_err(|e| {
                    InferenceError::ConfigurationError(format!("failed to build HTTP client: {e}"))
                })?,
        };

        let tokens: Arc<dyn TokenProvider> = match (self.tokens, &config.api_key, &config.token_url)
        {
            (Some(tokens), _, _) => tokens,
            (None, Some(key), Some(url)) => {
                Arc::new(ApiKeyTokenProvider::new(http.clone(), url.clone(), key.clone()))
            }
            (None, Some(key), None) => {
                use secrecy::ExposeSecret;
                Arc::new(StaticTokenProvider::new(key.expose_secret()))
            }
            (None, None, _) => {
                return Err(InferenceError::ConfigurationError(
                    "an API key or a token provider is required".to_string(),
                ));
            }
        };

        let transport = HttpTransport::with_client(http, &config, tokens)?;
        tracing::debug!(base_url = %config.base_url, "inference client ready");
        Ok(InferenceClient {
            ctx: ServiceContext::new(transport, config),
            storage: self.storage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ClientConfig {
        ClientConfig::builder()
            .base_url("http://localhost:8080")
            .project_id("p-1")
            .io_pool_size(2)
            .build()
            .unwrap()
    }

    #[test]
    fn credentials_are_required() {
        let err = InferenceClient::new(config()).unwrap_err();
        assert!(matches!(err, InferenceError::ConfigurationError(_)));
    }

    #[test]
    fn custom_token_provider_replaces_api_key() {
        let client = InferenceClient::builder(config())
            .token_provider(Arc::new(StaticTokenProvider::new("t")))
            .build()
            .unwrap();
        assert_eq!(client.config().scope.project_id.as_deref(), Some("p-1"));
        assert!(format!("{client:?}").contains("io_pool_size: 2"));
    }
}
