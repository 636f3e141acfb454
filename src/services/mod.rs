//! Endpoint families.
//!
//! Each service is a thin, cloneable handle over the shared
//! [`ServiceContext`]: it validates the request, fills in the default scope,
//! picks the path and delegates to the [`HttpTransport`].

pub mod batch;
pub mod chat;
pub mod embedding;
pub mod extraction;
pub mod files;
pub mod forecast;
pub mod generation;

pub use batch::{BatchService, BatchTracker};
pub use chat::ChatService;
pub use embedding::EmbeddingService;
pub use extraction::{ExtractionTracker, ObjectStorage, TextExtractionService};
pub use files::FileService;
pub use forecast::ForecastService;
pub use generation::GenerationService;

use crate::config::ClientConfig;
use crate::error::InferenceError;
use crate::executor::IoExecutor;
use crate::http::HttpTransport;
use crate::lro::Poller;
use crate::types::Scope;
use std::sync::Arc;

/// State shared by every service of one client.
#[derive(Debug)]
pub struct ServiceContext {
    pub transport: HttpTransport,
    pub config: ClientConfig,
    pub executor: IoExecutor,
}

impl ServiceContext {
    pub fn new(transport: HttpTransport, config: ClientConfig) -> Arc<Self> {
        let executor = IoExecutor::new(config.io_pool_size);
        Arc::new(Self {
            transport,
            config,
            executor,
        })
    }

    /// Request scope, or the client default when the request has none.
    pub fn scope(&self, scope: &Scope) -> Scope {
        scope.clone().or(&self.config.scope)
    }

    /// Like [`ServiceContext::scope`] but fails when neither is set.
    pub fn require_scope(&self, scope: &Scope, operation: &str) -> Result<Scope, InferenceError> {
        let resolved = self.scope(scope);
        if resolved.is_empty() {
            return Err(InferenceError::InvalidInput(format!(
                "{operation} requires a project_id or space_id"
            )));
        }
        Ok(resolved)
    }

    /// Poller with the client's interval, timeout and retry options.
    pub fn poller(&self) -> Poller {
        Poller::new(self.config.poll_interval, self.config.poll_timeout)
            .with_retry(self.config.retry.clone())
    }
}

/// Percent-encode a caller-supplied id for use as a path segment.
pub(crate) fn segment(id: &str) -> String {
    urlencoding::encode(id).into_owned()
}
