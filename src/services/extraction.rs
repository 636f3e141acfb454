//! Text extraction jobs over documents held in object storage.
//!
//! The service submits, polls, lists and deletes extraction jobs. The
//! one-call [`TextExtractionService::extract_text`] workflow also hands the
//! document to an [`ObjectStorage`] implementation, waits for the job and
//! reads the results file back. No storage backend ships with the crate.

use super::{ServiceContext, segment};
use crate::error::InferenceError;
use crate::lro::{OperationStatus, OperationTracker};
use crate::types::{
    DataReference, ExtractTextOptions, ExtractTextOutcome, Scope, TextExtractionJob,
    TextExtractionList, TextExtractionRequest,
};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;

const EXTRACTIONS_PATH: &str = "/ml/v1/text/extractions";

/// Bucket/key object store the extraction service reads from and writes to.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn put(&self, bucket: &str, key: &str, content: Bytes) -> Result<(), InferenceError>;

    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes, InferenceError>;

    async fn delete(&self, bucket: &str, key: &str) -> Result<(), InferenceError>;
}

#[derive(Clone)]
pub struct TextExtractionService {
    ctx: Arc<ServiceContext>,
    storage: Option<Arc<dyn ObjectStorage>>,
}

impl std::fmt::Debug for TextExtractionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextExtractionService")
            .field("has_storage", &self.storage.is_some())
            .finish_non_exhaustive()
    }
}

fn location(reference: &DataReference, role: &str) -> Result<(String, String), InferenceError> {
    let bucket = reference.bucket().ok_or_else(|| {
        InferenceError::InvalidInput(format!("{role} reference has no bucket"))
    })?;
    if reference.file_name().is_empty() {
        return Err(InferenceError::InvalidInput(format!(
            "{role} reference has no file name"
        )));
    }
    Ok((bucket.to_string(), reference.file_name().to_string()))
}

impl TextExtractionService {
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx, storage: None }
    }

    pub fn with_storage(mut self, storage: Arc<dyn ObjectStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    fn storage(&self) -> Result<&Arc<dyn ObjectStorage>, InferenceError> {
        self.storage.as_ref().ok_or_else(|| {
            InferenceError::ConfigurationError(
                "text extraction workflow requires an object storage".to_string(),
            )
        })
    }

    pub async fn submit(
        &self,
        request: &TextExtractionRequest,
    ) -> Result<TextExtractionJob, InferenceError> {
        let mut prepared = request.clone();
        prepared.scope = self.ctx.require_scope(&request.scope, "text extraction")?;
        let job: TextExtractionJob = self
            .ctx
            .config
            .retry
            .executor()
            .execute(|| self.ctx.transport.post_json(EXTRACTIONS_PATH, &prepared, None))
            .await?;
        tracing::debug!(job_id = %job.id(), "text extraction submitted");
        Ok(job)
    }

    pub async fn fetch(&self, job_id: &str, scope: &Scope) -> Result<TextExtractionJob, InferenceError> {
        let scope = self.ctx.require_scope(scope, "text extraction")?;
        self.ctx
            .transport
            .get_json(
                &format!("{EXTRACTIONS_PATH}/{}", segment(job_id)),
                &scope.query_pairs(),
            )
            .await
    }

    pub async fn list(
        &self,
        limit: Option<u32>,
        scope: &Scope,
    ) -> Result<TextExtractionList, InferenceError> {
        let scope = self.ctx.require_scope(scope, "text extraction")?;
        let mut query = scope.query_pairs();
        if let Some(limit) = limit {
            query.push(("limit", limit.to_string()));
        }
        self.ctx.transport.get_json(EXTRACTIONS_PATH, &query).await
    }

    /// Delete a job; `hard_delete` also removes it from the job history.
    pub async fn delete(
        &self,
        job_id: &str,
        hard_delete: bool,
        scope: &Scope,
    ) -> Result<(), InferenceError> {
        let scope = self.ctx.require_scope(scope, "text extraction")?;
        let mut query = scope.query_pairs();
        if hard_delete {
            query.push(("hard_delete", "true".to_string()));
        }
        self.ctx
            .transport
            .delete(&format!("{EXTRACTIONS_PATH}/{}", segment(job_id)), &query)
            .await
    }

    /// Upload `document`, run the extraction and optionally wait for the text.
    pub async fn extract_text(
        &self,
        document: Bytes,
        request: &TextExtractionRequest,
        options: &ExtractTextOptions,
    ) -> Result<ExtractTextOutcome, InferenceError> {
        options.validate()?;
        let scope = self.ctx.require_scope(&request.scope, "text extraction")?;
        let storage = self.storage()?;
        let (doc_bucket, doc_key) = location(&request.document_reference, "document")?;
        location(&request.results_reference, "results")?;

        storage.put(&doc_bucket, &doc_key, document).await?;
        tracing::debug!(bucket = %doc_bucket, key = %doc_key, "document uploaded");

        let job = self.submit(&request.clone().scope(scope.clone())).await?;
        if !options.wait_for_completion {
            return Ok(ExtractTextOutcome::Submitted(job));
        }

        let tracker = ExtractionTracker {
            service: self.clone(),
            storage: Arc::clone(storage),
            scope,
        };
        let polled = self
            .ctx
            .poller()
            .with_timeout_override(options.timeout)
            .poll_until_terminal(&tracker, job.id(), &doc_key)
            .await;

        let reached_terminal =
            polled.is_ok() || matches!(polled, Err(InferenceError::OperationFailed { .. }));
        if options.remove_upload && reached_terminal {
            storage.delete(&doc_bucket, &doc_key).await?;
        }
        let finished = polled?;

        let text = self
            .ctx
            .config
            .retry
            .executor()
            .execute(|| tracker.fetch_result(&finished))
            .await?;
        if options.remove_output_file {
            let (bucket, key) = location(&finished.entity.results_reference, "results")
                .or_else(|_| location(&request.results_reference, "results"))?;
            storage.delete(&bucket, &key).await?;
        }
        Ok(ExtractTextOutcome::Completed { job: finished, text })
    }
}

/// Observes one extraction job and reads its results file.
#[derive(Clone)]
pub struct ExtractionTracker {
    service: TextExtractionService,
    storage: Arc<dyn ObjectStorage>,
    scope: Scope,
}

#[async_trait]
impl OperationTracker for ExtractionTracker {
    type Snapshot = TextExtractionJob;
    type Output = String;

    async fn fetch_status(&self, id: &str) -> Result<TextExtractionJob, InferenceError> {
        self.service.fetch(id, &self.scope).await
    }

    fn status(&self, snapshot: &TextExtractionJob) -> OperationStatus {
        snapshot.status()
    }

    fn failure(&self, snapshot: &TextExtractionJob) -> Option<serde_json::Value> {
        snapshot.entity.results.error.clone()
    }

    async fn fetch_result(&self, snapshot: &TextExtractionJob) -> Result<String, InferenceError> {
        let (bucket, key) = location(&snapshot.entity.results_reference, "results")?;
        let content = self.storage.get(&bucket, &key).await?;
        String::from_utf8(content.to_vec()).map_err(|e| {
            InferenceError::ParseError(format!("results file {key} is not UTF-8: {e}"))
        })
    }
}
