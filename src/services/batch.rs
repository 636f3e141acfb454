//! Batch jobs: submit a JSONL file, poll, download the results.

use super::{ServiceContext, segment};
use crate::error::InferenceError;
use crate::lro::{OperationStatus, OperationTracker};
use crate::types::{BatchCreateRequest, BatchJob, BatchList, BatchResult, Scope};
use async_trait::async_trait;
use std::sync::Arc;

const BATCHES_PATH: &str = "/v1/batches";

#[derive(Debug, Clone)]
pub struct BatchService {
    ctx: Arc<ServiceContext>,
}

impl BatchService {
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    pub async fn submit(&self, request: &BatchCreateRequest) -> Result<BatchJob, InferenceError> {
        request.validate()?;
        let mut prepared = request.clone();
        prepared.scope = self.ctx.require_scope(&request.scope, "batch")?;
        let job: BatchJob = self
            .ctx
            .config
            .retry
            .executor()
            .execute(|| self.ctx.transport.post_json(BATCHES_PATH, &prepared, None))
            .await?;
        tracing::debug!(batch_id = %job.id, input_file_id = %job.input_file_id, "batch submitted");
        Ok(job)
    }

    pub async fn retrieve(&self, batch_id: &str, scope: &Scope) -> Result<BatchJob, InferenceError> {
        let scope = self.ctx.require_scope(scope, "batch")?;
        self.ctx
            .transport
            .get_json(
                &format!("{BATCHES_PATH}/{}", segment(batch_id)),
                &scope.query_pairs(),
            )
            .await
    }

    pub async fn list(
        &self,
        after: Option<&str>,
        limit: Option<u32>,
        scope: &Scope,
    ) -> Result<BatchList, InferenceError> {
        let scope = self.ctx.require_scope(scope, "batch")?;
        let mut query = scope.query_pairs();
        if let Some(after) = after {
            query.push(("after", after.to_string()));
        }
        if let Some(limit) = limit {
            query.push(("limit", limit.to_string()));
        }
        self.ctx.transport.get_json(BATCHES_PATH, &query).await
    }

    pub async fn cancel(&self, batch_id: &str, scope: &Scope) -> Result<BatchJob, InferenceError> {
        let scope = self.ctx.require_scope(scope, "batch")?;
        self.ctx
            .transport
            .post_json(
                &format!("{BATCHES_PATH}/{}/cancel", segment(batch_id)),
                &scope,
                None,
            )
            .await
    }

    /// Download and decode the output file of a completed job.
    ///
    /// `scope` should be the one the job was submitted under.
    pub async fn results(
        &self,
        job: &BatchJob,
        scope: &Scope,
    ) -> Result<Vec<BatchResult>, InferenceError> {
        let scope = self.ctx.require_scope(scope, "batch")?;
        let file_id = job
            .output_file_id
            .as_deref()
            .ok_or_else(|| InferenceError::OperationFailed {
                resource: job.input_file_id.clone(),
                status: job.raw_status.clone(),
                details: None,
            })?;
        let content = self
            .ctx
            .transport
            .get_bytes(
                &format!("/v1/files/{}/content", segment(file_id)),
                &scope.query_pairs(),
            )
            .await?;
        BatchResult::parse_jsonl(&content)
    }

    /// Submit, wait until the job is terminal and return its decoded output.
    ///
    /// The request's `timeout` replaces the client's poll timeout. Timeouts
    /// and failures name the input file id.
    pub async fn submit_and_fetch(
        &self,
        request: &BatchCreateRequest,
    ) -> Result<Vec<BatchResult>, InferenceError> {
        let job = self.submit(request).await?;
        let tracker = BatchTracker {
            service: self.clone(),
            scope: self.ctx.require_scope(&request.scope, "batch")?,
        };
        self.ctx
            .poller()
            .with_timeout_override(request.timeout)
            .run(&tracker, &job.id, &request.input_file_id)
            .await
    }
}

/// Observes one batch job for the poller.
#[derive(Debug, Clone)]
pub struct BatchTracker {
    service: BatchService,
    scope: Scope,
}

#[async_trait]
impl OperationTracker for BatchTracker {
    type Snapshot = BatchJob;
    type Output = Vec<BatchResult>;

    async fn fetch_status(&self, id: &str) -> Result<BatchJob, InferenceError> {
        self.service.retrieve(id, &self.scope).await
    }

    fn status(&self, snapshot: &BatchJob) -> OperationStatus {
        snapshot.status()
    }

    fn failure(&self, snapshot: &BatchJob) -> Option<serde_json::Value> {
        snapshot.errors.clone()
    }

    async fn fetch_result(&self, snapshot: &BatchJob) -> Result<Vec<BatchResult>, InferenceError> {
        self.service.results(snapshot, &self.scope).await
    }
}
