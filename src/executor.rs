//! Bounded I/O executor for callback work.
//!
//! Jobs run on tokio's blocking pool, at most `size` at a time. The executor
//! is cheap to clone and safe to submit to from many tasks at once.

use crate::error::InferenceError;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub struct IoExecutor {
    permits: Arc<Semaphore>,
    size: usize,
}

impl IoExecutor {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of jobs that could start right now.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Run `job` once a slot is free and wait for its result.
    pub async fn run<F, T>(&self, job: F) -> Result<T, InferenceError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| InferenceError::InternalError("I/O executor is closed".to_string()))?;
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            job()
        })
        .await
        .map_err(|e| InferenceError::InternalError(format!("I/O job failed: {e}")))
    }

    /// Like [`IoExecutor::run`], without waiting.
    pub fn submit<F, T>(&self, job: F) -> JoinHandle<Result<T, InferenceError>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let executor = self.clone();
        tokio::spawn(async move { executor.run(job).await })
    }
}

impl Default for IoExecutor {
    fn default() -> Self {
        Self::new(8)
    }
}
