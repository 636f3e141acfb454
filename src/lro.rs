//! Long-running operations
//!
//! Batch jobs and text extraction jobs share one lifecycle: submit, poll the
//! status until it is terminal, then fetch the produced artifact. Services
//! describe their operation through [`OperationTracker`]; [`Poller`] owns the
//! timing, the timeout and the token-expiry retries.
//!
//! ```rust,ignore
//! let poller = Poller::new(config.poll_interval, config.poll_timeout)
//!     .with_timeout_override(request.timeout);
//! let output = poller.run(&tracker, &job.id, &job.input_file_id).await?;
//! ```

use crate::error::InferenceError;
use crate::retry::RetryOptions;
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use tokio::time::{Instant, sleep};

/// Normalized status of a remote operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationStatus {
    Submitted,
    Running,
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

impl OperationStatus {
    /// Map a remote status string. Unknown values count as still running.
    pub fn from_wire(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "submitted" | "validating" | "queued" => Self::Submitted,
            "running" | "uploading" | "downloading" | "downloaded" | "finalizing"
            | "cancelling" => Self::Running,
            "in_progress" => Self::InProgress,
            "completed" => Self::Completed,
            "failed" | "expired" => Self::Failed,
            "cancelled" | "canceled" => Self::Cancelled,
            other => {
                tracing::warn!(status = other, "unknown operation status, treating as running");
                Self::Running
            }
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::Running => "running",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How to observe one kind of remote operation.
#[async_trait]
pub trait OperationTracker: Send + Sync {
    /// Remote view of the operation as returned by a status fetch
    type Snapshot: Send + Sync;
    /// Artifact produced by a completed operation
    type Output: Send;

    async fn fetch_status(&self, id: &str) -> Result<Self::Snapshot, InferenceError>;

    fn status(&self, snapshot: &Self::Snapshot) -> OperationStatus;

    /// Remote error payload of a failed operation, verbatim.
    fn failure(&self, snapshot: &Self::Snapshot) -> Option<serde_json::Value>;

    async fn fetch_result(&self, snapshot: &Self::Snapshot)
    -> Result<Self::Output, InferenceError>;
}

/// Request-level timeout when set, service default otherwise.
pub fn effective_timeout(request: Option<Duration>, default: Duration) -> Duration {
    request.unwrap_or(default)
}

#[derive(Debug, Clone)]
pub struct Poller {
    pub interval: Duration,
    pub timeout: Duration,
    pub retry: RetryOptions,
}

impl Poller {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self {
            interval,
            timeout,
            retry: RetryOptions::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryOptions) -> Self {
        self.retry = retry;
        self
    }

    /// Replace the timeout when the request carries its own.
    pub fn with_timeout_override(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = effective_timeout(timeout, self.timeout);
        self
    }

    /// Poll `id` until it reaches a terminal status.
    ///
    /// `resource` names the thing the caller is waiting on (e.g. the input
    /// file id) and is reported in timeout and failure errors.
    pub async fn poll_until_terminal<T>(
        &self,
        tracker: &T,
        id: &str,
        resource: &str,
    ) -> Result<T::Snapshot, InferenceError>
    where
        T: OperationTracker + ?Sized,
    {
        let started = Instant::now();
        let executor = self.retry.executor();
        let mut polls: u32 = 0;

        loop {
            let snapshot = executor.execute(|| tracker.fetch_status(id)).await?;
            polls += 1;
            let status = tracker.status(&snapshot);
            tracing::debug!(id, resource, %status, polls, "polled operation status");

            match status {
                OperationStatus::Completed => return Ok(snapshot),
                OperationStatus::Failed | OperationStatus::Cancelled => {
                    return Err(InferenceError::OperationFailed {
                        resource: resource.to_string(),
                        status: status.as_str().to_string(),
                        details: tracker.failure(&snapshot),
                    });
                }
                _ => {}
            }

            if started.elapsed() >= self.timeout {
                tracing::warn!(id, resource, timeout = ?self.timeout, "operation timed out");
                return Err(InferenceError::timeout(resource, self.timeout));
            }
            sleep(self.interval).await;
        }
    }

    /// Poll until terminal, then fetch the result exactly once.
    pub async fn run<T>(
        &self,
        tracker: &T,
        id: &str,
        resource: &str,
    ) -> Result<T::Output, InferenceError>
    where
        T: OperationTracker + ?Sized,
    {
        let snapshot = self.poll_until_terminal(tracker, id, resource).await?;
        self.retry
            .executor()
            .execute(|| tracker.fetch_result(&snapshot))
            .await
    }
}
