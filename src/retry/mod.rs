//! Retry module
//!
//! Retries are deliberately narrow: only failures that signal an expired
//! bearer token are retried, a small bounded number of times, and only on the
//! idempotent submit/poll/fetch paths of long-running operations. Whether the
//! streaming submit is retried as well is decided by
//! [`RetryOptions::retry_stream_submit`].

mod policy;

pub use policy::{RetryExecutor, RetryPolicy};

use crate::error::InferenceError;

/// Unified retry options attached to a client configuration.
#[derive(Debug, Clone)]
pub struct RetryOptions {
    pub policy: RetryPolicy,
    /// Also retry opening a streaming response (off by default)
    pub retry_stream_submit: bool,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            policy: RetryPolicy::default(),
            retry_stream_submit: false,
        }
    }
}

impl RetryOptions {
    /// Options that never retry.
    pub fn disabled() -> Self {
        Self {
            policy: RetryPolicy::none(),
            retry_stream_submit: false,
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.policy = self.policy.with_max_attempts(attempts);
        self
    }

    pub fn with_retry_stream_submit(mut self, retry: bool) -> Self {
        self.retry_stream_submit = retry;
        self
    }

    pub fn executor(&self) -> RetryExecutor {
        RetryExecutor::new(self.policy.clone())
    }

    /// Executor for the streaming submit: the configured policy when enabled,
    /// a single attempt otherwise.
    pub fn stream_submit_executor(&self) -> RetryExecutor {
        if self.retry_stream_submit {
            self.executor()
        } else {
            RetryExecutor::new(RetryPolicy::none())
        }
    }
}

/// Retry `operation` with the given options.
pub async fn retry_with<F, Fut, T>(options: &RetryOptions, operation: F) -> Result<T, InferenceError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, InferenceError>>,
{
    options.executor().execute(operation).await
}
