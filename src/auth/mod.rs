//! Authentication helpers and token providers.
//!
//! Services never talk to an identity endpoint themselves; they ask a
//! [`TokenProvider`] for a bearer token before each request and call
//! [`TokenProvider::invalidate`] when the remote side reports an expired token.

use crate::error::InferenceError;
use secrecy::SecretString;

pub mod api_key;

pub use api_key::ApiKeyTokenProvider;

/// An async Bearer token provider.
///
/// Implementations may cache internally and refresh when necessary.
#[async_trait::async_trait]
pub trait TokenProvider: Send + Sync {
    /// Returns an access token suitable for the `Authorization: Bearer <token>` header.
    async fn token(&self) -> Result<SecretString, InferenceError>;

    /// Drop any cached token so the next call to [`TokenProvider::token`] fetches a fresh one.
    fn invalidate(&self) {}
}

/// A static token provider useful for tests and deployments where the token
/// is managed externally.
pub struct StaticTokenProvider {
    token: SecretString,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: SecretString::from(token.into()),
        }
    }
}

#[async_trait::async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn token(&self) -> Result<SecretString, InferenceError> {
        Ok(self.token.clone())
    }
}
