//! # infera
//!
//! Async client for a hosted ML inference platform: chat and text generation
//! (plain and streamed), embeddings, reranking, time-series forecasting,
//! file management, batch jobs and document text extraction.
//!
//! Streaming calls deliver incremental callbacks through [`ChatHandler`] or
//! [`TextGenerationHandler`] and resolve a [`StreamingCall`] future with the
//! aggregated response. Batch and extraction jobs are submitted, polled and
//! fetched by the long-running operation [`lro::Poller`].
//!
//! ```rust,ignore
//! use infera::prelude::*;
//!
//! struct Printer;
//! impl ChatHandler for Printer {
//!     fn on_partial_response(&mut self, text: &str, _delta: &PartialDelta) {
//!         print!("{text}");
//!     }
//! }
//!
//! let client = InferenceClient::from_env()?;
//! let request = ChatRequest::new(vec![ChatMessage::user("Hi")]).model("granite-3-8b");
//! let response = client.chat_streaming(&request, Printer).await?.await?;
//! ```

#![deny(unsafe_code)]

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod http;
pub mod lro;
pub mod observability;
pub mod retry;
pub mod services;
pub mod streaming;
pub mod types;

pub use client::{InferenceClient, InferenceClientBuilder};
pub use config::ClientConfig;
pub use error::{ErrorCategory, InferenceError};
pub use streaming::{
    CancelHandle, ChatHandler, ExtractionTags, PartialDelta, PartialToolCall, StreamingCall,
    TextGenerationHandler,
};

/// Commonly used types
pub mod prelude {
    pub use crate::auth::{StaticTokenProvider, TokenProvider};
    pub use crate::client::InferenceClient;
    pub use crate::config::ClientConfig;
    pub use crate::error::InferenceError;
    pub use crate::services::ObjectStorage;
    pub use crate::streaming::{
        CancelHandle, ChatHandler, ExtractionTags, NoopHandler, PartialDelta, PartialToolCall,
        StreamingCall, TextGenerationHandler,
    };
    pub use crate::types::*;
}
