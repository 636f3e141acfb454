//! Request and response types
//!
//! Organized by endpoint family:
//!
//! - **`chat`** - messages, chat requests/responses, finish reasons
//! - **`tools`** - tool definitions, tool choice, completed tool calls
//! - **`generation`** - prompt completion
//! - **`embedding`** - embeddings and reranking
//! - **`forecast`** - time-series forecasting
//! - **`files`** / **`batch`** - file management and batch jobs
//! - **`extraction`** - text extraction jobs
//! - **`common`** - project/space scope and usage totals
//!
//! Everything is re-exported here:
//!
//! ```rust,ignore
//! use infera::types::{ChatMessage, ChatRequest, Scope};
//! ```

pub mod batch;
pub mod chat;
pub mod common;
pub mod embedding;
pub mod extraction;
pub mod files;
pub mod forecast;
pub mod generation;
pub mod tools;

pub use batch::*;
pub use chat::*;
pub use common::*;
pub use embedding::*;
pub use extraction::*;
pub use files::*;
pub use forecast::*;
pub use generation::*;
pub use tools::*;
