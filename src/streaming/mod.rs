//! Streaming response pipeline
//!
//! Bytes from the HTTP response flow through these stages:
//!
//! 1. [`sse`] frames the bytes into [`StreamEvent`] blocks;
//! 2. [`delta`] decodes each payload into a [`PartialDelta`];
//! 3. the assembler ([`assembler`] for chat, [`generation`] for text
//!    generation) merges tool-call fragments ([`tool_calls`]), splits thinking
//!    text ([`tags`]) and fires [`handler`] callbacks;
//! 4. [`call`] runs the assembler on the I/O executor and exposes the result
//!    as a [`StreamingCall`] future.

pub mod assembler;
pub mod call;
pub mod delta;
pub mod generation;
pub mod handler;
pub mod sse;
pub mod tags;
pub mod tool_calls;

pub use assembler::{AggregatedResponse, AssemblerState, ChatStreamAssembler, StreamAssembler};
pub use call::{CancelHandle, StreamingCall, spawn_streaming_call};
pub use delta::{PartialDelta, ToolCallFragment};
pub use generation::TextGenerationAssembler;
pub use handler::{ChatHandler, NoopHandler, PartialToolCall, TextGenerationHandler};
pub use sse::{EventStream, StreamEvent, decode_events};
pub use tags::{ExtractionTags, SplitDelta, SplitterState, ThinkingSplitter, split_complete};
pub use tool_calls::ToolCallMerger;
