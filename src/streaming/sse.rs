//! Server-sent events decoding
//!
//! Turns a raw byte stream into [`StreamEvent`] blocks. Framing follows the
//! usual SSE rules: lines end in `\n` or `\r\n`, a blank line closes a block,
//! `data:` lines accumulate, lines starting with `:` are comments.
//!
//! The returned stream ends, without error, at the first block that carries
//! `event: close`, an empty `data:` payload, or the `[DONE]` marker.

use crate::error::InferenceError;
use futures_util::{Stream, StreamExt};
use std::pin::Pin;
use tokio_util::codec::{FramedRead, LinesCodec};
use tokio_util::io::StreamReader;

/// Data payload some servers send as an explicit end marker
pub const DONE_MARKER: &str = "[DONE]";

/// One decoded SSE block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamEvent {
    /// `message` unless the block named another event
    pub event: String,
    pub id: Option<u64>,
    pub data: String,
}

impl StreamEvent {
    /// Whether this block ends the stream.
    pub fn is_terminal(&self) -> bool {
        self.event == "close" || self.data.trim().is_empty() || self.data.trim() == DONE_MARKER
    }
}

pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, InferenceError>> + Send>>;

#[derive(Default)]
struct BlockBuilder {
    event: Option<String>,
    id: Option<u64>,
    data: Option<String>,
}

impl BlockBuilder {
    fn push_line(&mut self, line: &str) {
        if line.starts_with(':') {
            return;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => self.event = Some(value.to_string()),
            "id" => self.id = value.trim().parse().ok(),
            "data" => match &mut self.data {
                Some(data) => {
                    data.push('\n');
                    data.push_str(value);
                }
                None => self.data = Some(value.to_string()),
            },
            _ => {}
        }
    }

    /// Completed block, or `None` when nothing but comments/unknown fields was seen.
    fn take(&mut self) -> Option<StreamEvent> {
        let block = std::mem::take(self);
        if block.data.is_none() && block.event.is_none() {
            return None;
        }
        Some(StreamEvent {
            event: block.event.unwrap_or_else(|| "message".to_string()),
            id: block.id,
            data: block.data.unwrap_or_default(),
        })
    }
}

/// Decode an SSE byte stream into events.
pub fn decode_events<S, B>(byte_stream: S) -> EventStream
where
    S: Stream<Item = Result<B, InferenceError>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    let bytes = Box::pin(byte_stream.map(|chunk| {
        chunk
            .map(|b| bytes::Bytes::copy_from_slice(b.as_ref()))
            .map_err(|e| std::io::Error::other(e.to_string()))
    }));
    let mut lines = FramedRead::new(StreamReader::new(bytes), LinesCodec::new());

    let out = async_stream::stream! {
        let mut block = BlockBuilder::default();
        while let Some(line) = lines.next().await {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    yield Err(InferenceError::StreamError(format!("SSE read failed: {e}")));
                    return;
                }
            };
            if !line.is_empty() {
                block.push_line(&line);
                continue;
            }
            if let Some(event) = block.take() {
                if event.is_terminal() {
                    tracing::trace!(event = %event.event, "SSE stream closed by server");
                    return;
                }
                yield Ok(event);
            }
        }
        // Unterminated trailing block
        if let Some(event) = block.take() {
            if !event.is_terminal() {
                yield Ok(event);
            }
        }
    };

    Box::pin(out)
}
