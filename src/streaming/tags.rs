//! Thinking-tag extraction for streaming text.
//!
//! A state machine that splits a flowing content stream into thinking and
//! visible text based on a pair of markers. Markers may be split across
//! chunk boundaries: an ambiguous suffix is withheld until the next chunk
//! either completes the marker or proves it was ordinary text.
//!
//! ```rust,ignore
//! use infera::streaming::{ExtractionTags, ThinkingSplitter};
//!
//! let mut splitter = ThinkingSplitter::new(ExtractionTags::new("think", "response"));
//! let a = splitter.feed("<thi");
//! let b = splitter.feed("nk>hello</res");
//! let c = splitter.feed("ponse>world");
//! assert_eq!(b.thinking, "hello");
//! assert_eq!(c.visible, "world");
//! ```

/// Start and end markers delimiting thinking text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionTags {
    start_tag: String,
    end_tag: String,
}

impl ExtractionTags {
    /// `new("think", "response")` delimits with `<think>` and `</response>`.
    /// Tags already written with a leading `<` are used verbatim.
    pub fn new(start_tag: impl Into<String>, end_tag: impl Into<String>) -> Self {
        let start_tag = start_tag.into();
        let end_tag = end_tag.into();
        Self {
            start_tag: if start_tag.starts_with('<') {
                start_tag
            } else {
                format!("<{start_tag}>")
            },
            end_tag: if end_tag.starts_with('<') {
                end_tag
            } else {
                format!("</{end_tag}>")
            },
        }
    }

    /// `<think>` ... `</think>`
    pub fn think() -> Self {
        Self::new("think", "think")
    }

    pub fn start_tag(&self) -> &str {
        &self.start_tag
    }

    pub fn end_tag(&self) -> &str {
        &self.end_tag
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitterState {
    Outside,
    /// A possible start marker prefix is buffered
    SeekingStart,
    Inside,
    /// A possible end marker prefix is buffered
    SeekingEnd,
}

impl SplitterState {
    fn is_inside(self) -> bool {
        matches!(self, Self::Inside | Self::SeekingEnd)
    }
}

/// Output of one [`ThinkingSplitter::feed`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitDelta {
    pub thinking: String,
    pub visible: String,
}

impl SplitDelta {
    pub fn is_empty(&self) -> bool {
        self.thinking.is_empty() && self.visible.is_empty()
    }

    fn push(&mut self, text: &str, inside: bool) {
        if inside {
            self.thinking.push_str(text);
        } else {
            self.visible.push_str(text);
        }
    }
}

#[derive(Debug, Clone)]
pub struct ThinkingSplitter {
    tags: ExtractionTags,
    state: SplitterState,
    pending: String,
}

impl ThinkingSplitter {
    pub fn new(tags: ExtractionTags) -> Self {
        Self {
            tags,
            state: SplitterState::Outside,
            pending: String::new(),
        }
    }

    pub fn state(&self) -> SplitterState {
        self.state
    }

    pub fn feed(&mut self, chunk: &str) -> SplitDelta {
        let mut text = std::mem::take(&mut self.pending);
        text.push_str(chunk);

        let mut out = SplitDelta::default();
        let mut rest = text.as_str();
        loop {
            let inside = self.state.is_inside();
            let marker = if inside {
                self.tags.end_tag.as_str()
            } else {
                self.tags.start_tag.as_str()
            };

            if let Some(pos) = rest.find(marker) {
                out.push(&rest[..pos], inside);
                rest = &rest[pos + marker.len()..];
                self.state = if inside {
                    SplitterState::Outside
                } else {
                    SplitterState::Inside
                };
                continue;
            }

            match partial_marker_start(rest, marker) {
                Some(pos) => {
                    out.push(&rest[..pos], inside);
                    self.pending = rest[pos..].to_string();
                    self.state = if inside {
                        SplitterState::SeekingEnd
                    } else {
                        SplitterState::SeekingStart
                    };
                }
                None => {
                    out.push(rest, inside);
                    self.state = if inside {
                        SplitterState::Inside
                    } else {
                        SplitterState::Outside
                    };
                }
            }
            return out;
        }
    }

    /// Flush a withheld partial marker as ordinary text of the current section.
    pub fn finish(&mut self) -> SplitDelta {
        let mut out = SplitDelta::default();
        let inside = self.state.is_inside();
        out.push(&std::mem::take(&mut self.pending), inside);
        self.state = if inside {
            SplitterState::Inside
        } else {
            SplitterState::Outside
        };
        out
    }
}

/// Split a complete text in one go; returns `(thinking, visible)`.
pub fn split_complete(tags: &ExtractionTags, text: &str) -> (String, String) {
    let mut splitter = ThinkingSplitter::new(tags.clone());
    let mut out = splitter.feed(text);
    let tail = splitter.finish();
    out.thinking.push_str(&tail.thinking);
    out.visible.push_str(&tail.visible);
    (out.thinking, out.visible)
}

/// Char-boundary offset of the longest suffix of `text` that is a proper prefix of `marker`.
fn partial_marker_start(text: &str, marker: &str) -> Option<usize> {
    text.char_indices()
        .map(|(i, _)| i)
        .filter(|&i| text.len() - i < marker.len())
        .find(|&i| marker.starts_with(&text[i..]))
}
