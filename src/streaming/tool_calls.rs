//! Tool-call fragment merging
//!
//! Streaming responses deliver a tool call in pieces that share an `index`.
//! The first piece usually carries the id and function name, later pieces
//! carry slices of the JSON arguments.

use crate::types::ToolCall;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct ToolCallAccumulator {
    id: Option<String>,
    name: Option<String>,
    arguments: String,
}

/// Accumulates tool-call fragments for one streaming call, keyed by index.
#[derive(Debug, Clone, Default)]
pub struct ToolCallMerger {
    entries: BTreeMap<usize, ToolCallAccumulator>,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

impl ToolCallMerger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one fragment. `id` and `name` are set once, argument chunks are appended.
    pub fn update(
        &mut self,
        index: usize,
        id: Option<&str>,
        name: Option<&str>,
        arguments: Option<&str>,
    ) {
        let entry = self.entries.entry(index).or_default();
        if entry.id.is_none() {
            entry.id = non_empty(id).map(str::to_string);
        }
        if entry.name.is_none() {
            entry.name = non_empty(name).map(str::to_string);
        }
        if let Some(chunk) = non_empty(arguments) {
            entry.arguments.push_str(chunk);
        }
    }

    pub fn id(&self, index: usize) -> Option<&str> {
        self.entries.get(&index).and_then(|e| e.id.as_deref())
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.entries.get(&index).and_then(|e| e.name.as_deref())
    }

    /// Snapshot of the call at `index`; missing id or name become empty strings.
    pub fn materialize(&self, index: usize) -> Option<ToolCall> {
        self.entries.get(&index).map(|entry| {
            ToolCall::function(
                entry.id.clone().unwrap_or_default(),
                entry.name.clone().unwrap_or_default(),
                entry.arguments.clone(),
            )
        })
    }

    /// Known indices in ascending order.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// All calls in index order.
    pub fn materialize_all(&self) -> Vec<ToolCall> {
        self.indices()
            .filter_map(|index| self.materialize(index))
            .collect()
    }
}
