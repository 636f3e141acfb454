//! Types shared by several endpoint families.

use serde::{Deserialize, Serialize};

/// Project or space a request is billed and authorized against.
///
/// Merged into JSON bodies as `project_id` / `space_id` and appended to the
/// query string of GET and DELETE calls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space_id: Option<String>,
}

impl Scope {
    pub fn project(id: impl Into<String>) -> Self {
        Self {
            project_id: Some(id.into()),
            space_id: None,
        }
    }

    pub fn space(id: impl Into<String>) -> Self {
        Self {
            project_id: None,
            space_id: Some(id.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.project_id.is_none() && self.space_id.is_none()
    }

    /// This scope when set, `fallback` otherwise.
    pub fn or(self, fallback: &Scope) -> Scope {
        if self.is_empty() {
            fallback.clone()
        } else {
            self
        }
    }

    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(id) = &self.project_id {
            pairs.push(("project_id", id.clone()));
        }
        if let Some(id) = &self.space_id {
            pairs.push(("space_id", id.clone()));
        }
        pairs
    }
}

/// Token usage totals
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u32>,
}
