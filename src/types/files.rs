//! File management types

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileObject {
    pub id: String,
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub bytes: u64,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub purpose: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileList {
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub data: Vec<FileObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_id: Option<String>,
    #[serde(default)]
    pub has_more: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDeleteResponse {
    pub id: String,
    #[serde(default)]
    pub object: String,
    pub deleted: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileListQuery {
    pub after: Option<String>,
    pub limit: Option<u32>,
    pub order: Option<String>,
    pub purpose: Option<String>,
}

impl FileListQuery {
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(after) = &self.after {
            pairs.push(("after", after.clone()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(order) = &self.order {
            pairs.push(("order", order.clone()));
        }
        if let Some(purpose) = &self.purpose {
            pairs.push(("purpose", purpose.clone()));
        }
        pairs
    }
}

/// Upload payload; multipart encoding happens in the files service.
#[derive(Debug, Clone)]
pub struct FileUploadRequest {
    pub content: bytes::Bytes,
    pub filename: String,
    /// Detected from the filename when absent
    pub mime_type: Option<String>,
    pub purpose: String,
}

impl FileUploadRequest {
    pub fn new(content: impl Into<bytes::Bytes>, filename: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            filename: filename.into(),
            mime_type: None,
            purpose: "batch".to_string(),
        }
    }

    pub fn purpose(mut self, purpose: impl Into<String>) -> Self {
        self.purpose = purpose.into();
        self
    }

    pub fn mime_type(mut self, mime: impl Into<String>) -> Self {
        self.mime_type = Some(mime.into());
        self
    }

    pub fn effective_mime_type(&self) -> String {
        self.mime_type.clone().unwrap_or_else(|| {
            mime_guess::from_path(&self.filename)
                .first_or_octet_stream()
                .essence_str()
                .to_string()
        })
    }
}
