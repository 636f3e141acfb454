//! Text extraction types
//!
//! Extraction jobs read a document from object storage and write the
//! extracted text back to object storage. The service only ever sees
//! references to both locations.

use super::common::Scope;
use crate::error::InferenceError;
use crate::lro::OperationStatus;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataConnection {
    pub id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataLocation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    pub file_name: String,
}

/// Pointer to an object in a connected storage bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataReference {
    #[serde(rename = "type", default = "DataReference::default_type")]
    pub r#type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection: Option<DataConnection>,
    pub location: DataLocation,
}

impl DataReference {
    fn default_type() -> String {
        "connection_asset".to_string()
    }

    pub fn connection_asset(
        connection_id: impl Into<String>,
        bucket: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Self {
        Self {
            r#type: Self::default_type(),
            connection: Some(DataConnection {
                id: connection_id.into(),
            }),
            location: DataLocation {
                bucket: Some(bucket.into()),
                file_name: file_name.into(),
            },
        }
    }

    pub fn bucket(&self) -> Option<&str> {
        self.location.bucket.as_deref()
    }

    pub fn file_name(&self) -> &str {
        &self.location.file_name
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextExtractionParameters {
    /// Output formats, e.g. `md`, `json`, `html`, `plain_text`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requested_outputs: Vec<String>,
    /// `standard` or `high_quality`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ocr_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub languages: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_rotation_correction: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_embedded_images: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dpi: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_tokens_and_bbox: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TextExtractionRequest {
    pub document_reference: DataReference,
    pub results_reference: DataReference,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<TextExtractionParameters>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom: Option<serde_json::Value>,
    #[serde(flatten)]
    pub scope: Scope,
}

impl TextExtractionRequest {
    pub fn new(document_reference: DataReference, results_reference: DataReference) -> Self {
        Self {
            document_reference,
            results_reference,
            parameters: None,
            custom: None,
            scope: Scope::default(),
        }
    }

    pub fn parameters(mut self, parameters: TextExtractionParameters) -> Self {
        self.parameters = Some(parameters);
        self
    }

    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextExtractionMetadata {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextExtractionResults {
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_pages_processed: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub running_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    /// Remote error payload, kept verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextExtractionEntity {
    #[serde(default)]
    pub document_reference: DataReference,
    #[serde(default)]
    pub results_reference: DataReference,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<TextExtractionParameters>,
    #[serde(default)]
    pub results: TextExtractionResults,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextExtractionJob {
    pub metadata: TextExtractionMetadata,
    #[serde(default)]
    pub entity: TextExtractionEntity,
}

impl TextExtractionJob {
    pub fn id(&self) -> &str {
        &self.metadata.id
    }

    pub fn status(&self) -> OperationStatus {
        OperationStatus::from_wire(&self.entity.results.status)
    }

    /// Scope the job was created in.
    pub fn scope(&self) -> Scope {
        Scope {
            project_id: self.metadata.project_id.clone(),
            space_id: self.metadata.space_id.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextExtractionList {
    #[serde(default)]
    pub total_count: Option<u64>,
    #[serde(default)]
    pub resources: Vec<TextExtractionJob>,
}

/// Options of the one-call `extract_text` workflow.
#[derive(Debug, Clone)]
pub struct ExtractTextOptions {
    /// Wait for the job to finish and return the extracted text
    pub wait_for_completion: bool,
    /// Delete the results file from storage after reading it; requires waiting
    pub remove_output_file: bool,
    /// Delete the uploaded document once the job is terminal
    pub remove_upload: bool,
    /// Overrides the client's poll timeout
    pub timeout: Option<Duration>,
}

impl Default for ExtractTextOptions {
    fn default() -> Self {
        Self {
            wait_for_completion: true,
            remove_output_file: false,
            remove_upload: false,
            timeout: None,
        }
    }
}

impl ExtractTextOptions {
    pub fn validate(&self) -> Result<(), InferenceError> {
        if self.remove_output_file && !self.wait_for_completion {
            return Err(InferenceError::InvalidInput(
                "remove_output_file requires wait_for_completion".to_string(),
            ));
        }
        Ok(())
    }
}

/// Outcome of `extract_text`.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractTextOutcome {
    /// The job was submitted without waiting; poll it with the returned id
    Submitted(TextExtractionJob),
    Completed { job: TextExtractionJob, text: String },
}
