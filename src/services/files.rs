//! File upload and management.

use super::{ServiceContext, segment};
use crate::error::InferenceError;
use crate::types::{FileDeleteResponse, FileList, FileListQuery, FileObject, FileUploadRequest};
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use std::path::Path;
use std::sync::Arc;

const FILES_PATH: &str = "/v1/files";

#[derive(Debug, Clone)]
pub struct FileService {
    ctx: Arc<ServiceContext>,
}

impl FileService {
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    fn scope_query(&self) -> Vec<(&'static str, String)> {
        self.ctx.config.scope.query_pairs()
    }

    pub async fn upload(&self, request: FileUploadRequest) -> Result<FileObject, InferenceError> {
        if request.filename.is_empty() {
            return Err(InferenceError::InvalidInput(
                "upload requires a filename".to_string(),
            ));
        }
        let mime = request.effective_mime_type();
        let size = request.content.len();
        let part = Part::stream(request.content)
            .file_name(request.filename.clone())
            .mime_str(&mime)
            .map_err(|e| InferenceError::InvalidInput(format!("invalid MIME type {mime}: {e}")))?;
        let form = Form::new()
            .text("purpose", request.purpose.clone())
            .part("file", part);

        tracing::debug!(filename = %request.filename, size, mime, "uploading file");
        self.ctx
            .transport
            .post_multipart(FILES_PATH, &self.scope_query(), form)
            .await
    }

    /// Read `path` from disk and upload it under its file name.
    pub async fn upload_path(
        &self,
        path: impl AsRef<Path>,
        purpose: impl Into<String>,
    ) -> Result<FileObject, InferenceError> {
        let path = path.as_ref();
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                InferenceError::InvalidInput(format!("{} has no file name", path.display()))
            })?
            .to_string();
        let content = tokio::fs::read(path).await.map_err(|e| {
            InferenceError::InvalidInput(format!("failed to read {}: {e}", path.display()))
        })?;
        self.upload(FileUploadRequest::new(content, filename).purpose(purpose))
            .await
    }

    pub async fn list(&self, query: &FileListQuery) -> Result<FileList, InferenceError> {
        let mut pairs = query.query_pairs();
        pairs.extend(self.scope_query());
        self.ctx.transport.get_json(FILES_PATH, &pairs).await
    }

    pub async fn retrieve(&self, file_id: &str) -> Result<FileObject, InferenceError> {
        self.ctx
            .transport
            .get_json(&format!("{FILES_PATH}/{}", segment(file_id)), &self.scope_query())
            .await
    }

    pub async fn content(&self, file_id: &str) -> Result<Bytes, InferenceError> {
        self.ctx
            .transport
            .get_bytes(
                &format!("{FILES_PATH}/{}/content", segment(file_id)),
                &self.scope_query(),
            )
            .await
    }

    pub async fn delete(&self, file_id: &str) -> Result<FileDeleteResponse, InferenceError> {
        self.ctx
            .transport
            .delete_json(&format!("{FILES_PATH}/{}", segment(file_id)), &self.scope_query())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::context;
    use crate::types::Scope;
    use serde_json::json;
    use std::io::Write;
    use wiremock::matchers::{header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn file_json(id: &str, name: &str) -> serde_json::Value {
        json!({"id": id, "object": "file", "bytes": 12, "created_at": 1, "filename": name, "purpose": "batch"})
    }

    #[tokio::test]
    async fn upload_path_sends_multipart() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(FILES_PATH))
            .and(header_exists("content-type"))
            .and(query_param("project_id", "p-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(file_json("file-1", "in.jsonl")))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("in.jsonl");
        let mut file = std::fs::File::create(&file_path).unwrap();
        writeln!(file, "{{\"custom_id\":\"a\"}}").unwrap();

        let service = FileService::new(context(&server.uri(), Scope::project("p-1")));
        let uploaded = service.upload_path(&file_path, "batch").await.unwrap();
        assert_eq!(uploaded.id, "file-1");

        let received = &server.received_requests().await.unwrap()[0];
        let body = String::from_utf8_lossy(&received.body);
        assert!(body.contains("name=\"purpose\""));
        assert!(body.contains("filename=\"in.jsonl\""));
    }

    #[tokio::test]
    async fn missing_file_is_invalid_input() {
        let service = FileService::new(context("http://127.0.0.1:9", Scope::default()));
        let dir = tempfile::tempdir().unwrap();
        let err = service
            .upload_path(dir.path().join("absent.jsonl"), "batch")
            .await
            .unwrap_err();
        assert!(matches!(err, InferenceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn content_and_delete() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/files/file-1/content"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"line\n".to_vec()))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/v1/files/file-1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"id": "file-1", "object": "file", "deleted": true})),
            )
            .mount(&server)
            .await;

        let service = FileService::new(context(&server.uri(), Scope::project("p")));
        assert_eq!(&service.content("file-1").await.unwrap()[..], b"line\n");
        assert!(service.delete("file-1").await.unwrap().deleted);
    }
}
