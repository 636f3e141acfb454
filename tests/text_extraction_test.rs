//! Text extraction workflow with an in-memory object store.

use async_trait::async_trait;
use bytes::Bytes;
use infera::prelude::*;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct MemoryStorage {
    objects: Mutex<HashMap<(String, String), Bytes>>,
}

impl MemoryStorage {
    fn contains(&self, bucket: &str, key: &str) -> bool {
        self.objects
            .lock()
            .unwrap()
            .contains_key(&(bucket.to_string(), key.to_string()))
    }

    fn insert(&self, bucket: &str, key: &str, content: &'static str) {
        self.objects.lock().unwrap().insert(
            (bucket.to_string(), key.to_string()),
            Bytes::from_static(content.as_bytes()),
        );
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn put(&self, bucket: &str, key: &str, content: Bytes) -> Result<(), InferenceError> {
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), content);
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes, InferenceError> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| InferenceError::StorageError(format!("{bucket}/{key} not found")))
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<(), InferenceError> {
        self.objects
            .lock()
            .unwrap()
            .remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }
}

fn extraction_job(status: &str) -> serde_json::Value {
    json!({
        "metadata": {"id": "te-1", "project_id": "proj-1", "created_at": "2025-01-01T00:00:00Z"},
        "entity": {
            "document_reference": {"type": "connection_asset", "connection": {"id": "conn"}, "location": {"bucket": "docs", "file_name": "report.pdf"}},
            "results_reference": {"type": "connection_asset", "connection": {"id": "conn"}, "location": {"bucket": "docs", "file_name": "report.md"}},
            "results": {"status": status, "number_pages_processed": 2}
        }
    })
}

fn request() -> TextExtractionRequest {
    TextExtractionRequest::new(
        DataReference::connection_asset("conn", "docs", "report.pdf"),
        DataReference::connection_asset("conn", "docs", "report.md"),
    )
    .parameters(TextExtractionParameters {
        requested_outputs: vec!["md".into()],
        ..Default::default()
    })
}

fn client(server: &MockServer, storage: Arc<MemoryStorage>) -> InferenceClient {
    let config = ClientConfig::builder()
        .base_url(server.uri())
        .api_key("test-key")
        .project_id("proj-1")
        .poll_interval(Duration::from_millis(10))
        .build()
        .unwrap();
    InferenceClient::builder(config)
        .object_storage(storage)
        .build()
        .unwrap()
}

#[tokio::test]
async fn waits_reads_text_and_cleans_up() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ml/v1/text/extractions"))
        .and(body_partial_json(json!({
            "project_id": "proj-1",
            "document_reference": {"location": {"file_name": "report.pdf"}},
            "parameters": {"requested_outputs": ["md"]}
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(extraction_job("submitted")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ml/v1/text/extractions/te-1"))
        .and(query_param("project_id", "proj-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(extraction_job("running")))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ml/v1/text/extractions/te-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(extraction_job("completed")))
        .mount(&server)
        .await;

    let storage = Arc::new(MemoryStorage::default());
    storage.insert("docs", "report.md", "# Report\nAll good.");
    let options = ExtractTextOptions {
        remove_output_file: true,
        remove_upload: true,
        ..Default::default()
    };
    let outcome = client(&server, Arc::clone(&storage))
        .extract_text(Bytes::from_static(b"%PDF-1.7"), &request(), &options)
        .await
        .unwrap();

    match outcome {
        ExtractTextOutcome::Completed { job, text } => {
            assert_eq!(job.id(), "te-1");
            assert_eq!(text, "# Report\nAll good.");
        }
        other => panic!("expected completion, got {other:?}"),
    }
    assert!(!storage.contains("docs", "report.pdf"));
    assert!(!storage.contains("docs", "report.md"));
}

#[tokio::test]
async fn submit_only_returns_job_and_keeps_upload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ml/v1/text/extractions"))
        .respond_with(ResponseTemplate::new(201).set_body_json(extraction_job("submitted")))
        .expect(1)
        .mount(&server)
        .await;

    let storage = Arc::new(MemoryStorage::default());
    let options = ExtractTextOptions {
        wait_for_completion: false,
        ..Default::default()
    };
    let outcome = client(&server, Arc::clone(&storage))
        .extract_text(Bytes::from_static(b"%PDF"), &request(), &options)
        .await
        .unwrap();

    assert!(matches!(outcome, ExtractTextOutcome::Submitted(ref job) if job.id() == "te-1"));
    assert!(storage.contains("docs", "report.pdf"));
}

#[tokio::test]
async fn remove_output_without_waiting_is_misuse() {
    let server = MockServer::start().await;
    let storage = Arc::new(MemoryStorage::default());
    let options = ExtractTextOptions {
        wait_for_completion: false,
        remove_output_file: true,
        ..Default::default()
    };
    let err = client(&server, Arc::clone(&storage))
        .extract_text(Bytes::from_static(b"%PDF"), &request(), &options)
        .await
        .unwrap_err();

    assert!(matches!(err, InferenceError::InvalidInput(_)));
    assert!(!storage.contains("docs", "report.pdf"));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn failed_extraction_reports_remote_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ml/v1/text/extractions"))
        .respond_with(ResponseTemplate::new(201).set_body_json(extraction_job("submitted")))
        .mount(&server)
        .await;
    let mut failed = extraction_job("failed");
    failed["entity"]["results"]["error"] = json!({"code": "unsupported_format", "message": "not a PDF"});
    Mock::given(method("GET"))
        .and(path("/ml/v1/text/extractions/te-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(failed))
        .mount(&server)
        .await;

    let storage = Arc::new(MemoryStorage::default());
    let options = ExtractTextOptions {
        remove_upload: true,
        ..Default::default()
    };
    let err = client(&server, Arc::clone(&storage))
        .extract_text(Bytes::from_static(b"nope"), &request(), &options)
        .await
        .unwrap_err();

    match &err {
        InferenceError::OperationFailed { resource, status, details } => {
            assert_eq!(resource, "report.pdf");
            assert_eq!(status, "failed");
            assert_eq!(details.as_ref().unwrap()["code"], "unsupported_format");
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(!storage.contains("docs", "report.pdf"));
}

#[tokio::test]
async fn list_and_delete_jobs() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ml/v1/text/extractions"))
        .and(query_param("limit", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_count": 1,
            "resources": [extraction_job("completed")]
        })))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/ml/v1/text/extractions/te-1"))
        .and(query_param("hard_delete", "true"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let service = client(&server, Arc::new(MemoryStorage::default())).text_extraction();
    let scope = Scope::default();
    let list = service.list(Some(5), &scope).await.unwrap();
    assert_eq!(list.resources.len(), 1);
    service.delete("te-1", true, &scope).await.unwrap();
}
