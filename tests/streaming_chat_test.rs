//! Streaming chat and generation against a mocked inference service.

mod support;

use infera::prelude::*;
use serde_json::json;
use support::{Recorder, client, content_chunk, finish_chunk, sse};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const STREAM_PATH: &str = "/ml/v1/text/chat_stream";

async fn mount_stream(server: &MockServer, body: String) {
    Mock::given(method("POST"))
        .and(path(STREAM_PATH))
        .and(header("authorization", "Bearer test-key"))
        .and(header("accept", "text/event-stream"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .expect(1)
        .mount(server)
        .await;
}

fn request() -> ChatRequest {
    ChatRequest::new(vec![ChatMessage::user("Say hello")]).model("granite")
}

#[tokio::test]
async fn partial_responses_then_completion() {
    let server = MockServer::start().await;
    let body = sse(&[content_chunk("He"), content_chunk("llo"), finish_chunk("stop")]);
    mount_stream(&server, body).await;

    let recorder = Recorder::default();
    let call = client(&server.uri())
        .chat_streaming(&request(), recorder.clone())
        .await
        .unwrap();
    let response = call.await.unwrap();

    assert_eq!(response.content(), Some("Hello"));
    assert_eq!(response.finish_reason(), Some(&FinishReason::Stop));
    assert_eq!(response.usage.as_ref().and_then(|u| u.total_tokens), Some(7));
    assert_eq!(
        recorder.calls(),
        vec!["response:He", "response:llo", "complete:Hello"]
    );
}

fn tool_fragment(id: Option<&str>, name: Option<&str>, arguments: &str) -> serde_json::Value {
    let mut call = json!({"index": 0, "type": "function", "function": {"arguments": arguments}});
    if let Some(id) = id {
        call["id"] = json!(id);
    }
    if let Some(name) = name {
        call["function"]["name"] = json!(name);
    }
    json!({"id": "chat-2", "choices": [{"index": 0, "delta": {"tool_calls": [call]}}]})
}

#[tokio::test]
async fn tool_call_fragments_merge_into_one_call() {
    let server = MockServer::start().await;
    let body = sse(&[
        tool_fragment(Some("call_1"), Some("get_weather"), ""),
        tool_fragment(None, None, "{\"city\":"),
        tool_fragment(None, None, "\"Paris\"}"),
        finish_chunk("tool_calls"),
    ]);
    mount_stream(&server, body).await;

    let recorder = Recorder::default();
    let response = client(&server.uri())
        .chat_streaming(&request(), recorder.clone())
        .await
        .unwrap()
        .await
        .unwrap();

    assert_eq!(
        response.tool_calls(),
        &[ToolCall::function("call_1", "get_weather", "{\"city\":\"Paris\"}")]
    );
    assert_eq!(
        recorder.calls(),
        vec![
            "partial_tool:0:",
            "partial_tool:0:{\"city\":",
            "partial_tool:0:\"Paris\"}",
            "tool:call_1:get_weather:{\"city\":\"Paris\"}",
            "complete:",
        ]
    );
}

#[tokio::test]
async fn streamed_and_plain_chat_agree() {
    let server = MockServer::start().await;
    mount_stream(
        &server,
        sse(&[content_chunk("Hel"), content_chunk("lo!"), finish_chunk("stop")]),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/ml/v1/text/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chat-1",
            "model_id": "granite",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "Hello!"},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 5, "completion_tokens": 2, "total_tokens": 7}
        })))
        .mount(&server)
        .await;

    let client = client(&server.uri());
    let streamed = client
        .chat_streaming(&request(), NoopHandler)
        .await
        .unwrap()
        .await
        .unwrap();
    let plain = client.chat(&request()).await.unwrap();

    assert_eq!(streamed.content(), plain.content());
    assert_eq!(streamed.finish_reason(), plain.finish_reason());
    assert_eq!(streamed.tool_calls(), plain.tool_calls());
    assert_eq!(streamed.usage, plain.usage);
    assert_eq!(streamed.id, plain.id);
}

async fn mount_plain(server: &MockServer, message: serde_json::Value, finish_reason: &str) {
    Mock::given(method("POST"))
        .and(path("/ml/v1/text/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chat-1",
            "choices": [{"index": 0, "message": message, "finish_reason": finish_reason}]
        })))
        .mount(server)
        .await;
}

async fn both_ways(server: &MockServer, request: &ChatRequest) -> (ChatResponse, ChatResponse) {
    let client = client(&server.uri());
    let streamed = client
        .chat_streaming(request, NoopHandler)
        .await
        .unwrap()
        .await
        .unwrap();
    let plain = client.chat(request).await.unwrap();
    (streamed, plain)
}

fn assert_same_reply(streamed: &ChatResponse, plain: &ChatResponse) {
    assert_eq!(streamed.content(), plain.content());
    assert_eq!(streamed.thinking(), plain.thinking());
    assert_eq!(streamed.tool_calls(), plain.tool_calls());
    assert_eq!(streamed.finish_reason(), plain.finish_reason());
}

#[tokio::test]
async fn streamed_and_plain_agree_on_tagged_replies() {
    let server = MockServer::start().await;
    mount_stream(
        &server,
        sse(&[
            content_chunk("<think>the user"),
            content_chunk(" greets</think>Hi"),
            content_chunk(" there"),
            finish_chunk("stop"),
        ]),
    )
    .await;
    mount_plain(
        &server,
        json!({"role": "assistant", "content": "<think>the user greets</think>Hi there"}),
        "stop",
    )
    .await;

    let request = request().extraction_tags(ExtractionTags::think());
    let (streamed, plain) = both_ways(&server, &request).await;

    assert_same_reply(&streamed, &plain);
    assert_eq!(plain.content(), Some("Hi there"));
    assert_eq!(plain.thinking(), Some("the user greets"));
}

#[tokio::test]
async fn streamed_and_plain_agree_when_reply_is_only_thinking() {
    let server = MockServer::start().await;
    mount_stream(
        &server,
        sse(&[content_chunk("<think>only</think>"), finish_chunk("stop")]),
    )
    .await;
    mount_plain(
        &server,
        json!({"role": "assistant", "content": "<think>only</think>"}),
        "stop",
    )
    .await;

    let request = request().extraction_tags(ExtractionTags::think());
    let (streamed, plain) = both_ways(&server, &request).await;

    assert_same_reply(&streamed, &plain);
    assert_eq!(plain.content(), None);
    assert_eq!(plain.thinking(), Some("only"));
}

#[tokio::test]
async fn streamed_and_plain_agree_on_tool_calls() {
    let server = MockServer::start().await;
    mount_stream(
        &server,
        sse(&[
            tool_fragment(Some("call_1"), Some("get_weather"), "{\"city\":"),
            tool_fragment(None, None, "\"Paris\"}"),
            finish_chunk("tool_calls"),
        ]),
    )
    .await;
    mount_plain(
        &server,
        json!({
            "role": "assistant",
            "content": "",
            "tool_calls": [{
                "id": "call_1",
                "type": "function",
                "function": {"name": "get_weather", "arguments": "{\"city\":\"Paris\"}"}
            }]
        }),
        "tool_calls",
    )
    .await;

    let (streamed, plain) = both_ways(&server, &request()).await;

    assert_same_reply(&streamed, &plain);
    assert_eq!(plain.content(), None);
    assert_eq!(
        plain.tool_calls(),
        &[ToolCall::function("call_1", "get_weather", "{\"city\":\"Paris\"}")]
    );
}

#[tokio::test]
async fn thinking_tags_split_across_chunks() {
    let server = MockServer::start().await;
    mount_stream(
        &server,
        sse(&[
            content_chunk("<thi"),
            content_chunk("nk>hello</res"),
            content_chunk("ponse>world"),
            finish_chunk("stop"),
        ]),
    )
    .await;

    let recorder = Recorder::default();
    let request = request().extraction_tags(ExtractionTags::new("think", "response"));
    let response = client(&server.uri())
        .chat_streaming(&request, recorder.clone())
        .await
        .unwrap()
        .await
        .unwrap();

    assert_eq!(response.thinking(), Some("hello"));
    assert_eq!(response.content(), Some("world"));
    assert_eq!(
        recorder.calls(),
        vec!["thinking:hello", "response:world", "complete:world"]
    );
}

#[tokio::test]
async fn error_envelope_in_stream_fails_the_call() {
    let server = MockServer::start().await;
    let envelope = json!({
        "errors": [{"code": "model_overloaded", "message": "try later"}],
        "trace": "abc123",
        "status_code": 503
    });
    mount_stream(&server, sse(&[content_chunk("Hi"), envelope.clone()])).await;

    let recorder = Recorder::default();
    let err = client(&server.uri())
        .chat_streaming(&request(), recorder.clone())
        .await
        .unwrap()
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), Some(503));
    assert_eq!(err.details(), Some(&envelope));
    let calls = recorder.calls();
    assert_eq!(calls[0], "response:Hi");
    assert!(calls[1].starts_with("error:"));
    assert_eq!(calls.len(), 2);
}

#[tokio::test]
async fn rejected_submit_reports_through_handler_and_result() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(STREAM_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "errors": [{"code": "authentication_token_expired", "message": "expired"}],
            "trace": "t",
            "status_code": 401
        })))
        .expect(1)
        .mount(&server)
        .await;

    let recorder = Recorder::default();
    let err = client(&server.uri())
        .chat_streaming(&request(), recorder.clone())
        .await
        .err()
        .unwrap();

    assert!(err.is_token_expired());
    assert_eq!(recorder.calls().len(), 1);
    assert!(recorder.calls()[0].starts_with("error:"));
}

#[tokio::test]
async fn deployment_stream_uses_deployment_path() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ml/v1/deployments/dep-7/text/chat_stream"))
        .and(body_partial_json(json!({"project_id": "proj-1"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(sse(&[content_chunk("ok")]), "text/event-stream"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let request = ChatRequest::new(vec![ChatMessage::user("hi")]).deployment("dep-7");
    let response = client(&server.uri())
        .chat_streaming(&request, NoopHandler)
        .await
        .unwrap()
        .await
        .unwrap();
    assert_eq!(response.content(), Some("ok"));
}

#[tokio::test]
async fn generation_stream_accumulates_text() {
    let server = MockServer::start().await;
    let chunk = |text: &str, count: u32, stop: Option<&str>| {
        json!({
            "model_id": "granite",
            "results": [{
                "generated_text": text,
                "generated_token_count": count,
                "input_token_count": 3,
                "stop_reason": stop.unwrap_or("not_finished")
            }]
        })
    };
    Mock::given(method("POST"))
        .and(path("/ml/v1/text/generation_stream"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            sse(&[chunk("Once", 1, None), chunk(" upon", 2, Some("max_tokens"))]),
            "text/event-stream",
        ))
        .mount(&server)
        .await;

    let recorder = Recorder::default();
    let response = client(&server.uri())
        .generate_streaming(
            &TextGenerationRequest::new("Tell a story").model("granite"),
            recorder.clone(),
        )
        .await
        .unwrap()
        .await
        .unwrap();

    assert_eq!(response.text(), Some("Once upon"));
    assert_eq!(response.stop_reason(), Some("max_tokens"));
    assert_eq!(response.results[0].generated_token_count, Some(2));
    assert_eq!(
        recorder.calls(),
        vec!["response:Once", "response: upon", "complete:Once upon"]
    );
}
