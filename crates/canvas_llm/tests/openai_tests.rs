//! OpenAiCompatProvider against a mock chat-completions endpoint

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::RwLock;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use canvas_core::{Canvas, Position, Role};
use canvas_llm::{
    ChatTurn, InferenceError, InferenceProvider, OpenAiCompatProvider, TurnOutcome, TurnRunner,
};

fn network_tests_disabled() -> bool {
    std::env::var_os("CODEX_SANDBOX_NETWORK_DISABLED").is_some()
}

const SSE_BODY: &str = concat!(
    "data: {\"id\":\"c1\",\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\"}}]}\n\n",
    "data: {\"id\":\"c1\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"Hello\"}}]}\n\n",
    "data: {\"id\":\"c1\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\" there\"}}]}\n\n",
    "data: {\"id\":\"c1\",\"choices\":[{\"index\":0,\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n",
    "data: [DONE]\n\n",
);

async fn mount_completions(server: &MockServer, template: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer gsk_test"))
        .respond_with(template)
        .mount(server)
        .await;
}

fn sse(body: &'static str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/event-stream")
        .set_body_string(body)
}

#[tokio::test]
async fn test_stream_yields_content_deltas() {
    if network_tests_disabled() {
        return;
    }
    let server = MockServer::start().await;
    mount_completions(&server, sse(SSE_BODY)).await;

    let provider = OpenAiCompatProvider::new(server.uri()).with_api_key("gsk_test");
    let history = vec![ChatTurn {
        role: Role::User,
        content: "hi".to_string(),
    }];
    let stream = provider
        .chat_stream(&history, "llama-3.3-70b-versatile")
        .await
        .unwrap();
    let deltas: Vec<String> = stream.map(|d| d.expect("delta")).collect().await;

    assert_eq!(deltas, vec!["Hello", " there"]);

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["model"], "llama-3.3-70b-versatile");
    assert_eq!(body["stream"], true);
}

async fn collect_deltas(server: &MockServer) -> Vec<Result<String, InferenceError>> {
    let provider = OpenAiCompatProvider::new(server.uri()).with_api_key("gsk_test");
    let stream = provider
        .chat_stream(&[], "llama-3.3-70b-versatile")
        .await
        .unwrap();
    stream.collect().await
}

#[tokio::test]
async fn test_stream_ends_at_done_marker() {
    if network_tests_disabled() {
        return;
    }
    let server = MockServer::start().await;
    mount_completions(
        &server,
        sse(concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"kept\"}}]}\n\n",
            "data: [DONE]\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"dropped\"}}]}\n\n",
        )),
    )
    .await;

    let deltas: Vec<String> = collect_deltas(&server)
        .await
        .into_iter()
        .map(|d| d.expect("delta"))
        .collect();
    assert_eq!(deltas, vec!["kept"]);
}

#[tokio::test]
async fn test_unreadable_chunk_is_stream_error() {
    if network_tests_disabled() {
        return;
    }
    let server = MockServer::start().await;
    mount_completions(
        &server,
        sse(concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
            "data: {not json\n\n",
        )),
    )
    .await;

    let items = collect_deltas(&server).await;
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].as_ref().expect("delta"), "Hel");
    match &items[1] {
        Err(InferenceError::Stream(msg)) => assert!(msg.contains("JSON")),
        other => panic!("expected stream error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_non_success_status_is_api_error() {
    if network_tests_disabled() {
        return;
    }
    let server = MockServer::start().await;
    mount_completions(
        &server,
        ResponseTemplate::new(429).set_body_string("rate limited"),
    )
    .await;

    let provider = OpenAiCompatProvider::new(server.uri()).with_api_key("gsk_test");
    let result = provider.chat_stream(&[], "llama-3.3-70b-versatile").await;

    match result {
        Err(InferenceError::Api(msg)) => {
            assert!(msg.contains("429"));
            assert!(msg.contains("rate limited"));
        }
        Err(other) => panic!("expected API error, got {other:?}"),
        Ok(_) => panic!("expected API error, got a stream"),
    }
}

#[tokio::test]
async fn test_runner_end_to_end() {
    if network_tests_disabled() {
        return;
    }
    let server = MockServer::start().await;
    mount_completions(&server, sse(SSE_BODY)).await;

    let mut canvas = Canvas::default();
    let root = canvas.create_root(Position::default()).unwrap();
    let canvas = Arc::new(RwLock::new(canvas));
    let provider = Arc::new(OpenAiCompatProvider::new(server.uri()).with_api_key("gsk_test"));
    let runner = TurnRunner::new(canvas.clone(), provider);

    let outcome = runner.run(&root, "hi").await.unwrap();

    assert!(matches!(outcome, TurnOutcome::Completed { ref content, .. } if content == "Hello there"));
    let transcript = canvas.read().await.transcript(&root).unwrap();
    assert_eq!(transcript, "USER: hi\n\nASSISTANT: Hello there");
}

#[tokio::test]
async fn test_runner_keeps_user_message_when_request_fails() {
    if network_tests_disabled() {
        return;
    }
    let server = MockServer::start().await;
    mount_completions(&server, ResponseTemplate::new(500).set_body_string("boom")).await;

    let mut canvas = Canvas::default();
    let root = canvas.create_root(Position::default()).unwrap();
    let canvas = Arc::new(RwLock::new(canvas));
    let provider = Arc::new(OpenAiCompatProvider::new(server.uri()).with_api_key("gsk_test"));
    let runner = TurnRunner::new(canvas.clone(), provider);

    let result = runner.run(&root, "hi").await;

    assert!(matches!(result, Err(InferenceError::Api(_))));
    let guard = canvas.read().await;
    assert_eq!(guard.node(&root).unwrap().messages.len(), 1);
}
