// ABOUTME: Integration tests for the streaming chat client against a local mock HTTP server.
// ABOUTME: Covers event-stream decoding, reasoning self-healing, stalls and connection retry.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use hostpilot::config::LlmConfig;
use hostpilot::error::AgentError;
use hostpilot::llm::{ChatBackend, ChatClient, reduce_stream};
use futures::StreamExt;
use hostpilot::message::{AgentResponse, Message, StreamingDelta};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn settings(base_url: &str) -> LlmConfig {
    LlmConfig {
        base_url: base_url.to_string(),
        model: "test-model".to_string(),
        api_key: Some("sk-test".to_string()),
        request_timeout_seconds: 5,
        stream_idle_timeout_seconds: 5,
        ..LlmConfig::default()
    }
}

fn client(settings: LlmConfig) -> ChatClient {
    ChatClient::new(Arc::new(settings)).unwrap()
}

fn sse(frames: &[&str]) -> ResponseTemplate {
    let mut body = String::new();
    for frame in frames {
        body.push_str("data: ");
        body.push_str(frame);
        body.push_str("\n\n");
    }
    ResponseTemplate::new(200).set_body_raw(body, "text/event-stream")
}

fn body_has_reasoning(req: &Request) -> bool {
    String::from_utf8_lossy(&req.body).contains("reasoning_content")
}

/// A history whose assistant message carries reasoning, so the healed
/// request differs from the first one.
fn history() -> Vec<Message> {
    vec![
        Message::system("You manage servers."),
        Message::user("disk?"),
        Message::assistant_with_reasoning("40% used.", Some("looked at df".to_string())),
        Message::user("and memory?"),
    ]
}

async fn collect(client: &ChatClient, messages: &[Message]) -> Result<AgentResponse, AgentError> {
    let stream = client.stream_chat(messages, &[]).await?;
    reduce_stream(stream, |_| {}).await
}

#[tokio::test]
async fn content_is_reassembled_from_frames() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(sse(&[
            r#"{"choices":[{"delta":{"reasoning_content":"check df"}}]}"#,
            r#"{"choices":[{"delta":{"content":"Disk "}}]}"#,
            r#"{"choices":[{"delta":{"content":"is fine."}}]}"#,
            "[DONE]",
        ]))
        .expect(1)
        .mount(&server)
        .await;

    let response = collect(&client(settings(&server.uri())), &history()).await.unwrap();
    match response {
        AgentResponse::Text { text, reasoning } => {
            assert_eq!(text, "Disk is fine.");
            assert_eq!(reasoning.as_deref(), Some("check df"));
        }
        other => panic!("expected text, got {:?}", other),
    }
    server.verify().await;
}

#[tokio::test]
async fn tool_call_arguments_are_joined_across_fragments() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(sse(&[
            r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"id":"call_a","function":{"name":"get_system_info","arguments":""}}]}}]}"#,
            r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"function":{"arguments":"{\"categ"}}]}}]}"#,
            r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"function":{"arguments":"ory\":\"disk\"}"}}]}}]}"#,
            "[DONE]",
        ]))
        .mount(&server)
        .await;

    let response = collect(&client(settings(&server.uri())), &history()).await.unwrap();
    match response {
        AgentResponse::ToolCalls { calls, .. } => {
            assert_eq!(calls.len(), 1);
            assert_eq!(calls[0].id, "call_a");
            assert_eq!(calls[0].name, "get_system_info");
            assert_eq!(calls[0].arguments, r#"{"category":"disk"}"#);
        }
        other => panic!("expected tool calls, got {:?}", other),
    }
}

#[tokio::test]
async fn malformed_frame_is_skipped() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(sse(&[
            r#"{"choices":[{"delta":{"content":"before "}}]}"#,
            "{not json",
            r#"{"choices":[{"delta":{"content":"after"}}]}"#,
            "[DONE]",
        ]))
        .mount(&server)
        .await;

    let response = collect(&client(settings(&server.uri())), &history()).await.unwrap();
    assert!(matches!(response, AgentResponse::Text { ref text, .. } if text == "before after"));
}

#[tokio::test]
async fn heals_once_when_reasoning_is_missing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(|req: &Request| !body_has_reasoning(req))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_string(r#"{"error":{"message":"Missing reasoning_content field in assistant message"}}"#),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_has_reasoning)
        .respond_with(sse(&[r#"{"choices":[{"delta":{"content":"ok"}}]}"#, "[DONE]"]))
        .expect(1)
        .mount(&server)
        .await;

    let response = collect(&client(settings(&server.uri())), &history()).await.unwrap();
    assert!(matches!(response, AgentResponse::Text { ref text, .. } if text == "ok"));
    server.verify().await;
}

#[tokio::test]
async fn second_rejection_is_returned_without_another_retry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_string("Missing reasoning_content"))
        .expect(2)
        .mount(&server)
        .await;

    let err = collect(&client(settings(&server.uri())), &history())
        .await
        .unwrap_err();
    assert!(matches!(err, AgentError::Http { status: 400, .. }), "{err}");
    server.verify().await;
}

#[tokio::test]
async fn unrelated_bad_request_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_string("unknown model"))
        .expect(1)
        .mount(&server)
        .await;

    let err = collect(&client(settings(&server.uri())), &history())
        .await
        .unwrap_err();
    match err {
        AgentError::Http { status, body } => {
            assert_eq!(status, 400);
            assert_eq!(body, "unknown model");
        }
        other => panic!("expected http error, got {other}"),
    }
    server.verify().await;
}

#[tokio::test]
async fn server_error_is_not_healed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Missing reasoning_content"))
        .expect(1)
        .mount(&server)
        .await;

    let err = collect(&client(settings(&server.uri())), &history())
        .await
        .unwrap_err();
    assert!(matches!(err, AgentError::Http { status: 500, .. }));
    server.verify().await;
}

#[tokio::test]
async fn stalled_stream_yields_partial_calls_then_one_error() {
    // Sends one tool-call frame, then goes quiet with the body unfinished.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = vec![0u8; 16 * 1024];
        let _ = socket.read(&mut buf).await.unwrap();
        let frame = r#"data: {"choices":[{"delta":{"tool_calls":[{"index":0,"id":"call_a","function":{"name":"get_system_info","arguments":"{\"category\":\"disk\"}"}}]}}]}"#;
        let head = "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nContent-Length: 100000\r\n\r\n";
        socket.write_all(head.as_bytes()).await.unwrap();
        socket.write_all(format!("{frame}\n\n").as_bytes()).await.unwrap();
        socket.flush().await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
    });

    let mut config = settings(&format!("http://{addr}"));
    config.stream_idle_timeout_seconds = 1;
    let stream = client(config).stream_chat(&history(), &[]).await.unwrap();
    let deltas: Vec<StreamingDelta> = stream.collect().await;
    server.abort();

    assert_eq!(deltas.len(), 2, "{deltas:?}");
    match &deltas[0] {
        StreamingDelta::ToolCall(call) => {
            assert_eq!(call.id, "call_a");
            assert_eq!(call.arguments, r#"{"category":"disk"}"#);
        }
        other => panic!("expected tool call, got {:?}", other),
    }
    assert!(matches!(&deltas[1], StreamingDelta::Error(msg) if msg.contains("stalled")));
}

#[tokio::test]
async fn dropped_connection_is_retried_once_then_fails() {
    // Accepts every connection and closes it before answering.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicUsize::new(0));
    let counter = accepted.clone();
    let server = tokio::spawn(async move {
        loop {
            let (mut socket, _) = listener.accept().await.unwrap();
            counter.fetch_add(1, Ordering::SeqCst);
            let mut buf = vec![0u8; 16 * 1024];
            let _ = socket.read(&mut buf).await;
            drop(socket);
        }
    });

    let started = Instant::now();
    let err = collect(&client(settings(&format!("http://{addr}"))), &history())
        .await
        .unwrap_err();
    server.abort();

    assert!(matches!(err, AgentError::Transport(_)), "{err}");
    assert_eq!(accepted.load(Ordering::SeqCst), 2);
    assert!(started.elapsed() >= hostpilot::llm::client::RETRY_DELAY);
}

#[tokio::test]
async fn missing_api_key_fails_before_any_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(sse(&["[DONE]"]))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = settings(&server.uri());
    config.api_key = Some("   ".to_string());
    let err = collect(&client(config), &history()).await.unwrap_err();
    assert!(err.is_configuration());
    server.verify().await;
}
