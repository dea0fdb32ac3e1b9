//! HTTP chat transport integration tests
//!
//! Runs `HttpChatTransport` against a `wiremock` server. Streamed bodies use
//! `set_body_raw(bytes, "text/event-stream")` so the content type is kept.

mod common;

use futures::StreamExt;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use simo_chat::error::ChatError;
use simo_chat::session::{Message, SessionId};
use simo_chat::transport::{ByteStream, ChatRequest, ChatTransport};

use common::{make_transport, sse_body};

const CHAT_PATH: &str = "/functions/v1/asimov-chat";

fn endpoint(server: &MockServer) -> String {
    format!("{}{}", server.uri(), CHAT_PATH)
}

fn request() -> ChatRequest {
    ChatRequest::new(vec![
        Message::system("User's preferred language: en"),
        Message::user("What is the EU AI Act?"),
    ])
}

async fn collect(mut body: ByteStream) -> Vec<u8> {
    let mut out = Vec::new();
    while let Some(chunk) = body.next().await {
        out.extend_from_slice(&chunk.expect("chunk should be readable"));
    }
    out
}

#[tokio::test]
async fn test_sends_headers_and_message_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .and(header("x-session-id", "session-123"))
        .and(header("apikey", "anon-key"))
        .and(header("authorization", "Bearer anon-key"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({
            "messages": [
                { "role": "system", "content": "User's preferred language: en" },
                { "role": "user", "content": "What is the EU AI Act?" }
            ]
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(sse_body(&["Hi"]).into_bytes(), "text/event-stream"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let transport = make_transport(&endpoint(&server), Some("anon-key"));
    let session_id = SessionId::from("session-123".to_string());
    let body = transport
        .send(&request(), &session_id)
        .await
        .expect("send should succeed");

    assert_eq!(collect(body).await, sse_body(&["Hi"]).into_bytes());
}

#[tokio::test]
async fn test_no_key_sends_no_auth_headers() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(header("apikey", "anon-key"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(sse_body(&["ok"]).into_bytes(), "text/event-stream"),
        )
        .mount(&server)
        .await;

    let transport = make_transport(&endpoint(&server), None);
    let body = transport
        .send(&request(), &SessionId::new())
        .await
        .expect("send should succeed");
    assert!(!collect(body).await.is_empty());
}

#[tokio::test]
async fn test_429_is_rate_limited() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .mount(&server)
        .await;

    let transport = make_transport(&endpoint(&server), None);
    let err = transport
        .send(&request(), &SessionId::new())
        .await
        .err()
        .expect("429 should fail");

    assert!(matches!(err, ChatError::RateLimited { ref body } if body == "slow down"));
    assert_eq!(err.notice().title, "High Demand");
}

#[tokio::test]
async fn test_402_is_payment_required() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(402).set_body_string("credits exhausted"))
        .mount(&server)
        .await;

    let transport = make_transport(&endpoint(&server), None);
    let err = transport
        .send(&request(), &SessionId::new())
        .await
        .err()
        .expect("402 should fail");

    assert!(matches!(err, ChatError::PaymentRequired { .. }));
    assert_eq!(err.notice().title, "Service Unavailable");
}

#[tokio::test]
async fn test_other_status_carries_body_text() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let transport = make_transport(&endpoint(&server), None);
    let err = transport
        .send(&request(), &SessionId::new())
        .await
        .err()
        .expect("500 should fail");

    match err {
        ChatError::Transport { status, ref body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "upstream exploded");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(err.notice().description.contains("upstream exploded"));
}

#[tokio::test]
async fn test_success_without_body_is_protocol_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let transport = make_transport(&endpoint(&server), None);
    let err = transport
        .send(&request(), &SessionId::new())
        .await
        .err()
        .expect("empty body should fail");

    assert!(matches!(err, ChatError::Protocol(_)));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_transport_failure() {
    // Bind then drop a server so the port is very likely closed.
    let uri = {
        let server = MockServer::start().await;
        endpoint(&server)
    };

    let transport = make_transport(&uri, None);
    let err = transport
        .send(&request(), &SessionId::new())
        .await
        .err()
        .expect("connection should fail");

    assert!(matches!(err, ChatError::Transport { status: 0, .. }));
    assert!(err.is_transport_failure());
}
