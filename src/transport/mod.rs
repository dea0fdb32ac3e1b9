//! Chat transport abstraction and implementations
//!
//! This module defines the [`ChatTransport`] trait that performs the network
//! call of one conversational turn. Concrete implementations live in
//! submodules:
//!
//! - [`http::HttpChatTransport`]: POSTs the history to the chat endpoint
//!   with `reqwest` and hands back the unread response body.
//! - `fake::FakeTransport`: scripted in-process fake used in tests
//!   (cfg(test) only).
//!
//! # Design
//!
//! A transport only sends and classifies. It never buffers the body, never
//! retries, and never touches the conversation session: decoding and
//! recovery belong to [`crate::client::ChatClient`].

use std::fmt;
use std::pin::Pin;

use bytes::Bytes;
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::error::{ChatError, ChatResult};
use crate::session::{Message, SessionId};

pub mod http;

#[cfg(test)]
pub mod fake;

/// Response body of a successful request, read chunk by chunk
pub type ByteStream = Pin<Box<dyn Stream<Item = ChatResult<Bytes>> + Send>>;

/// JSON body of a chat request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Ordered history to send, oldest first
    pub messages: Vec<Message>,
}

impl ChatRequest {
    /// Build a request from wire messages
    pub fn new(messages: Vec<Message>) -> Self {
        Self { messages }
    }
}

/// Lifecycle of a single request
///
/// `Idle -> Sending -> {StreamingSuccess | RateLimited | PaymentRequired |
/// TransportError | ProtocolError}`, and `StreamingSuccess -> Complete`.
/// There is no retry transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    /// Nothing sent yet
    Idle,
    /// Waiting for the response status
    Sending,
    /// Reading the response body
    StreamingSuccess,
    /// HTTP 429
    RateLimited,
    /// HTTP 402
    PaymentRequired,
    /// Other non-success status or failed request
    TransportError,
    /// Response lacked the expected body
    ProtocolError,
    /// Body fully consumed
    Complete,
}

impl RequestState {
    /// Terminal state a failed request ends in
    pub fn from_error(err: &ChatError) -> Self {
        match err {
            ChatError::RateLimited { .. } => Self::RateLimited,
            ChatError::PaymentRequired { .. } => Self::PaymentRequired,
            ChatError::Protocol(_) => Self::ProtocolError,
            _ => Self::TransportError,
        }
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Sending => "sending",
            Self::StreamingSuccess => "streaming",
            Self::RateLimited => "rate_limited",
            Self::PaymentRequired => "payment_required",
            Self::TransportError => "transport_error",
            Self::ProtocolError => "protocol_error",
            Self::Complete => "complete",
        };
        f.write_str(name)
    }
}

/// Classify a non-success HTTP status
///
/// # Examples
///
/// ```
/// use simo_chat::error::ChatError;
/// use simo_chat::transport::classify_status;
///
/// assert!(matches!(classify_status(429, String::new()), ChatError::RateLimited { .. }));
/// assert!(matches!(classify_status(500, String::new()), ChatError::Transport { status: 500, .. }));
/// ```
pub fn classify_status(status: u16, body: String) -> ChatError {
    match status {
        429 => ChatError::RateLimited { body },
        402 => ChatError::PaymentRequired { body },
        _ => ChatError::Transport { status, body },
    }
}

/// Abstraction over the network call of one turn
///
/// # Examples
///
/// ```no_run
/// use simo_chat::transport::ChatTransport;
///
/// // Implementations are created via their own constructors; this trait is
/// // used polymorphically through `Arc<dyn ChatTransport>`.
/// ```
#[async_trait::async_trait]
pub trait ChatTransport: Send + Sync + fmt::Debug {
    /// Send `request` tagged with `session_id` and return the unread body
    ///
    /// # Errors
    ///
    /// - [`ChatError::RateLimited`] on HTTP 429
    /// - [`ChatError::PaymentRequired`] on HTTP 402
    /// - [`ChatError::Transport`] on any other non-success status or when
    ///   the request fails before a status arrives
    /// - [`ChatError::Protocol`] when a success response has no body
    async fn send(&self, request: &ChatRequest, session_id: &SessionId)
        -> ChatResult<ByteStream>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_status() {
        assert!(matches!(
            classify_status(429, "busy".into()),
            ChatError::RateLimited { body } if body == "busy"
        ));
        assert!(matches!(
            classify_status(402, String::new()),
            ChatError::PaymentRequired { .. }
        ));
        assert!(matches!(
            classify_status(401, "nope".into()),
            ChatError::Transport { status: 401, body } if body == "nope"
        ));
    }

    #[test]
    fn test_request_state_from_error() {
        assert_eq!(
            RequestState::from_error(&ChatError::RateLimited {
                body: String::new()
            }),
            RequestState::RateLimited
        );
        assert_eq!(
            RequestState::from_error(&ChatError::Protocol("x".into())),
            RequestState::ProtocolError
        );
        assert_eq!(
            RequestState::from_error(&ChatError::IdleTimeout { seconds: 1 }),
            RequestState::TransportError
        );
    }

    #[test]
    fn test_chat_request_wire_shape() {
        let request = ChatRequest::new(vec![Message::user("hi")]);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"messages": [{"role": "user", "content": "hi"}]})
        );
    }
}
