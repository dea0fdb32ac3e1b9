//! HTTP transport for the streaming chat endpoint
//!
//! [`HttpChatTransport`] POSTs `{"messages": [...]}` to the configured
//! endpoint and returns the response body as an unread byte stream as soon
//! as the status line and headers arrive.
//!
//! # Headers
//!
//! Every request carries:
//!
//! - `Content-Type: application/json`
//! - `apikey: <key>` and `Authorization: Bearer <key>` when a key is
//!   configured (the hosted function accepts the publishable key in both)
//! - `<session header>: <session id>`, `x-session-id` by default, so the
//!   server can correlate every request of a conversation
//!
//! # Status handling
//!
//! - `2xx` with a body: streamed back to the caller.
//! - `204`/`205` or `Content-Length: 0`: [`ChatError::Protocol`].
//! - `429`: [`ChatError::RateLimited`].
//! - `402`: [`ChatError::PaymentRequired`].
//! - anything else: [`ChatError::Transport`] with the status and body text.
//!
//! No request is ever retried.

use std::time::Duration;

use futures::StreamExt;
use reqwest::Client;

use crate::config::ChatConfig;
use crate::error::{ChatError, ChatResult};
use crate::session::SessionId;
use crate::transport::{classify_status, ByteStream, ChatRequest, ChatTransport};

/// User agent sent with every request
const USER_AGENT: &str = concat!("simo-chat/", env!("CARGO_PKG_VERSION"));

/// Streaming HTTP transport
///
/// # Examples
///
/// ```
/// use simo_chat::config::ChatConfig;
/// use simo_chat::transport::http::HttpChatTransport;
///
/// let config = ChatConfig {
///     endpoint: "http://localhost:54321/functions/v1/asimov-chat".to_string(),
///     ..Default::default()
/// };
/// let transport = HttpChatTransport::new(&config);
/// assert!(transport.is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct HttpChatTransport {
    /// Underlying reqwest HTTP client.
    client: Client,
    /// Chat endpoint URL (POST target).
    endpoint: url::Url,
    /// Key sent as `apikey` and bearer token.
    api_key: Option<String>,
    /// Name of the session-correlation header.
    session_header: String,
}

impl HttpChatTransport {
    /// Create a transport from the chat configuration
    ///
    /// Only the connect phase is bounded here; reading the body is bounded
    /// by the caller's idle timeout, since a whole-request timeout would cut
    /// long replies short.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Config`] if the endpoint is not a valid URL or the
    /// HTTP client cannot be built.
    pub fn new(config: &ChatConfig) -> ChatResult<Self> {
        let endpoint = url::Url::parse(&config.endpoint).map_err(|e| {
            ChatError::Config(format!("Invalid chat endpoint '{}': {}", config.endpoint, e))
        })?;

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ChatError::Config(format!("Failed to create HTTP client: {}", e)))?;

        tracing::info!("Initialized chat transport: endpoint={}", endpoint);

        Ok(Self {
            client,
            endpoint,
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            session_header: config.session_header.clone(),
        })
    }

    /// The endpoint requests are sent to
    pub fn endpoint(&self) -> &url::Url {
        &self.endpoint
    }
}

#[async_trait::async_trait]
impl ChatTransport for HttpChatTransport {
    async fn send(
        &self,
        request: &ChatRequest,
        session_id: &SessionId,
    ) -> ChatResult<ByteStream> {
        let mut req = self
            .client
            .post(self.endpoint.as_str())
            .header(self.session_header.as_str(), session_id.as_str())
            .json(request);

        if let Some(key) = &self.api_key {
            req = req
                .header("apikey", key.as_str())
                .header("Authorization", format!("Bearer {}", key));
        }

        tracing::debug!(
            session_id = %session_id,
            messages = request.messages.len(),
            "Sending chat request"
        );

        let response = req.send().await.map_err(|e| {
            tracing::error!("Chat request failed: {}", e);
            ChatError::Transport {
                status: 0,
                body: format!("request failed: {}", e),
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Chat endpoint returned error {}: {}", status, body);
            return Err(classify_status(status.as_u16(), body));
        }

        if status == reqwest::StatusCode::NO_CONTENT
            || status == reqwest::StatusCode::RESET_CONTENT
            || response.content_length() == Some(0)
        {
            tracing::error!("Chat endpoint returned {} without a body", status);
            return Err(ChatError::Protocol("No response body".to_string()));
        }

        let code = status.as_u16();
        let body = response.bytes_stream().map(move |chunk| {
            chunk.map_err(|e| ChatError::Transport {
                status: code,
                body: format!("failed to read response body: {}", e),
            })
        });
        Ok(Box::pin(body))
    }
}
