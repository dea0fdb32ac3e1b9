//! Turn driver: one request, one streamed reply
//!
//! [`ChatClient`] runs a conversational turn end to end:
//!
//! 1. append the user message to the session;
//! 2. send the history through a [`ChatTransport`];
//! 3. open an in-flight assistant message and feed every body chunk through
//!    a [`FrameDecoder`] and the [`DeltaAccumulator`];
//! 4. complete the message on `[DONE]` or end of body.
//!
//! Waiting for the status and waiting for each chunk both observe a
//! [`CancellationToken`] and an idle timeout. Any failure discards the
//! in-flight message before it is reported, so the session never keeps a
//! half-written reply. Failures are reported once and never retried.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::{ChatError, ChatResult};
use crate::session::ConversationSession;
use crate::stream::{DeltaAccumulator, Frame, FrameDecoder, DEFAULT_MAX_PENDING_BYTES};
use crate::transport::{ByteStream, ChatRequest, ChatTransport, RequestState};

/// Default idle window for the status and for each body chunk
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Summary of a completed turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnReport {
    /// Final content of the assistant reply
    pub content: String,
    /// Number of fragments applied
    pub fragments: usize,
    /// Whether the stream ended with `[DONE]` rather than end of body
    pub terminated: bool,
    /// Final request state, always [`RequestState::Complete`]
    pub state: RequestState,
}

/// Drives turns against a transport
#[derive(Debug, Clone)]
pub struct ChatClient {
    transport: Arc<dyn ChatTransport>,
    idle_timeout: Duration,
    max_pending_bytes: usize,
    accumulator: DeltaAccumulator,
}

impl ChatClient {
    /// Create a client with default limits
    pub fn new(transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            transport,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            max_pending_bytes: DEFAULT_MAX_PENDING_BYTES,
            accumulator: DeltaAccumulator,
        }
    }

    /// Create a client with the limits from `config`
    pub fn from_config(transport: Arc<dyn ChatTransport>, config: &Config) -> Self {
        Self::new(transport)
            .with_idle_timeout(Duration::from_secs(config.chat.idle_timeout_seconds))
            .with_max_pending_bytes(config.stream.max_pending_bytes)
    }

    /// Set the idle window
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Set the decoder buffer bound
    pub fn with_max_pending_bytes(mut self, max: usize) -> Self {
        self.max_pending_bytes = max;
        self
    }

    /// Append `text` as a user turn and stream the reply into `session`
    ///
    /// # Errors
    ///
    /// - [`ChatError::InvalidState`] if a turn is already in flight
    /// - any transport failure, [`ChatError::IdleTimeout`] or
    ///   [`ChatError::Cancelled`]; the in-flight reply has been discarded
    ///   and the user message stays in the history
    pub async fn send_turn(
        &self,
        session: &mut ConversationSession,
        text: &str,
        cancel: &CancellationToken,
    ) -> ChatResult<TurnReport> {
        session.append_user_turn(text)?;
        self.stream_reply(session, cancel).await
    }

    /// Request and stream an assistant reply to the current history
    pub async fn stream_reply(
        &self,
        session: &mut ConversationSession,
        cancel: &CancellationToken,
    ) -> ChatResult<TurnReport> {
        if session.is_in_flight() {
            return Err(ChatError::InvalidState(
                "an assistant turn is already in flight".to_string(),
            ));
        }

        let request = ChatRequest::new(session.request_messages());
        tracing::debug!(
            session_id = %session.session_id(),
            state = %RequestState::Sending,
            messages = request.messages.len(),
            "Starting turn"
        );

        let body = match self.open(&request, session, cancel).await {
            Ok(body) => body,
            Err(e) => {
                self.report_failure(&e);
                return Err(e);
            }
        };

        session.begin_assistant_turn()?;
        tracing::debug!(state = %RequestState::StreamingSuccess, "Streaming reply");

        match self.pump(session, body, cancel).await {
            Ok((fragments, terminated)) => {
                let reply = session.complete_in_flight()?;
                tracing::debug!(
                    state = %RequestState::Complete,
                    fragments,
                    terminated,
                    chars = reply.content.chars().count(),
                    "Turn complete"
                );
                Ok(TurnReport {
                    content: reply.content.clone(),
                    fragments,
                    terminated,
                    state: RequestState::Complete,
                })
            }
            Err(e) => {
                session.discard_in_flight();
                self.report_failure(&e);
                Err(e)
            }
        }
    }

    async fn open(
        &self,
        request: &ChatRequest,
        session: &ConversationSession,
        cancel: &CancellationToken,
    ) -> ChatResult<ByteStream> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ChatError::Cancelled),
            sent = tokio::time::timeout(
                self.idle_timeout,
                self.transport.send(request, session.session_id()),
            ) => match sent {
                Ok(result) => result,
                Err(_) => Err(ChatError::IdleTimeout {
                    seconds: self.idle_timeout.as_secs(),
                }),
            },
        }
    }

    /// Read the body until `[DONE]` or end of stream
    ///
    /// Returns the number of fragments applied and whether `[DONE]` was seen.
    /// Dropping `body` on return releases the connection.
    async fn pump(
        &self,
        session: &mut ConversationSession,
        mut body: ByteStream,
        cancel: &CancellationToken,
    ) -> ChatResult<(usize, bool)> {
        let mut decoder = FrameDecoder::with_max_pending_bytes(self.max_pending_bytes);
        let mut fragments = 0;
        let mut terminated = false;

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ChatError::Cancelled),
                next = tokio::time::timeout(self.idle_timeout, body.next()) => next,
            };

            let frames = match next {
                Err(_) => {
                    return Err(ChatError::IdleTimeout {
                        seconds: self.idle_timeout.as_secs(),
                    })
                }
                Ok(Some(Err(e))) => return Err(e),
                Ok(Some(Ok(chunk))) => decoder.feed(&chunk),
                Ok(None) => decoder.finish(),
            };

            for frame in frames {
                match frame {
                    Frame::Data(payload) => {
                        if self.accumulator.apply(session, &payload)? {
                            fragments += 1;
                        }
                    }
                    Frame::Done => terminated = true,
                }
            }

            if decoder.is_done() {
                return Ok((fragments, terminated));
            }
        }
    }

    fn report_failure(&self, err: &ChatError) {
        match err {
            ChatError::Cancelled => tracing::info!("Turn cancelled"),
            other => tracing::warn!(
                state = %RequestState::from_error(other),
                "Turn failed: {}",
                other
            ),
        }
    }
}
