//! Scripted in-process transport for unit tests
//!
//! [`FakeTransport`] pops one [`FakeResponse`] per `send` and records every
//! request it was given, so tests can drive [`crate::client::ChatClient`]
//! without a network.
//!
//! ```text
//! client send() --> requests (test inspects)
//! responses queue --> ByteStream / error handed back to the client
//! ```

use std::collections::VecDeque;
use std::sync::Mutex;

use bytes::Bytes;
use futures::StreamExt;
use tokio::sync::mpsc;

use crate::error::{ChatError, ChatResult};
use crate::session::SessionId;
use crate::transport::{ByteStream, ChatRequest, ChatTransport};

/// What the fake answers to one `send`
#[derive(Debug)]
pub enum FakeResponse {
    /// A body delivered as these chunks, then closed
    Chunks(Vec<Bytes>),
    /// A body that yields these chunks and then fails mid-read
    ChunksThenError(Vec<Bytes>, ChatError),
    /// A body fed by the test through a channel; closes when the sender drops
    Channel(mpsc::UnboundedReceiver<Bytes>),
    /// A classified failure
    Error(ChatError),
    /// The status never arrives
    Hang,
}

impl FakeResponse {
    /// Body made of the given text chunks
    pub fn chunks<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Chunks(
            chunks
                .into_iter()
                .map(|c| Bytes::from(c.into().into_bytes()))
                .collect(),
        )
    }
}

/// Scripted transport
#[derive(Debug, Default)]
pub struct FakeTransport {
    responses: Mutex<VecDeque<FakeResponse>>,
    requests: Mutex<Vec<(ChatRequest, SessionId)>>,
}

impl FakeTransport {
    /// Create a fake answering with `responses` in order
    pub fn new(responses: impl IntoIterator<Item = FakeResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every request sent so far
    pub fn requests(&self) -> Vec<(ChatRequest, SessionId)> {
        self.requests
            .lock()
            .expect("FakeTransport: requests lock poisoned")
            .clone()
    }
}

#[async_trait::async_trait]
impl ChatTransport for FakeTransport {
    async fn send(
        &self,
        request: &ChatRequest,
        session_id: &SessionId,
    ) -> ChatResult<ByteStream> {
        self.requests
            .lock()
            .expect("FakeTransport: requests lock poisoned")
            .push((request.clone(), session_id.clone()));

        let next = self
            .responses
            .lock()
            .expect("FakeTransport: responses lock poisoned")
            .pop_front()
            .expect("FakeTransport: no scripted response left");

        match next {
            FakeResponse::Chunks(chunks) => Ok(Box::pin(futures::stream::iter(
                chunks.into_iter().map(Ok::<Bytes, ChatError>),
            ))),
            FakeResponse::ChunksThenError(chunks, err) => Ok(Box::pin(
                futures::stream::iter(chunks.into_iter().map(Ok::<Bytes, ChatError>))
                    .chain(futures::stream::once(async move { Err(err) })),
            )),
            FakeResponse::Channel(rx) => Ok(Box::pin(futures::stream::unfold(rx, |mut rx| async move {
                let chunk = rx.recv().await?;
                Some((Ok::<Bytes, ChatError>(chunk), rx))
            }))),
            FakeResponse::Error(err) => Err(err),
            FakeResponse::Hang => futures::future::pending::<ChatResult<ByteStream>>().await,
        }
    }
}
