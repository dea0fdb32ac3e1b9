//! SIMO chat - streaming chat transport client library
//!
//! This library provides the client side of the SIMO assistant: it keeps an
//! ordered conversation, sends it to the chat endpoint, and folds the
//! streamed `data:` reply into the conversation as it arrives.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `session`: Conversation history, in-flight reply and lifecycle events
//! - `stream`: Chunk-boundary-independent frame decoding and delta accumulation
//! - `transport`: Request/response seam and the HTTP implementation
//! - `client`: Turn driver with cancellation and idle timeout
//! - `config`: Configuration management and validation
//! - `error`: Error types, result aliases and user-facing notices
//! - `cli`, `commands`: Command-line interface and its handlers
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use simo_chat::{ChatClient, Config, ConversationSession};
//! use simo_chat::transport::http::HttpChatTransport;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     config.validate()?;
//!
//!     let transport = HttpChatTransport::new(&config.chat)?;
//!     let client = ChatClient::from_config(Arc::new(transport), &config);
//!     let mut session = ConversationSession::with_greeting(config.chat.greeting.clone());
//!
//!     let report = client
//!         .send_turn(&mut session, "What is ISO 42001?", &CancellationToken::new())
//!         .await?;
//!     println!("{}", report.content);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod session;
pub mod stream;
pub mod transport;

// Re-export commonly used types
pub use client::{ChatClient, TurnReport};
pub use config::Config;
pub use error::{ChatError, ChatResult, Notice, Result};
pub use session::{ConversationSession, Message, Role, SessionId, TurnEvent};
pub use stream::{DeltaAccumulator, Frame, FrameDecoder};
pub use transport::{ChatRequest, ChatTransport, RequestState};
