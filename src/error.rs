//! Error types for SIMO chat
//!
//! This module defines the error taxonomy of a chat turn, using `thiserror`
//! for ergonomic error handling. Decode-level problems never appear here:
//! the frame decoder recovers from them internally.

use thiserror::Error;

/// Main error type for SIMO chat operations
///
/// Covers conversation-session misuse, transport-classified failures of a
/// turn, and the configuration/IO errors of the surrounding application.
#[derive(Error, Debug)]
pub enum ChatError {
    /// A conversation session invariant was violated by the caller
    #[error("Invalid session state: {0}")]
    InvalidState(String),

    /// The endpoint answered HTTP 429
    #[error("Rate limited: {body}")]
    RateLimited {
        /// Response body text returned with the 429
        body: String,
    },

    /// The endpoint answered HTTP 402
    #[error("Payment required: {body}")]
    PaymentRequired {
        /// Response body text returned with the 402
        body: String,
    },

    /// Any other non-success status, or a request that never got a status
    ///
    /// `status` is `0` when the request failed before a response arrived
    /// (connection refused, DNS failure, TLS error).
    #[error("HTTP {status}: {body}")]
    Transport {
        /// HTTP status code, or 0 when no response was received
        status: u16,
        /// Response body text or the underlying request error
        body: String,
    },

    /// The response did not carry the streamed body it should have
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// No bytes arrived within the configured idle window
    #[error("No data received for {seconds}s")]
    IdleTimeout {
        /// The idle window that elapsed
        seconds: u64,
    },

    /// The hosting context cancelled the turn
    #[error("Turn cancelled")]
    Cancelled,

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// User-facing notification raised when a turn fails
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Short headline
    pub title: String,
    /// Sentence shown under the headline
    pub description: String,
}

impl ChatError {
    /// Returns true for failures classified from the HTTP exchange
    pub fn is_transport_failure(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. }
                | Self::PaymentRequired { .. }
                | Self::Transport { .. }
                | Self::Protocol(_)
                | Self::IdleTimeout { .. }
        )
    }

    /// Map the error to the notice shown to the person chatting
    ///
    /// Rate limiting and payment failures get their own wording; everything
    /// else carries the underlying detail.
    ///
    /// # Examples
    ///
    /// ```
    /// use simo_chat::error::ChatError;
    ///
    /// let notice = ChatError::RateLimited { body: String::new() }.notice();
    /// assert_eq!(notice.title, "High Demand");
    /// ```
    pub fn notice(&self) -> Notice {
        match self {
            Self::RateLimited { .. } => Notice {
                title: "High Demand".to_string(),
                description:
                    "Our AI assistant is experiencing high demand. Please try again in a moment."
                        .to_string(),
            },
            Self::PaymentRequired { .. } => Notice {
                title: "Service Unavailable".to_string(),
                description: "AI service temporarily unavailable. Please contact us directly."
                    .to_string(),
            },
            Self::Cancelled => Notice {
                title: "Cancelled".to_string(),
                description: "The reply was cancelled before it finished.".to_string(),
            },
            other => {
                let detail = other.to_string();
                Notice {
                    title: "Error".to_string(),
                    description: if detail.trim().is_empty() {
                        "Failed to send message. Please try again.".to_string()
                    } else {
                        detail
                    },
                }
            }
        }
    }
}

/// Result type alias for the application layer
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation in the binary
/// and configuration code.
pub type Result<T> = anyhow::Result<T>;

/// Result type alias for the chat core, which reports typed failures
pub type ChatResult<T> = std::result::Result<T, ChatError>;
