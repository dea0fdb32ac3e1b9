//! Offline replay of a captured response body.
//!
//! Feeds a saved `data:` stream through the same decoder and accumulator
//! the live client uses, in fixed-size chunks, and prints the assembled
//! reply. Useful for checking that a capture decodes identically however
//! the network happened to split it.

use std::path::Path;

use anyhow::Context;

use crate::config::Config;
use crate::error::{ChatResult, Result};
use crate::session::ConversationSession;
use crate::stream::{DeltaAccumulator, Frame, FrameDecoder};

/// Outcome of replaying a capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replay {
    /// Assembled reply text
    pub content: String,
    /// Fragments applied
    pub fragments: usize,
    /// Whether `[DONE]` was seen
    pub terminated: bool,
}

/// Decode `body` in chunks of `chunk_size` bytes
///
/// A `chunk_size` of zero is treated as one.
pub fn replay_bytes(body: &[u8], chunk_size: usize, max_pending_bytes: usize) -> ChatResult<Replay> {
    let mut decoder = FrameDecoder::with_max_pending_bytes(max_pending_bytes);
    let accumulator = DeltaAccumulator;
    let mut session = ConversationSession::new();
    session.begin_assistant_turn()?;

    let mut fragments = 0;
    let mut terminated = false;
    for chunk in body.chunks(chunk_size.max(1)) {
        for frame in decoder.feed(chunk) {
            match frame {
                Frame::Data(payload) => {
                    if accumulator.apply(&mut session, &payload)? {
                        fragments += 1;
                    }
                }
                Frame::Done => terminated = true,
            }
        }
        if terminated {
            break;
        }
    }

    if !terminated {
        for frame in decoder.finish() {
            if let Frame::Data(payload) = frame {
                if accumulator.apply(&mut session, &payload)? {
                    fragments += 1;
                }
            }
        }
    }

    let content = session.complete_in_flight()?.content.clone();
    Ok(Replay {
        content,
        fragments,
        terminated,
    })
}

/// Replay the capture at `file` and print the reply
pub fn run_replay(config: &Config, file: &Path, chunk_size: usize) -> Result<()> {
    let body = std::fs::read(file)
        .with_context(|| format!("Failed to read capture {}", file.display()))?;

    let replay = replay_bytes(&body, chunk_size, config.stream.max_pending_bytes)?;
    tracing::info!(
        bytes = body.len(),
        chunk_size,
        fragments = replay.fragments,
        terminated = replay.terminated,
        "Replayed capture"
    );
    println!("{}", replay.content);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::DEFAULT_MAX_PENDING_BYTES;

    const CAPTURE: &str = concat!(
        ": keep-alive\n",
        "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"Bonjour \"}}]}\r\n",
        "\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"à vous\"}}]}\n",
        "data: [DONE]\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"ignored\"}}]}\n",
    );

    #[test]
    fn test_replay_is_independent_of_chunk_size() {
        for chunk_size in [1, 2, 3, 7, 64, 4096] {
            let replay =
                replay_bytes(CAPTURE.as_bytes(), chunk_size, DEFAULT_MAX_PENDING_BYTES).unwrap();
            assert_eq!(replay.content, "Bonjour à vous", "chunk size {}", chunk_size);
            assert_eq!(replay.fragments, 2);
            assert!(replay.terminated);
        }
    }

    #[test]
    fn test_replay_without_done_flushes_tail() {
        let body = "data: {\"choices\":[{\"delta\":{\"content\":\"tail\"}}]}";
        let replay = replay_bytes(body.as_bytes(), 5, DEFAULT_MAX_PENDING_BYTES).unwrap();
        assert_eq!(replay.content, "tail");
        assert!(!replay.terminated);
    }

    #[test]
    fn test_replay_zero_chunk_size() {
        let replay = replay_bytes(CAPTURE.as_bytes(), 0, DEFAULT_MAX_PENDING_BYTES).unwrap();
        assert_eq!(replay.content, "Bonjour à vous");
    }

    #[test]
    fn test_replay_survives_broken_lines_and_oversized_line() {
        let mut body = "data: {\n".repeat(400);
        body.push_str(&format!("data: {}\n", "x".repeat(DEFAULT_MAX_PENDING_BYTES)));
        body.push_str("data: {\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\n");
        body.push_str("data: [DONE]\n");

        let replay = replay_bytes(body.as_bytes(), 16 * 1024, DEFAULT_MAX_PENDING_BYTES).unwrap();
        assert_eq!(replay.content, "ok");
        assert_eq!(replay.fragments, 1);
        assert!(replay.terminated);
    }

    #[test]
    fn test_run_replay_missing_file() {
        let config = Config::default();
        let err = run_replay(&config, Path::new("/nonexistent/capture.sse"), 16).unwrap_err();
        assert!(err.to_string().contains("Failed to read capture"));
    }
}
