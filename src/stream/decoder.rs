//! Line-oriented frame decoder for streamed chat completions
//!
//! The endpoint streams newline-delimited records of the form
//! `data: <json>`, closed by `data: [DONE]`. Lines that are blank or start
//! with `:` are keep-alives. [`FrameDecoder`] turns arbitrary byte chunks
//! into [`Frame`]s, independent of where the chunk boundaries fall:
//!
//! - incomplete UTF-8 sequences at the end of a chunk are carried into the
//!   next one;
//! - text after the last newline waits in the pending buffer;
//! - a `data:` line whose JSON does not parse enters the buffered-retry
//!   state ([`RetryState`]): following lines are joined onto it and the
//!   joined text is re-parsed until it succeeds, the stream ends, or the
//!   retained text would outgrow the buffer bound (or [`MAX_RETRY_LINES`]).
//!   An abandoned retry decodes its retained lines one by one and the
//!   decoder carries on with the line that did not fit;
//! - a line longer than the buffer bound is dropped, whether it arrives in
//!   one chunk or many.
//!
//! Nothing the decoder sees is ever reported as an error. Unparseable
//! leftovers are dropped during the final best-effort pass in
//! [`FrameDecoder::finish`].

use serde_json::Value;

/// Prefix of a payload-carrying line
pub const DATA_PREFIX: &str = "data: ";

/// Prefix of a comment (keep-alive) line
pub const COMMENT_PREFIX: char = ':';

/// Payload that terminates the stream
pub const DONE_SENTINEL: &str = "[DONE]";

/// Default bound on a single line and on retained retry text
pub const DEFAULT_MAX_PENDING_BYTES: usize = 1024 * 1024;

/// Most lines a retry may join before it is abandoned
pub const MAX_RETRY_LINES: usize = 64;

/// One decoded record of the response stream
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// A parsed JSON payload
    Data(Value),
    /// The terminator sentinel was received
    Done,
}

/// Classification of a single complete line
#[derive(Debug, PartialEq, Eq)]
enum Line<'a> {
    Ignored,
    Done,
    Payload(&'a str),
}

fn classify(line: &str) -> Line<'_> {
    if line.trim().is_empty() || line.starts_with(COMMENT_PREFIX) {
        return Line::Ignored;
    }
    let Some(rest) = line.strip_prefix(DATA_PREFIX) else {
        return Line::Ignored;
    };
    let payload = rest.trim();
    if payload == DONE_SENTINEL {
        Line::Done
    } else {
        Line::Payload(payload)
    }
}

/// A `data:` line that failed to parse, plus every line received since
///
/// `payload` is the text re-parsed on each new line: the original payload
/// joined with the raw following lines by `\n`. `lines` keeps the raw lines
/// so they can be replayed or decoded one by one later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryState {
    payload: String,
    lines: Vec<String>,
    bytes: usize,
}

impl RetryState {
    fn new(line: &str, payload: &str) -> Self {
        Self {
            payload: payload.to_string(),
            lines: vec![line.to_string()],
            bytes: line.len(),
        }
    }

    /// Join `line` onto the retained payload and try to parse the result
    fn retry_with(&mut self, line: &str) -> Option<Value> {
        self.payload.push('\n');
        self.payload.push_str(line);
        self.lines.push(line.to_string());
        self.bytes += line.len() + 1;
        serde_json::from_str(self.payload.trim()).ok()
    }

    /// Bytes of raw text retained
    pub fn retained_bytes(&self) -> usize {
        self.bytes
    }

    /// Number of raw lines retained
    pub fn retained_lines(&self) -> usize {
        self.lines.len()
    }
}

/// Incremental decoder from response bytes to [`Frame`]s
///
/// # Examples
///
/// ```
/// use simo_chat::stream::{Frame, FrameDecoder};
///
/// let mut decoder = FrameDecoder::new();
/// assert!(decoder.feed(b"data: {\"choices\":[{\"delta\":{\"content\":\"Hel").is_empty());
/// let frames = decoder.feed(b"lo\"}}]}\ndata: [DONE]\n");
/// assert_eq!(frames.len(), 2);
/// assert_eq!(frames[1], Frame::Done);
/// ```
#[derive(Debug)]
pub struct FrameDecoder {
    utf8_tail: Vec<u8>,
    pending: String,
    retry: Option<RetryState>,
    discarding_line: bool,
    done: bool,
    max_pending_bytes: usize,
}

impl FrameDecoder {
    /// Creates a decoder with the default buffer bound
    pub fn new() -> Self {
        Self::with_max_pending_bytes(DEFAULT_MAX_PENDING_BYTES)
    }

    /// Creates a decoder bounding each line and the retained retry text to
    /// `max` bytes
    pub fn with_max_pending_bytes(max: usize) -> Self {
        Self {
            utf8_tail: Vec::new(),
            pending: String::new(),
            retry: None,
            discarding_line: false,
            done: false,
            max_pending_bytes: max.max(1),
        }
    }

    /// Whether the stream is over (terminator seen or [`finish`](Self::finish) called)
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Whether a failed line is waiting for more bytes
    pub fn is_retrying(&self) -> bool {
        self.retry.is_some()
    }

    /// The buffered-retry state, if any
    pub fn retry_state(&self) -> Option<&RetryState> {
        self.retry.as_ref()
    }

    /// Bytes of text waiting for a newline
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Decode one chunk of the response body
    ///
    /// Returns the frames completed by this chunk, in order. Once a
    /// [`Frame::Done`] has been returned every later call returns nothing.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Frame> {
        let mut frames = Vec::new();
        if self.done || chunk.is_empty() {
            return frames;
        }

        let text = self.decode_utf8(chunk);
        self.push_text(&text, &mut frames);
        frames
    }

    /// Best-effort pass over whatever is left when the body ends without a
    /// terminator
    ///
    /// Retained retry lines and the pending tail are decoded line by line;
    /// lines that still do not parse are dropped. The decoder is done
    /// afterwards.
    pub fn finish(&mut self) -> Vec<Frame> {
        let mut frames = Vec::new();
        if self.done {
            return frames;
        }
        self.done = true;

        if !self.utf8_tail.is_empty() {
            let tail = std::mem::take(&mut self.utf8_tail);
            self.pending.push_str(&String::from_utf8_lossy(&tail));
        }
        if self.discarding_line {
            self.pending.clear();
        }

        let mut lines = self.retry.take().map(|r| r.lines).unwrap_or_default();
        let pending = std::mem::take(&mut self.pending);
        if !pending.trim().is_empty() {
            lines.extend(pending.split('\n').map(str::to_string));
        }

        if !lines.is_empty() {
            tracing::debug!(lines = lines.len(), "Final pass over unterminated stream tail");
        }
        best_effort(&lines, &mut frames);
        frames
    }

    fn decode_utf8(&mut self, chunk: &[u8]) -> String {
        let mut bytes = std::mem::take(&mut self.utf8_tail);
        bytes.extend_from_slice(chunk);

        let mut out = String::with_capacity(bytes.len());
        let mut input = &bytes[..];
        loop {
            match std::str::from_utf8(input) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                }
                Err(err) => {
                    let (valid, rest) = input.split_at(err.valid_up_to());
                    out.push_str(std::str::from_utf8(valid).unwrap_or_default());
                    match err.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            input = &rest[len..];
                        }
                        None => {
                            // Incomplete sequence; wait for the next chunk.
                            self.utf8_tail = rest.to_vec();
                            break;
                        }
                    }
                }
            }
        }
        out
    }

    fn push_text(&mut self, mut text: &str, frames: &mut Vec<Frame>) {
        if self.discarding_line {
            match text.find('\n') {
                Some(pos) => {
                    self.discarding_line = false;
                    text = &text[pos + 1..];
                }
                None => return,
            }
        }
        self.pending.push_str(text);

        if let Some(last) = self.pending.rfind('\n') {
            let rest = self.pending.split_off(last + 1);
            let complete = std::mem::replace(&mut self.pending, rest);
            for raw in complete[..last].split('\n') {
                self.process_line(raw, frames);
                if self.done {
                    self.pending.clear();
                    return;
                }
            }
        }

        if self.pending.len() > self.max_pending_bytes {
            tracing::warn!(
                bytes = self.pending.len(),
                limit = self.max_pending_bytes,
                "Dropping unterminated line that exceeds the stream buffer bound"
            );
            self.pending.clear();
            self.discarding_line = true;
        }
    }

    fn process_line(&mut self, raw: &str, frames: &mut Vec<Frame>) {
        // Same rule as the unterminated tail in `push_text`, so a long line
        // is dropped whether it arrives whole or in pieces.
        if raw.len() > self.max_pending_bytes {
            tracing::warn!(
                bytes = raw.len(),
                limit = self.max_pending_bytes,
                "Dropping line that exceeds the stream buffer bound"
            );
            return;
        }
        let line = raw.strip_suffix('\r').unwrap_or(raw);

        if let Some(retry) = self.retry.as_mut() {
            if classify(line) == Line::Done {
                self.release_retry(frames);
                frames.push(Frame::Done);
                self.done = true;
                return;
            }
            let over_bound = retry.retained_bytes() + line.len() + 1 > self.max_pending_bytes
                || retry.retained_lines() >= MAX_RETRY_LINES;
            if !over_bound {
                if let Some(value) = retry.retry_with(line) {
                    tracing::debug!(
                        lines = retry.retained_lines(),
                        "Recovered frame split across lines"
                    );
                    self.retry = None;
                    frames.push(Frame::Data(value));
                }
                return;
            }
            tracing::warn!(
                bytes = retry.retained_bytes(),
                lines = retry.retained_lines(),
                limit = self.max_pending_bytes,
                "Abandoning unparseable frame at the stream buffer bound"
            );
            self.release_retry(frames);
        }

        match classify(line) {
            Line::Ignored => {}
            Line::Done => {
                frames.push(Frame::Done);
                self.done = true;
            }
            Line::Payload(payload) => match serde_json::from_str(payload) {
                Ok(value) => frames.push(Frame::Data(value)),
                Err(e) => {
                    tracing::debug!("Frame payload incomplete, retrying with more input: {}", e);
                    self.retry = Some(RetryState::new(line, payload));
                }
            },
        }
    }

    /// End the retry, decoding each retained line on its own
    fn release_retry(&mut self, frames: &mut Vec<Frame>) {
        if let Some(state) = self.retry.take() {
            best_effort(&state.lines, frames);
        }
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode `lines` independently, skipping anything that does not parse
fn best_effort(lines: &[String], frames: &mut Vec<Frame>) {
    for raw in lines {
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        if let Line::Payload(payload) = classify(line) {
            if let Ok(value) = serde_json::from_str(payload) {
                frames.push(Frame::Data(value));
            }
        }
    }
}
