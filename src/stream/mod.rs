//! Decoding of streamed chat-completion responses
//!
//! - [`decoder`] turns response bytes into [`Frame`]s.
//! - [`delta`] pulls the text fragment out of each frame and applies it to a
//!   conversation session.

pub mod decoder;
pub mod delta;

pub use decoder::{Frame, FrameDecoder, RetryState, DEFAULT_MAX_PENDING_BYTES, MAX_RETRY_LINES};
pub use delta::{extract_fragment, DeltaAccumulator, Fragment};
