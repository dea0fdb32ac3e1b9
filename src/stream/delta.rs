//! Extraction of text fragments from decoded frames

use serde_json::Value;

use crate::error::ChatResult;
use crate::session::ConversationSession;

/// Text carried by a single frame, if any
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// A non-empty increment of the assistant reply
    Text(String),
    /// The frame carried no usable text
    Absent,
}

/// Read `choices[0].delta.content` from a completion chunk
///
/// Anything other than a non-empty string at that path is [`Fragment::Absent`].
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use simo_chat::stream::{extract_fragment, Fragment};
///
/// let chunk = json!({"choices": [{"delta": {"content": "Hi"}}]});
/// assert_eq!(extract_fragment(&chunk), Fragment::Text("Hi".to_string()));
/// assert_eq!(extract_fragment(&json!({"choices": []})), Fragment::Absent);
/// ```
pub fn extract_fragment(value: &Value) -> Fragment {
    match value
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("delta"))
        .and_then(|delta| delta.get("content"))
        .and_then(Value::as_str)
    {
        Some(text) if !text.is_empty() => Fragment::Text(text.to_string()),
        _ => Fragment::Absent,
    }
}

/// Folds fragments into the in-flight assistant message of a session
///
/// Holds no state: everything it reads and writes goes through the session.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeltaAccumulator;

impl DeltaAccumulator {
    /// Apply one decoded frame payload to `session`
    ///
    /// Returns `true` when a fragment was appended.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::ChatError::InvalidState`] when the frame
    /// carries text but no assistant turn is in flight.
    pub fn apply(&self, session: &mut ConversationSession, payload: &Value) -> ChatResult<bool> {
        match extract_fragment(payload) {
            Fragment::Text(text) => {
                session.append_to_in_flight(&text)?;
                Ok(true)
            }
            Fragment::Absent => {
                tracing::trace!("Frame carried no content fragment");
                Ok(false)
            }
        }
    }
}
