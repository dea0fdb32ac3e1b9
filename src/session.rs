//! Conversation session: ordered history with a single in-flight reply
//!
//! The session owns every message of a conversation and is the only place
//! the history is mutated. At most one assistant message is "in flight"
//! (still receiving fragments) at a time, and no user message may be added
//! while one is.
//!
//! Presentation layers observe the session through [`TurnEvent`]s obtained
//! from [`ConversationSession::subscribe`] and read the history through
//! [`ConversationSession::snapshot`].

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::error::{ChatError, ChatResult};

/// Capacity of the lifecycle event channel; slow subscribers lag rather
/// than block the turn.
const EVENT_CAPACITY: usize = 256;

/// Greeting the SIMO widget opens every conversation with
pub const DEFAULT_GREETING: &str = "Hello, I'm SIMO — Structured Insights for Meaningful Outcomes.\nI aim to provide clear, accurate, and reliable guidance on AI governance and compliance, based on available information and established frameworks. I am continually learning and may occasionally misunderstand or make errors.\nPlease review my responses carefully and consult a qualified human professional whenever needed.\n\nHow can I assist you today?";

/// Role of the message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person chatting
    User,
    /// The remote assistant
    Assistant,
    /// Synthetic instructions added by the client
    System,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::System => write!(f, "system"),
        }
    }
}

/// A single conversation message, serialized in the wire shape
/// `{"role": ..., "content": ...}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender
    pub role: Role,
    /// Text of the message
    pub content: String,
}

impl Message {
    /// Creates a new user message
    ///
    /// # Examples
    ///
    /// ```
    /// use simo_chat::session::{Message, Role};
    ///
    /// let msg = Message::user("Hello");
    /// assert_eq!(msg.role, Role::User);
    /// ```
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Creates a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    /// Creates a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// Opaque identifier correlating every request of one session
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh random identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Borrow the identifier as text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Lifecycle signal emitted by a session as a turn progresses
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnEvent {
    /// An empty assistant message was appended and is now in flight
    TurnStarted,
    /// A fragment was appended; `content` is the full in-flight text so far
    FragmentApplied {
        /// The fragment just applied
        fragment: String,
        /// Accumulated content of the in-flight message
        content: String,
    },
    /// The in-flight message became immutable history
    TurnCompleted {
        /// Final content of the reply
        content: String,
    },
    /// The in-flight message was removed after a failure
    TurnFailed,
}

/// Ordered conversation history plus the in-flight marker
///
/// # Examples
///
/// ```
/// use simo_chat::session::ConversationSession;
///
/// let mut session = ConversationSession::new();
/// session.append_user_turn("What is the EU AI Act?").unwrap();
/// session.begin_assistant_turn().unwrap();
/// session.append_to_in_flight("It is a regulation").unwrap();
/// session.complete_in_flight().unwrap();
/// assert_eq!(session.snapshot().len(), 2);
/// ```
#[derive(Debug)]
pub struct ConversationSession {
    id: SessionId,
    history: Vec<Message>,
    in_flight: Option<usize>,
    greeting: Option<String>,
    language: String,
    events: broadcast::Sender<TurnEvent>,
}

impl ConversationSession {
    /// Creates an empty session with a fresh identifier
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            id: SessionId::new(),
            history: Vec::new(),
            in_flight: None,
            greeting: None,
            language: "en".to_string(),
            events,
        }
    }

    /// Creates a session whose history opens with an assistant greeting
    ///
    /// The greeting is shown to the user but not sent on the first request;
    /// see [`ConversationSession::request_messages`].
    pub fn with_greeting(greeting: impl Into<String>) -> Self {
        let greeting = greeting.into();
        let mut session = Self::new();
        session.history.push(Message::assistant(greeting.clone()));
        session.greeting = Some(greeting);
        session
    }

    /// Replace the generated identifier
    pub fn with_session_id(mut self, id: SessionId) -> Self {
        self.id = id;
        self
    }

    /// Stable identifier sent with every request of this session
    pub fn session_id(&self) -> &SessionId {
        &self.id
    }

    /// Preferred language announced on the first request
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Change the preferred language
    pub fn set_language(&mut self, language: impl Into<String>) {
        self.language = language.into();
    }

    /// Whether an assistant reply is currently being built
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Number of messages in the history
    pub fn len(&self) -> usize {
        self.history.len()
    }

    /// Whether the history is empty
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Subscribe to lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<TurnEvent> {
        self.events.subscribe()
    }

    /// Append a user message
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::InvalidState`] while an assistant turn is in flight.
    pub fn append_user_turn(&mut self, text: impl Into<String>) -> ChatResult<()> {
        if self.in_flight.is_some() {
            return Err(invalid_state(
                "cannot append a user turn while an assistant turn is in flight",
            ));
        }
        self.history.push(Message::user(text));
        Ok(())
    }

    /// Append an empty assistant message and mark it in flight
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::InvalidState`] if a turn is already in flight.
    pub fn begin_assistant_turn(&mut self) -> ChatResult<()> {
        if self.in_flight.is_some() {
            return Err(invalid_state("an assistant turn is already in flight"));
        }
        self.history.push(Message::assistant(String::new()));
        self.in_flight = Some(self.history.len() - 1);
        self.emit(TurnEvent::TurnStarted);
        Ok(())
    }

    /// Concatenate `fragment` onto the in-flight message
    ///
    /// Returns the accumulated content after the append.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::InvalidState`] if no turn is in flight.
    pub fn append_to_in_flight(&mut self, fragment: &str) -> ChatResult<&str> {
        let index = self
            .in_flight
            .ok_or_else(|| invalid_state("no assistant turn is in flight"))?;
        let message = &mut self.history[index];
        message.content.push_str(fragment);
        let _ = self.events.send(TurnEvent::FragmentApplied {
            fragment: fragment.to_string(),
            content: message.content.clone(),
        });
        Ok(&self.history[index].content)
    }

    /// Finalize the in-flight message
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::InvalidState`] if no turn is in flight.
    pub fn complete_in_flight(&mut self) -> ChatResult<&Message> {
        let index = self
            .in_flight
            .take()
            .ok_or_else(|| invalid_state("no assistant turn is in flight to complete"))?;
        self.emit(TurnEvent::TurnCompleted {
            content: self.history[index].content.clone(),
        });
        Ok(&self.history[index])
    }

    /// Remove the in-flight message from the history
    ///
    /// Returns the removed message, or `None` when nothing was in flight.
    pub fn discard_in_flight(&mut self) -> Option<Message> {
        let index = self.in_flight.take()?;
        let removed = self.history.remove(index);
        self.emit(TurnEvent::TurnFailed);
        Some(removed)
    }

    /// Owned, ordered copy of the history
    pub fn snapshot(&self) -> Vec<Message> {
        self.history.clone()
    }

    /// Messages to send for the current turn
    ///
    /// When the history holds only the greeting and the newest user turn,
    /// the greeting is replaced by a system message naming the preferred
    /// language. Otherwise the full history is sent. An in-flight message is
    /// never included.
    pub fn request_messages(&self) -> Vec<Message> {
        let settled = match self.in_flight {
            Some(index) => &self.history[..index],
            None => &self.history[..],
        };

        if let (Some(greeting), [first, last]) = (&self.greeting, settled) {
            if first.role == Role::Assistant
                && &first.content == greeting
                && last.role == Role::User
            {
                return vec![
                    Message::system(format!("User's preferred language: {}", self.language)),
                    last.clone(),
                ];
            }
        }

        settled.to_vec()
    }

    fn emit(&self, event: TurnEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

impl Default for ConversationSession {
    fn default() -> Self {
        Self::new()
    }
}

fn invalid_state(reason: &str) -> ChatError {
    tracing::error!("Conversation session misuse: {}", reason);
    ChatError::InvalidState(reason.to_string())
}
