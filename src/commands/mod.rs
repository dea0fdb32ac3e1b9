/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

It exposes three top-level command modules:

- `chat`: interactive conversation
- `ask`: one question, one streamed reply
- `replay`: offline decoding of a captured response body

The handlers are the terminal presentation layer: they own a
`ConversationSession`, drive turns through a `ChatClient`, and render
the session's lifecycle events as they arrive.
*/

use std::io::Write;
use std::sync::Arc;

use colored::Colorize;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::client::{ChatClient, TurnReport};
use crate::config::Config;
use crate::error::{ChatError, ChatResult, Result};
use crate::session::{ConversationSession, Message, Role, TurnEvent};
use crate::transport::http::HttpChatTransport;

pub mod ask;
pub mod chat;
pub mod replay;
pub mod special_commands;

/// Build a client talking HTTP to the configured endpoint
pub fn build_client(config: &Config) -> Result<ChatClient> {
    let transport = HttpChatTransport::new(&config.chat)?;
    Ok(ChatClient::from_config(Arc::new(transport), config))
}

/// Start a session seeded with the configured greeting and language
pub fn new_session(config: &Config) -> ConversationSession {
    let mut session = ConversationSession::with_greeting(config.chat.greeting.clone());
    session.set_language(config.chat.language.clone());
    tracing::info!(session_id = %session.session_id(), "Started conversation session");
    session
}

/// Run one turn, rendering fragments as they stream in
///
/// Ctrl-C during the turn cancels it. On failure the user-facing notice is
/// printed and the error returned.
pub async fn run_turn(
    client: &ChatClient,
    session: &mut ConversationSession,
    text: &str,
) -> ChatResult<TurnReport> {
    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    let renderer = spawn_renderer(session.subscribe());
    let result = client.send_turn(session, text, &cancel).await;
    ctrl_c.abort();

    match &result {
        Ok(_) => {
            let _ = renderer.await;
        }
        Err(e) => {
            // The renderer may still wait for a turn that never started.
            renderer.abort();
            println!();
            print_failure(e);
        }
    }
    result
}

/// Print streamed fragments to stdout until the turn ends
fn spawn_renderer(mut events: broadcast::Receiver<TurnEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut stdout = std::io::stdout();
        loop {
            match events.recv().await {
                Ok(TurnEvent::TurnStarted) => {
                    print!("{} ", "SIMO:".cyan().bold());
                    let _ = stdout.flush();
                }
                Ok(TurnEvent::FragmentApplied { fragment, .. }) => {
                    print!("{}", fragment);
                    let _ = stdout.flush();
                }
                Ok(TurnEvent::TurnCompleted { .. }) | Ok(TurnEvent::TurnFailed) => {
                    println!();
                    break;
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Renderer fell behind the stream");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

/// Print the notice for a failed turn to stderr
pub fn print_failure(err: &ChatError) {
    let notice = err.notice();
    eprintln!(
        "{} {}",
        format!("{}:", notice.title).red().bold(),
        notice.description
    );
}

/// Print a transcript, one message per block
pub fn print_transcript(messages: &[Message]) {
    for message in messages {
        let label = match message.role {
            Role::User => "You:".green().bold(),
            Role::Assistant => "SIMO:".cyan().bold(),
            Role::System => "System:".yellow().bold(),
        };
        println!("{} {}\n", label, message.content);
    }
}
