//! Interactive chat loop.

use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::commands::special_commands::{parse_special_command, print_help, SpecialCommand};
use crate::commands::{build_client, new_session, print_transcript, run_turn};
use crate::config::Config;
use crate::error::{ChatError, Result};
use crate::session::Role;

/// Start an interactive conversation
///
/// Reads lines with rustyline until `/exit`, Ctrl-D or Ctrl-C at the
/// prompt. A transport failure or a cancelled reply prints its notice and
/// the loop carries on with the question kept in the transcript; any other
/// failure ends the chat.
pub async fn run_chat(config: Config) -> Result<()> {
    let client = build_client(&config)?;
    let mut session = new_session(&config);
    let mut rl = DefaultEditor::new()?;

    print_transcript(&session.snapshot());
    println!("Type '/help' for commands.\n");

    loop {
        let line = match rl.readline(&prompt(session.language())) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                println!("Goodbye!");
                break;
            }
            Err(e) => {
                tracing::error!("Readline error: {}", e);
                break;
            }
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(trimmed);

        match parse_special_command(trimmed) {
            Ok(SpecialCommand::None) => {}
            Ok(SpecialCommand::Exit) => {
                println!("Goodbye!");
                break;
            }
            Ok(SpecialCommand::Help) => {
                print_help();
                continue;
            }
            Ok(SpecialCommand::History) => {
                print_transcript(&session.snapshot());
                continue;
            }
            Ok(SpecialCommand::Session) => {
                println!("Session: {}", session.session_id());
                continue;
            }
            Ok(SpecialCommand::Language(language)) => {
                if has_asked(&session.snapshot()) {
                    println!(
                        "{}",
                        "The language can only be changed before your first question."
                            .yellow()
                    );
                } else {
                    println!("Preferred language set to {}", language.bold());
                    session.set_language(language);
                }
                continue;
            }
            Err(e) => {
                eprintln!("{}", e.to_string().red());
                continue;
            }
        }

        match run_turn(&client, &mut session, trimmed).await {
            Ok(report) => {
                tracing::debug!(
                    fragments = report.fragments,
                    terminated = report.terminated,
                    "Turn completed"
                );
            }
            Err(e) if keeps_chatting(&e) => {
                tracing::debug!("Turn failed, waiting for the next question: {}", e);
            }
            Err(e) => {
                tracing::error!("Session rejected the turn: {}", e);
                return Err(e.into());
            }
        }
    }

    Ok(())
}

fn prompt(language: &str) -> String {
    format!("[{}] >> ", language)
}

/// Failures the person can recover from by asking again
fn keeps_chatting(err: &ChatError) -> bool {
    err.is_transport_failure() || matches!(err, ChatError::Cancelled)
}

fn has_asked(history: &[crate::session::Message]) -> bool {
    history.iter().any(|m| m.role == Role::User)
}
