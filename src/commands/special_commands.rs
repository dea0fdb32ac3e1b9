//! Special commands parser for interactive chat
//!
//! Special commands are prefixed with `/` and are case-insensitive
//! (arguments keep their case). They act on the local session instead of
//! being sent to the assistant:
//! - Show the transcript or the session identifier
//! - Choose the preferred language before the first question
//! - Display help information
//! - Exit the session

use thiserror::Error;

/// Errors that can occur when parsing special commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown command was entered
    #[error("Unknown command: {0}\n\nType '/help' to see available commands")]
    UnknownCommand(String),

    /// Command requires an argument but none was provided
    #[error("Command {command} requires an argument\n\nUsage: {usage}")]
    MissingArgument { command: String, usage: String },
}

/// Special commands that can be executed during interactive chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialCommand {
    /// Print the conversation so far
    History,

    /// Print the session identifier sent with every request
    Session,

    /// Set the preferred language
    ///
    /// Only honoured before the first question, when it is announced to the
    /// assistant.
    Language(String),

    /// Display help information
    Help,

    /// Exit the interactive session
    Exit,

    /// Not a special command
    ///
    /// The input should be sent to the assistant.
    None,
}

/// Parse a line of user input
///
/// # Examples
///
/// ```
/// use simo_chat::commands::special_commands::{parse_special_command, SpecialCommand};
///
/// assert_eq!(parse_special_command("/quit").unwrap(), SpecialCommand::Exit);
/// assert_eq!(
///     parse_special_command("/language fr").unwrap(),
///     SpecialCommand::Language("fr".to_string())
/// );
/// assert_eq!(parse_special_command("hello").unwrap(), SpecialCommand::None);
/// ```
pub fn parse_special_command(input: &str) -> Result<SpecialCommand, CommandError> {
    let trimmed = input.trim();
    let lower = trimmed.to_lowercase();

    // If input doesn't start with "/", it's not a command (except exit/quit)
    if !trimmed.starts_with('/') && lower != "exit" && lower != "quit" {
        return Ok(SpecialCommand::None);
    }

    match lower.as_str() {
        "/history" | "/transcript" => Ok(SpecialCommand::History),
        "/session" => Ok(SpecialCommand::Session),
        "/help" | "/?" => Ok(SpecialCommand::Help),
        "/exit" | "/quit" | "exit" | "quit" => Ok(SpecialCommand::Exit),

        "/language" | "/lang" => Err(CommandError::MissingArgument {
            command: "/language".to_string(),
            usage: "/language <code>".to_string(),
        }),
        input if input.starts_with("/language ") || input.starts_with("/lang ") => {
            let arg = trimmed
                .split_once(' ')
                .map(|(_, rest)| rest.trim())
                .unwrap_or_default();
            Ok(SpecialCommand::Language(arg.to_string()))
        }

        _ => Err(CommandError::UnknownCommand(trimmed.to_string())),
    }
}

/// Print help for the special commands
pub fn print_help() {
    println!(
        r#"
Special Commands for Interactive Chat
=====================================

  /history        - Show the conversation so far
  /session        - Show the session identifier
  /language <code>- Set your preferred language (before your first question)
  /help           - Show this help
  /exit, /quit    - Leave the chat

Press Ctrl-C while a reply is streaming to cancel it.
"#
    );
}
