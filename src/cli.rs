//! Command-line interface definition for SIMO chat
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for interactive chat, one-shot questions, and
//! offline replay of captured streams.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// SIMO - streaming AI-governance assistant client
///
/// Talk to the SIMO chat endpoint from the terminal, with replies
/// rendered as they stream in.
#[derive(Parser, Debug, Clone)]
#[command(name = "simo")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Override the chat endpoint URL
    #[arg(long, global = true)]
    pub endpoint: Option<String>,

    /// Override the preferred language (e.g. en, fr, de)
    #[arg(short, long, global = true)]
    pub language: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start an interactive conversation
    Chat,

    /// Ask a single question and print the streamed reply
    Ask {
        /// Question to send
        #[arg(short, long)]
        prompt: String,

        /// Print the whole transcript as JSON instead of streaming text
        #[arg(long)]
        json: bool,
    },

    /// Decode a captured response body and print the assembled reply
    Replay {
        /// File holding the raw `data:` stream
        file: PathBuf,

        /// Feed the file in chunks of this many bytes
        #[arg(long, default_value_t = 4096)]
        chunk_size: usize,
    },
}

impl Cli {
    /// Parse command line arguments
    ///
    /// # Returns
    ///
    /// Returns the parsed CLI structure
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            verbose: false,
            endpoint: None,
            language: None,
            command: Commands::Chat,
        }
    }
}
