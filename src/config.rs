//! Configuration management for SIMO chat
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{ChatError, Result};
use crate::session::DEFAULT_GREETING;
use crate::stream::DEFAULT_MAX_PENDING_BYTES;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Path of the chat function below a hosted project URL
const CHAT_FUNCTION_PATH: &str = "/functions/v1/asimov-chat";

/// Main configuration structure for SIMO chat
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Endpoint, credentials and conversation settings
    #[serde(default)]
    pub chat: ChatConfig,
    /// Stream decoding limits
    #[serde(default)]
    pub stream: StreamConfig,
}

/// Chat endpoint and conversation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// URL the conversation is POSTed to
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Publishable key sent as `apikey` and bearer token
    #[serde(default)]
    pub api_key: Option<String>,

    /// Header carrying the session identifier
    #[serde(default = "default_session_header")]
    pub session_header: String,

    /// Preferred language announced on the first request
    #[serde(default = "default_language")]
    pub language: String,

    /// Assistant greeting every session opens with
    #[serde(default = "default_greeting")]
    pub greeting: String,

    /// Seconds to wait for the status and for each body chunk
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_seconds: u64,

    /// Seconds allowed to establish the connection
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
}

fn default_endpoint() -> String {
    format!("http://localhost:54321{}", CHAT_FUNCTION_PATH)
}

fn default_session_header() -> String {
    "x-session-id".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_greeting() -> String {
    DEFAULT_GREETING.to_string()
}

fn default_idle_timeout() -> u64 {
    60
}

fn default_connect_timeout() -> u64 {
    30
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: None,
            session_header: default_session_header(),
            language: default_language(),
            greeting: default_greeting(),
            idle_timeout_seconds: default_idle_timeout(),
            connect_timeout_seconds: default_connect_timeout(),
        }
    }
}

/// Stream decoding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Bound on a single line and on retained retry text (bytes)
    #[serde(default = "default_max_pending_bytes")]
    pub max_pending_bytes: usize,
}

fn default_max_pending_bytes() -> usize {
    DEFAULT_MAX_PENDING_BYTES
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            max_pending_bytes: default_max_pending_bytes(),
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Returns
    ///
    /// Returns the loaded and merged configuration
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ChatError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| ChatError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        // A project URL is the coarser setting; an explicit endpoint wins.
        if let Ok(base) = std::env::var("SIMO_SUPABASE_URL") {
            self.chat.endpoint = format!("{}{}", base.trim_end_matches('/'), CHAT_FUNCTION_PATH);
            tracing::debug!(endpoint = %self.chat.endpoint, "Env override: SIMO_SUPABASE_URL");
        }

        if let Ok(endpoint) = std::env::var("SIMO_CHAT_ENDPOINT") {
            self.chat.endpoint = endpoint;
            tracing::debug!("Env override: SIMO_CHAT_ENDPOINT");
        }

        if let Ok(key) = std::env::var("SIMO_CHAT_API_KEY") {
            self.chat.api_key = Some(key);
            tracing::debug!("Env override: SIMO_CHAT_API_KEY");
        }

        if let Ok(language) = std::env::var("SIMO_CHAT_LANGUAGE") {
            self.chat.language = language;
            tracing::debug!("Env override: SIMO_CHAT_LANGUAGE");
        }

        if let Ok(timeout) = std::env::var("SIMO_CHAT_IDLE_TIMEOUT") {
            match timeout.parse::<u64>() {
                Ok(v) => {
                    self.chat.idle_timeout_seconds = v;
                    tracing::debug!(
                        idle_timeout_seconds = v,
                        "Env override: SIMO_CHAT_IDLE_TIMEOUT"
                    );
                }
                Err(_) => {
                    tracing::warn!("Invalid value for SIMO_CHAT_IDLE_TIMEOUT: {}", timeout);
                }
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(endpoint) = &cli.endpoint {
            self.chat.endpoint = endpoint.clone();
        }
        if let Some(language) = &cli.language {
            self.chat.language = language.clone();
        }
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }
    }

    /// Validate the configuration
    ///
    /// Ensures all configuration values are within acceptable ranges
    /// and that required fields are properly set.
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        let endpoint = url::Url::parse(&self.chat.endpoint).map_err(|e| {
            ChatError::Config(format!(
                "chat.endpoint is not a valid URL ({}): {}",
                self.chat.endpoint, e
            ))
        })?;

        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(ChatError::Config(format!(
                "chat.endpoint must use http or https, got {}",
                endpoint.scheme()
            ))
            .into());
        }

        if self.chat.session_header.trim().is_empty() {
            return Err(
                ChatError::Config("chat.session_header cannot be empty".to_string()).into(),
            );
        }

        if reqwest::header::HeaderName::from_bytes(self.chat.session_header.as_bytes()).is_err() {
            return Err(ChatError::Config(format!(
                "chat.session_header is not a valid header name: {}",
                self.chat.session_header
            ))
            .into());
        }

        if self.chat.language.trim().is_empty() {
            return Err(ChatError::Config("chat.language cannot be empty".to_string()).into());
        }

        if self.chat.idle_timeout_seconds == 0 {
            return Err(ChatError::Config(
                "chat.idle_timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.chat.connect_timeout_seconds == 0 {
            return Err(ChatError::Config(
                "chat.connect_timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.stream.max_pending_bytes < 1024 {
            return Err(ChatError::Config(
                "stream.max_pending_bytes must be at least 1024".to_string(),
            )
            .into());
        }

        Ok(())
    }
}
