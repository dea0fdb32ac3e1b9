//! SIMO - streaming AI-governance assistant client
//!
#![doc = "SIMO - streaming AI-governance assistant client"]
#![doc = "Main entry point for the `simo` command."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use simo_chat::cli::{Cli, Commands};
use simo_chat::commands;
use simo_chat::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    // Execute command
    match cli.command {
        Commands::Chat => {
            tracing::info!("Starting interactive chat");
            commands::chat::run_chat(config).await?;
            Ok(())
        }
        Commands::Ask { prompt, json } => {
            tracing::info!("Asking a single question");
            commands::ask::run_ask(config, prompt, json).await?;
            Ok(())
        }
        Commands::Replay { file, chunk_size } => {
            tracing::info!("Replaying capture {}", file.display());
            commands::replay::run_replay(&config, &file, chunk_size)?;
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
///
/// Logs go to stderr so streamed replies on stdout stay clean.
fn init_tracing(verbose: bool) {
    let default = if verbose {
        "simo_chat=debug"
    } else {
        "simo_chat=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
