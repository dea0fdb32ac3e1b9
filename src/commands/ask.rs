//! One-shot question handler.

use tokio_util::sync::CancellationToken;

use crate::commands::{build_client, new_session, print_failure, run_turn};
use crate::config::Config;
use crate::error::Result;

/// Send a single question and print the reply
///
/// With `json` nothing is streamed to the terminal; the whole transcript
/// (greeting, question, reply) is printed as JSON once the turn completes.
///
/// # Errors
///
/// Returns the turn failure after its notice has been printed.
pub async fn run_ask(config: Config, prompt: String, json: bool) -> Result<()> {
    let client = build_client(&config)?;
    let mut session = new_session(&config);

    if !json {
        run_turn(&client, &mut session, prompt.trim()).await?;
        return Ok(());
    }

    let cancel = CancellationToken::new();
    if let Err(e) = client.send_turn(&mut session, prompt.trim(), &cancel).await {
        print_failure(&e);
        return Err(e.into());
    }

    let transcript = serde_json::to_string_pretty(&session.snapshot())?;
    println!("{}", transcript);
    Ok(())
}
