//! Text quest player.
//!
//! Loads a rule catalog and plays it in the terminal, with a language model
//! as game master:
//!
//! ```bash
//! cargo run -p quest -- --rules quest/rules.json --model llama3:8b
//! ```
//!
//! Logs go to stderr; set `RUST_LOG=quest_core=debug` to see oracle traffic.

mod cli;
mod repl;

use anyhow::Context;
use clap::Parser;
use cli::{Args, Backend};
use quest_core::{Catalog, GameMaster, GameSession};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    setup_logging();

    let catalog = Catalog::load(&args.rules)
        .await
        .with_context(|| format!("Failed to load rules from {}", args.rules.display()))?;

    let game_master = match args.backend {
        Backend::Ollama => GameMaster::new(llm::Ollama::new(&args.ollama_host)?),
        Backend::Claude => {
            let api_key = args
                .api_key
                .clone()
                .context("ANTHROPIC_API_KEY is not set")?;
            GameMaster::new(llm::Claude::new(api_key)?)
        }
    }
    .with_config(args.gateway_config().await?);

    tracing::info!(rules = %args.rules.display(), backend = ?args.backend, "Starting quest");

    let session = GameSession::new(catalog, game_master).with_config(args.session_config());
    repl::run(session).await
}

/// Log to stderr so narration on stdout stays readable.
fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
