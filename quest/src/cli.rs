//! Command line arguments.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use quest_core::{
    GatewayConfig, InvalidCommandPolicy, SessionConfig, TransportFailurePolicy,
};
use std::path::PathBuf;
use std::time::Duration;

/// Which language model service narrates the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// A local Ollama server.
    Ollama,
    /// Anthropic's Claude API (needs ANTHROPIC_API_KEY).
    Claude,
}

/// Play a text quest narrated by a language model.
#[derive(Debug, Parser)]
#[command(name = "quest", version, about)]
pub struct Args {
    /// Rule catalog to play.
    #[arg(short, long, env = "QUEST_RULES", default_value = "rules.json")]
    pub rules: PathBuf,

    #[arg(short, long, value_enum, env = "QUEST_BACKEND", default_value_t = Backend::Ollama)]
    pub backend: Backend,

    /// Model name; defaults to the backend's own default.
    #[arg(short, long, env = "QUEST_MODEL")]
    pub model: Option<String>,

    #[arg(long, env = "OLLAMA_HOST", default_value = "http://localhost:11434")]
    pub ollama_host: String,

    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Replace the built-in game master instructions with this file.
    #[arg(long, env = "QUEST_PROMPT")]
    pub prompt: Option<PathBuf>,

    #[arg(long, default_value = "save.json")]
    pub save: PathBuf,

    #[arg(long, default_value = "samples/transcript.txt")]
    pub transcript: PathBuf,

    /// Do not write a transcript.
    #[arg(long)]
    pub no_transcript: bool,

    /// Count unrecognized commands as turns.
    #[arg(long)]
    pub invalid_costs_turn: bool,

    /// Stop a turn, instead of narrating a fallback, when the model is unreachable.
    #[arg(long)]
    pub strict_oracle: bool,

    /// Seconds to wait for the model.
    #[arg(long, default_value_t = 120)]
    pub timeout: u64,

    #[arg(long, default_value_t = 1024)]
    pub max_tokens: usize,

    #[arg(long)]
    pub temperature: Option<f32>,
}

impl Args {
    pub fn session_config(&self) -> SessionConfig {
        let mut config = SessionConfig::default().with_save_path(&self.save);

        config = if self.no_transcript {
            config.without_transcript()
        } else {
            config.with_transcript_path(&self.transcript)
        };

        if self.invalid_costs_turn {
            config = config.with_invalid_command_policy(InvalidCommandPolicy::ConsumesTurn);
        }
        config
    }

    pub async fn gateway_config(&self) -> anyhow::Result<GatewayConfig> {
        let mut config = GatewayConfig::default()
            .with_max_tokens(self.max_tokens)
            .with_timeout(Duration::from_secs(self.timeout));

        if let Some(model) = &self.model {
            config = config.with_model(model);
        }
        if let Some(temperature) = self.temperature {
            config = config.with_temperature(temperature);
        }
        if let Some(path) = &self.prompt {
            let prompt = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read prompt file {}", path.display()))?;
            config = config.with_system_prompt(prompt);
        }
        if self.strict_oracle {
            config = config.with_transport_failure_policy(TransportFailurePolicy::Fail);
        }
        Ok(config)
    }
}
