//! The game master oracle.
//!
//! The oracle is an external language model that narrates each turn and
//! proposes state changes. Everything it returns is treated as untrusted:
//! replies go through [`sanitize`] and the resulting changes through the
//! state store and rule enforcer.

mod backends;
mod gateway;
mod sanitize;

pub use gateway::{
    GameMaster, GatewayConfig, OracleReply, TransportFailurePolicy, DEFAULT_SYSTEM_PROMPT,
    HISTORY_WINDOW,
};
pub use sanitize::{normalize, sanitize};

use crate::state::ChangeOp;
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Narration used when the oracle's reply cannot be understood.
pub const FALLBACK_NARRATION: &str = "Game Master encountered an error.";

/// Errors from reaching the oracle (not from what it says).
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("Oracle service error: {0}")]
    Service(#[from] llm::Error),

    #[error("Oracle did not answer within {0:?}")]
    Timeout(Duration),

    #[error("Oracle unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to encode oracle payload: {0}")]
    Encode(#[from] serde_json::Error),
}

/// One request to the oracle.
#[derive(Debug, Clone, PartialEq)]
pub struct OracleRequest {
    /// Fixed instructions describing the game master's job.
    pub system_instruction: String,

    /// The turn context: rules, state, recent turns and player input.
    pub payload: Value,

    /// Overrides the backend's default model when set.
    pub model: Option<String>,
    pub max_tokens: usize,
    pub temperature: Option<f32>,
}

/// A language model service that can act as game master.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Send a request and return the raw reply text.
    async fn consult(&self, request: &OracleRequest) -> Result<String, OracleError>;
}

/// A sanitized oracle reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OracleResult {
    #[serde(default, deserialize_with = "lenient_narration")]
    pub narration: String,

    #[serde(
        rename = "state_change",
        alias = "stateChange",
        default,
        deserialize_with = "lenient_ops"
    )]
    pub state_change: Vec<ChangeOp>,
}

impl OracleResult {
    pub fn new(narration: impl Into<String>, state_change: Vec<ChangeOp>) -> Self {
        Self {
            narration: narration.into(),
            state_change,
        }
    }

    /// The result substituted for an unusable reply.
    pub fn fallback() -> Self {
        Self::new(FALLBACK_NARRATION, Vec::new())
    }
}

/// A narration that is not a string reads as empty; it does not fail the reply.
fn lenient_narration<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(text) => Ok(text),
        Value::Null => Ok(String::new()),
        other => {
            warn!(narration = %other, "Ignoring non-text narration");
            Ok(String::new())
        }
    }
}

/// Keep every well-formed op; drop malformed ones instead of failing the reply.
fn lenient_ops<'de, D>(deserializer: D) -> Result<Vec<ChangeOp>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = match Value::deserialize(deserializer)? {
        Value::Array(ops) => ops,
        Value::Null => return Ok(Vec::new()),
        other => {
            warn!(state_change = %other, "Ignoring state_change that is not a list");
            return Ok(Vec::new());
        }
    };

    Ok(raw
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<ChangeOp>(value.clone()) {
            Ok(op) => Some(op),
            Err(e) => {
                warn!(op = %value, error = %e, "Dropping malformed change op");
                None
            }
        })
        .collect())
}
