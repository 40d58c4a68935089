//! The oracle gateway: builds the turn payload, calls the oracle and
//! sanitizes whatever comes back.

use super::{sanitize, Oracle, OracleError, OracleRequest, OracleResult};
use crate::catalog::{Catalog, RuleView};
use crate::state::{recent, GameState, TurnRecord};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How many past turns the oracle sees.
pub const HISTORY_WINDOW: usize = 2;

/// Default game master instructions.
pub const DEFAULT_SYSTEM_PROMPT: &str = include_str!("prompts/gm.txt");

/// What to do when the oracle cannot be reached or does not answer in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransportFailurePolicy {
    /// Carry on with the fallback result. The turn still counts.
    #[default]
    Degrade,

    /// Report the failure to the caller and leave the state untouched.
    Fail,
}

/// Configuration for the gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Model override; `None` uses the backend's default.
    pub model: Option<String>,

    /// Maximum tokens for replies.
    pub max_tokens: usize,

    /// Temperature for generation.
    pub temperature: Option<f32>,

    /// Instructions sent with every request.
    pub system_prompt: String,

    /// How long to wait for a reply.
    pub timeout: Duration,

    pub on_transport_failure: TransportFailurePolicy,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            model: None,
            max_tokens: 1024,
            temperature: None,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            timeout: Duration::from_secs(120),
            on_transport_failure: TransportFailurePolicy::default(),
        }
    }
}

impl GatewayConfig {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_transport_failure_policy(mut self, policy: TransportFailurePolicy) -> Self {
        self.on_transport_failure = policy;
        self
    }
}

/// What the gateway got back for one turn.
#[derive(Debug, Clone, PartialEq)]
pub struct OracleReply {
    /// The raw reply text, or `None` if the oracle was never heard from.
    pub raw: Option<String>,

    /// The sanitized result.
    pub result: OracleResult,
}

/// The turn context sent to the oracle.
#[derive(Serialize)]
struct Payload<'a> {
    rules: RuleView<'a>,
    state: &'a GameState,
    last_turns: &'a [TurnRecord],
    player_input: &'a str,
}

/// The game master: an oracle plus the policy around calling it.
pub struct GameMaster {
    oracle: Box<dyn Oracle>,
    config: GatewayConfig,
}

impl GameMaster {
    pub fn new(oracle: impl Oracle + 'static) -> Self {
        Self {
            oracle: Box::new(oracle),
            config: GatewayConfig::default(),
        }
    }

    /// Configure the gateway.
    pub fn with_config(mut self, config: GatewayConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Build the request for one turn. Only the last [`HISTORY_WINDOW`]
    /// turns of history are included.
    pub fn build_request(
        &self,
        input: &str,
        catalog: &Catalog,
        state: &GameState,
        history: &[TurnRecord],
    ) -> Result<OracleRequest, OracleError> {
        let payload = Payload {
            rules: catalog.rule_view(),
            state,
            last_turns: recent(history, HISTORY_WINDOW),
            player_input: input,
        };

        Ok(OracleRequest {
            system_instruction: self.config.system_prompt.clone(),
            payload: serde_json::to_value(&payload)?,
            model: self.config.model.clone(),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        })
    }

    /// Consult the oracle for one turn.
    ///
    /// Unparseable replies always become the fallback result. Transport
    /// failures (including the timeout) follow the configured policy.
    pub async fn consult(
        &self,
        input: &str,
        catalog: &Catalog,
        state: &GameState,
        history: &[TurnRecord],
    ) -> Result<OracleReply, OracleError> {
        let request = self.build_request(input, catalog, state, history)?;

        info!(input, turn = state.turns, "Consulting oracle");
        let outcome = tokio::time::timeout(self.config.timeout, self.oracle.consult(&request))
            .await
            .unwrap_or(Err(OracleError::Timeout(self.config.timeout)));

        match outcome {
            Ok(raw) => {
                debug!(reply = %raw, "Oracle replied");
                let result = sanitize(&raw);
                Ok(OracleReply {
                    raw: Some(raw),
                    result,
                })
            }
            Err(e) => match self.config.on_transport_failure {
                TransportFailurePolicy::Degrade => {
                    warn!(error = %e, "Oracle unreachable, continuing with fallback");
                    Ok(OracleReply {
                        raw: None,
                        result: OracleResult::fallback(),
                    })
                }
                TransportFailurePolicy::Fail => {
                    warn!(error = %e, "Oracle unreachable");
                    Err(e)
                }
            },
        }
    }
}
