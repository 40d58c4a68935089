//! GameSession - the turn controller.
//!
//! A session owns everything a game needs: the catalog, the live state, the
//! turn history and the game master. Each line of player input goes through
//! [`GameSession::submit`], which drives one pass of the turn state machine:
//!
//! ```text
//! AwaitingInput -> Validating -> OracleCall -> Applying -> Enforcing -> Evaluating
//!       ^              |                                                  |
//!       +--------------+ (meta / rejected)                                |
//!       +-----------------------------------------------------------------+ (continue)
//!                                                     Terminated <--------+ (win / lose / timeout)
//! ```

use crate::catalog::Catalog;
use crate::command::{classify, Command, MetaCommand, UnknownCommand};
use crate::oracle::{normalize, GameMaster, OracleError, OracleReply};
use crate::outcome::{evaluate, Outcome};
use crate::persist::{PersistError, SaveFile};
use crate::rules::{enforce, Notice};
use crate::state::{apply_changes, GameState, TurnRecord};
use crate::transcript::{Role, Transcript};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, trace, warn};

/// Errors from GameSession operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleError),

    #[error("Persistence error: {0}")]
    Persist(#[from] PersistError),

    #[error("The game is over")]
    Terminated,
}

/// Whether a rejected command still uses up a turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InvalidCommandPolicy {
    /// Rejected input costs nothing.
    #[default]
    Free,

    /// Rejected input advances the turn counter, which counts toward
    /// `MAX_TURNS`. No oracle call is made.
    ConsumesTurn,
}

/// Configuration for a game session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Where `save` writes and `load` reads.
    pub save_path: PathBuf,

    /// Transcript file; `None` disables the transcript.
    pub transcript_path: Option<PathBuf>,

    pub invalid_command_policy: InvalidCommandPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            save_path: PathBuf::from("save.json"),
            transcript_path: Some(PathBuf::from("samples/transcript.txt")),
            invalid_command_policy: InvalidCommandPolicy::default(),
        }
    }
}

impl SessionConfig {
    pub fn with_save_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.save_path = path.into();
        self
    }

    pub fn with_transcript_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.transcript_path = Some(path.into());
        self
    }

    /// Turn the transcript off.
    pub fn without_transcript(mut self) -> Self {
        self.transcript_path = None;
        self
    }

    pub fn with_invalid_command_policy(mut self, policy: InvalidCommandPolicy) -> Self {
        self.invalid_command_policy = policy;
        self
    }
}

/// Where the turn controller is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AwaitingInput,
    Validating,
    OracleCall,
    Applying,
    Enforcing,
    Evaluating,
    Terminated,
}

impl Phase {
    /// Whether `next` is a legal transition from this phase.
    pub fn can_advance_to(self, next: Phase) -> bool {
        use Phase::*;
        matches!(
            (self, next),
            (AwaitingInput, Validating)
                | (Validating, AwaitingInput)
                | (Validating, OracleCall)
                | (Validating, Terminated)
                | (OracleCall, Applying)
                | (OracleCall, AwaitingInput)
                | (Applying, Enforcing)
                | (Enforcing, Evaluating)
                | (Evaluating, AwaitingInput)
                | (Evaluating, Terminated)
        )
    }
}

/// The result of one played turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnReport {
    /// The turn number this report is for.
    pub turn: u32,

    pub narration: String,

    /// Repairs made by rule enforcement.
    pub notices: Vec<Notice>,

    pub outcome: Outcome,

    /// Ending text, present only when the outcome is terminal.
    pub end_narration: Option<String>,
}

/// What a line of input produced.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutput {
    Help { commands: Vec<String> },
    Inventory { items: Vec<String> },
    Saved { path: PathBuf },
    Loaded { path: PathBuf },
    Quit,
    Rejected(UnknownCommand),
    Played(TurnReport),
}

/// A text quest in progress.
pub struct GameSession {
    catalog: Catalog,
    state: GameState,
    history: Vec<TurnRecord>,
    game_master: GameMaster,
    config: SessionConfig,
    transcript: Option<Transcript>,
    phase: Phase,
    outcome: Outcome,
}

impl GameSession {
    /// Start a new game from the catalog's start state.
    pub fn new(catalog: Catalog, game_master: GameMaster) -> Self {
        let config = SessionConfig::default();
        Self {
            state: catalog.start.clone(),
            transcript: config.transcript_path.clone().map(Transcript::new),
            catalog,
            history: Vec::new(),
            game_master,
            config,
            phase: Phase::AwaitingInput,
            outcome: Outcome::Continue,
        }
    }

    /// Configure the session.
    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.transcript = config.transcript_path.clone().map(Transcript::new);
        self.config = config;
        self
    }

    /// Handle one line of player input.
    ///
    /// Meta commands and rejected input never touch the oracle. Persistence
    /// failures and (under [`TransportFailurePolicy::Fail`]) oracle failures
    /// are returned as errors and leave the session ready for more input.
    ///
    /// [`TransportFailurePolicy::Fail`]: crate::oracle::TransportFailurePolicy::Fail
    pub async fn submit(&mut self, input: &str) -> Result<TurnOutput, SessionError> {
        if self.phase == Phase::Terminated {
            return Err(SessionError::Terminated);
        }

        self.advance(Phase::Validating);
        match classify(input, &self.catalog) {
            Ok(Command::Meta(meta)) => self.run_meta(meta).await,
            Ok(Command::Action(action)) => self.play_turn(action).await.map(TurnOutput::Played),
            Err(unknown) => {
                debug!(input = %unknown.input, "Rejected input");
                if self.config.invalid_command_policy == InvalidCommandPolicy::ConsumesTurn {
                    self.state.turns += 1;
                }
                self.advance(Phase::AwaitingInput);
                Ok(TurnOutput::Rejected(unknown))
            }
        }
    }

    async fn run_meta(&mut self, meta: MetaCommand) -> Result<TurnOutput, SessionError> {
        let output = match meta {
            MetaCommand::Help => Ok(TurnOutput::Help {
                commands: self.catalog.commands.clone(),
            }),
            MetaCommand::Inventory => Ok(TurnOutput::Inventory {
                items: self.state.inventory.clone(),
            }),
            MetaCommand::Save => {
                let path = self.config.save_path.clone();
                self.save(&path)
                    .await
                    .map(|()| TurnOutput::Saved { path })
            }
            MetaCommand::Load => {
                let path = self.config.save_path.clone();
                self.load(&path)
                    .await
                    .map(|()| TurnOutput::Loaded { path })
            }
            MetaCommand::Quit => {
                info!(turns = self.state.turns, "Player quit");
                self.advance(Phase::Terminated);
                return Ok(TurnOutput::Quit);
            }
        };

        self.advance(Phase::AwaitingInput);
        output
    }

    async fn play_turn(&mut self, action: String) -> Result<TurnReport, SessionError> {
        self.advance(Phase::OracleCall);
        self.state.turns += 1;

        let reply = match self
            .game_master
            .consult(&action, &self.catalog, &self.state, &self.history)
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                self.state.turns -= 1;
                self.advance(Phase::AwaitingInput);
                return Err(e.into());
            }
        };

        self.advance(Phase::Applying);
        let summary = apply_changes(&mut self.state, &reply.result.state_change);
        debug!(applied = summary.applied, skipped = summary.skipped, "Applied state changes");

        self.advance(Phase::Enforcing);
        let notices = enforce(&mut self.state, &self.catalog);

        self.advance(Phase::Evaluating);
        let outcome = evaluate(&self.state, &self.catalog);

        let end_narration = self.catalog.end_narration(outcome);
        if outcome.is_terminal() {
            info!(%outcome, turns = self.state.turns, "Game over");
            self.outcome = outcome;
            self.advance(Phase::Terminated);
        } else {
            self.history
                .push(TurnRecord::new(action.clone(), reply.result.narration.clone()));
            self.record(&action, &reply).await;
            self.advance(Phase::AwaitingInput);
        }

        Ok(TurnReport {
            turn: self.state.turns,
            narration: reply.result.narration,
            notices,
            outcome,
            end_narration,
        })
    }

    /// Append the turn to the transcript. Failures are logged, not fatal.
    ///
    /// The GM entry is the reply as the oracle sent it, pretty-printed when it
    /// parses. Only a degraded turn with no reply logs the fallback result.
    async fn record(&self, action: &str, reply: &OracleReply) {
        let Some(transcript) = &self.transcript else {
            return;
        };

        let gm_entry = match &reply.raw {
            Some(raw) => serde_json::from_str::<serde_json::Value>(&normalize(raw))
                .and_then(|value| serde_json::to_string_pretty(&value))
                .unwrap_or_else(|_| raw.trim().to_string()),
            None => serde_json::to_string_pretty(&reply.result)
                .unwrap_or_else(|_| reply.result.narration.clone()),
        };

        for (role, content) in [(Role::Player, action), (Role::Gm, gm_entry.as_str())] {
            if let Err(e) = transcript.append(role, content).await {
                warn!(path = %transcript.path().display(), error = %e, "Failed to write transcript");
                return;
            }
        }
    }

    fn advance(&mut self, next: Phase) {
        debug_assert!(
            self.phase.can_advance_to(next),
            "illegal phase transition {:?} -> {:?}",
            self.phase,
            next
        );
        trace!(from = ?self.phase, to = ?next, "Phase transition");
        self.phase = next;
    }

    /// Save state and history to `path`.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<(), SessionError> {
        SaveFile::new(self.state.clone(), self.history.clone())
            .save_json(path)
            .await?;
        Ok(())
    }

    /// Replace state and history with the contents of `path`.
    ///
    /// On failure nothing changes.
    pub async fn load(&mut self, path: impl AsRef<Path>) -> Result<(), SessionError> {
        let save = SaveFile::load_json(path).await?;
        self.state = save.state;
        self.history = save.turns;
        Ok(())
    }

    /// Get the game state.
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Get the turn history, oldest first.
    pub fn history(&self) -> &[TurnRecord] {
        &self.history
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// How the game ended; `Continue` while it is running or after `quit`.
    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn is_terminated(&self) -> bool {
        self.phase == Phase::Terminated
    }
}
