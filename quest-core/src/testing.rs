//! Testing utilities for quests.
//!
//! This module provides tools for integration testing:
//! - `MockOracle` for deterministic testing without a language model
//! - `TestHarness` for scripted game scenarios
//! - Assertion helpers for verifying game state

use crate::catalog::{Catalog, EndConditions, EndText};
use crate::oracle::{GameMaster, GatewayConfig, Oracle, OracleError, OracleRequest};
use crate::outcome::Outcome;
use crate::session::{GameSession, SessionConfig, SessionError, TurnOutput, TurnReport};
use crate::state::{ChangeOp, GameState};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Narration returned once the mock runs out of scripted replies.
pub const UNSCRIPTED_NARRATION: &str = "Nothing happens.";

/// A small temple quest used throughout the tests.
pub fn sample_catalog() -> Catalog {
    let mut locks = Map::new();
    locks.insert("vault_door".to_string(), json!("requires flags.has_key"));

    let mut start = GameState {
        turns: 0,
        hp: Some(10),
        inventory: vec!["torch".to_string()],
        ..Default::default()
    };
    start.set_flag("has_key", false);

    Catalog {
        commands: [
            "look",
            "take <item>",
            "go <direction>",
            "open <thing>",
            "use <item>",
            "talk <npc>",
        ]
        .into_iter()
        .map(str::to_string)
        .collect(),
        locks,
        quest: json!({
            "title": "The Sunken Temple",
            "goal": "Recover the idol and escape the temple."
        }),
        end_conditions: EndConditions {
            win_all_flags: ["has_idol", "escaped"].into_iter().map(str::to_string).collect(),
            lose_any_flags: ["dead", "hp_zero"].into_iter().map(str::to_string).collect(),
            max_turns: 50,
        },
        inventory_limit: 5,
        start,
        end_text: EndText::default(),
    }
}

/// A scripted oracle reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Raw reply text, returned as-is.
    Text(String),

    /// The oracle cannot be reached.
    Unreachable,

    /// Raw reply text, returned after a delay.
    Delayed(Duration, String),
}

impl MockReply {
    pub fn text(raw: impl Into<String>) -> Self {
        MockReply::Text(raw.into())
    }

    /// A well-formed reply with no state changes.
    pub fn narration(text: impl Into<String>) -> Self {
        Self::with_changes(text, Vec::new())
    }

    /// A well-formed reply with state changes.
    pub fn with_changes(text: impl Into<String>, changes: Vec<ChangeOp>) -> Self {
        Self::json(json!({ "narration": text.into(), "state_change": changes }))
    }

    pub fn json(value: Value) -> Self {
        MockReply::Text(value.to_string())
    }
}

#[derive(Debug, Default)]
struct MockState {
    replies: VecDeque<MockReply>,
    requests: Vec<OracleRequest>,
}

/// An oracle that returns scripted replies and records every request.
///
/// Clones share their script, so a test can keep a handle after giving the
/// mock to a [`GameMaster`].
#[derive(Debug, Clone, Default)]
pub struct MockOracle {
    inner: Arc<Mutex<MockState>>,
}

impl MockOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock with scripted replies.
    pub fn with_replies(replies: impl IntoIterator<Item = MockReply>) -> Self {
        let oracle = Self::new();
        oracle.lock().replies.extend(replies);
        oracle
    }

    /// Queue a reply.
    pub fn push(&self, reply: MockReply) {
        self.lock().replies.push_back(reply);
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<OracleRequest> {
        self.lock().requests.clone()
    }

    pub fn last_request(&self) -> Option<OracleRequest> {
        self.lock().requests.last().cloned()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Oracle for MockOracle {
    async fn consult(&self, request: &OracleRequest) -> Result<String, OracleError> {
        let reply = {
            let mut state = self.lock();
            state.requests.push(request.clone());
            state.replies.pop_front()
        };

        match reply {
            Some(MockReply::Text(raw)) => Ok(raw),
            Some(MockReply::Unreachable) => Err(OracleError::Unavailable(
                "mock oracle is unreachable".to_string(),
            )),
            Some(MockReply::Delayed(delay, raw)) => {
                tokio::time::sleep(delay).await;
                Ok(raw)
            }
            None => Ok(json!({ "narration": UNSCRIPTED_NARRATION, "state_change": [] }).to_string()),
        }
    }
}

/// Test harness for scripted game scenarios.
pub struct TestHarness {
    pub session: GameSession,
    pub oracle: MockOracle,
}

impl TestHarness {
    /// Create a harness over the sample catalog, with no transcript.
    pub fn new() -> Self {
        Self::with_catalog(sample_catalog())
    }

    pub fn with_catalog(catalog: Catalog) -> Self {
        Self::with_config(
            catalog,
            SessionConfig::default().without_transcript(),
            GatewayConfig::default(),
        )
    }

    pub fn with_config(catalog: Catalog, session: SessionConfig, gateway: GatewayConfig) -> Self {
        let oracle = MockOracle::new();
        let game_master = GameMaster::new(oracle.clone()).with_config(gateway);
        Self {
            session: GameSession::new(catalog, game_master).with_config(session),
            oracle,
        }
    }

    /// Queue a scripted reply.
    pub fn expect_reply(&mut self, reply: MockReply) -> &mut Self {
        self.oracle.push(reply);
        self
    }

    /// Queue a reply with only narration.
    pub fn expect_narration(&mut self, text: impl Into<String>) -> &mut Self {
        self.expect_reply(MockReply::narration(text))
    }

    /// Queue a reply with state changes.
    pub fn expect_changes(&mut self, text: impl Into<String>, changes: Vec<ChangeOp>) -> &mut Self {
        self.expect_reply(MockReply::with_changes(text, changes))
    }

    /// Submit player input.
    pub async fn input(&mut self, text: &str) -> Result<TurnOutput, SessionError> {
        self.session.submit(text).await
    }

    /// Submit input that must be played as a turn.
    pub async fn play(&mut self, text: &str) -> TurnReport {
        match self.session.submit(text).await {
            Ok(TurnOutput::Played(report)) => report,
            other => panic!("Expected {text:?} to play a turn, got {other:?}"),
        }
    }

    pub fn state(&self) -> &GameState {
        self.session.state()
    }

    /// Number of oracle calls so far.
    pub fn oracle_calls(&self) -> usize {
        self.oracle.requests().len()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Assert that a flag is set.
#[track_caller]
pub fn assert_flag(harness: &TestHarness, name: &str) {
    assert!(
        harness.state().flag(name),
        "Expected flag '{name}' to be set, flags are {:?}",
        harness.state().flags
    );
}

/// Assert the turn counter.
#[track_caller]
pub fn assert_turns(harness: &TestHarness, turns: u32) {
    assert_eq!(harness.state().turns, turns, "Turn counter mismatch");
}

/// Assert the inventory contents, in order.
#[track_caller]
pub fn assert_inventory(harness: &TestHarness, items: &[&str]) {
    assert_eq!(harness.state().inventory, items, "Inventory mismatch");
}

/// Assert how the game ended.
#[track_caller]
pub fn assert_outcome(harness: &TestHarness, outcome: Outcome) {
    assert_eq!(harness.session.outcome(), outcome, "Outcome mismatch");
    assert_eq!(
        harness.session.is_terminated(),
        outcome.is_terminal(),
        "Session termination does not match outcome"
    );
}
