//! Game state and the declarative changes that mutate it.
//!
//! The state is a JSON document with a handful of well-known keys the
//! engine relies on (`turns`, `hp`, `inventory`, `flags`) and an open set of
//! keys authored by the quest. The oracle changes it only by proposing
//! [`ChangeOp`]s, which [`apply_changes`] applies in order.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Hit points assumed when the state has no `hp` key.
pub const DEFAULT_HP: i64 = 10;

/// Flag raised by the rule enforcer once hit points run out.
pub const HP_ZERO_FLAG: &str = "hp_zero";

/// Prefix addressing a single flag in a change op key, e.g. `flags.door_open`.
const FLAG_PATH_PREFIX: &str = "flags.";

/// The mutable game state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    /// Accepted player actions so far. Owned by the engine.
    #[serde(default)]
    pub turns: u32,

    /// Hit points; `None` means the default of [`DEFAULT_HP`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hp: Option<i64>,

    /// Carried items, earliest acquired first.
    #[serde(default)]
    pub inventory: Vec<String>,

    #[serde(default)]
    pub flags: BTreeMap<String, bool>,

    /// Quest-specific keys the engine does not interpret.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GameState {
    /// Current hit points, falling back to [`DEFAULT_HP`].
    pub fn hp(&self) -> i64 {
        self.hp.unwrap_or(DEFAULT_HP)
    }

    /// Whether a flag is set. Missing flags read as false.
    pub fn flag(&self, name: &str) -> bool {
        self.flags.get(name).copied().unwrap_or(false)
    }

    pub fn set_flag(&mut self, name: impl Into<String>, value: bool) {
        self.flags.insert(name.into(), value);
    }

    /// Look up a quest-specific key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }
}

/// A single change proposed by the oracle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ChangeOp {
    /// Create or overwrite `key`.
    Set { key: String, value: Value },

    /// Remove `key` if present.
    Delete { key: String },

    /// Any action this engine does not know; ignored when applied.
    #[serde(other)]
    Unknown,
}

impl ChangeOp {
    pub fn set(key: impl Into<String>, value: impl Into<Value>) -> Self {
        ChangeOp::Set {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn delete(key: impl Into<String>) -> Self {
        ChangeOp::Delete { key: key.into() }
    }
}

/// How many ops of a batch took effect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplySummary {
    pub applied: usize,
    pub skipped: usize,
}

/// One exchange of the game, kept in the history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnRecord {
    pub player: String,
    #[serde(alias = "gm")]
    pub narration: String,
}

impl TurnRecord {
    pub fn new(player: impl Into<String>, narration: impl Into<String>) -> Self {
        Self {
            player: player.into(),
            narration: narration.into(),
        }
    }
}

/// The last `window` records of a history, oldest first.
pub fn recent(history: &[TurnRecord], window: usize) -> &[TurnRecord] {
    &history[history.len().saturating_sub(window)..]
}

/// Apply change ops in order. Later ops on the same key win.
///
/// Never fails: unknown actions are ignored, and ops that would break the
/// type of a well-known key (or touch the turn counter) are skipped.
pub fn apply_changes(state: &mut GameState, ops: &[ChangeOp]) -> ApplySummary {
    let mut summary = ApplySummary::default();
    for op in ops {
        if apply_change(state, op) {
            summary.applied += 1;
        } else {
            summary.skipped += 1;
        }
    }
    summary
}

/// Apply one change op. Returns whether it took effect.
pub fn apply_change(state: &mut GameState, op: &ChangeOp) -> bool {
    match op {
        ChangeOp::Set { key, value } => set_key(state, key, value),
        ChangeOp::Delete { key } => delete_key(state, key),
        ChangeOp::Unknown => {
            debug!("Ignoring change op with unknown action");
            false
        }
    }
}

fn set_key(state: &mut GameState, key: &str, value: &Value) -> bool {
    match key {
        "" => {
            warn!("Skipping set with an empty key");
            false
        }
        "turns" => {
            warn!("Skipping set on the engine-owned turn counter");
            false
        }
        "hp" => match as_integer(value) {
            Some(hp) => {
                state.hp = Some(hp);
                true
            }
            None => reject(key, value),
        },
        "inventory" => match serde_json::from_value::<Vec<String>>(value.clone()) {
            Ok(items) => {
                state.inventory = items;
                true
            }
            Err(_) => reject(key, value),
        },
        "flags" => match serde_json::from_value::<BTreeMap<String, bool>>(value.clone()) {
            Ok(flags) => {
                state.flags = flags;
                true
            }
            Err(_) => reject(key, value),
        },
        _ => {
            if let Some(name) = flag_name(key) {
                return match value.as_bool() {
                    Some(flag) => {
                        state.set_flag(name, flag);
                        true
                    }
                    None => reject(key, value),
                };
            }
            state.extra.insert(key.to_string(), value.clone());
            true
        }
    }
}

fn delete_key(state: &mut GameState, key: &str) -> bool {
    match key {
        "turns" => {
            warn!("Skipping delete of the engine-owned turn counter");
            return false;
        }
        "hp" => state.hp = None,
        "inventory" => state.inventory.clear(),
        "flags" => state.flags.clear(),
        _ => match flag_name(key) {
            Some(name) => {
                state.flags.remove(name);
            }
            None => {
                state.extra.remove(key);
            }
        },
    }
    true
}

fn flag_name(key: &str) -> Option<&str> {
    key.strip_prefix(FLAG_PATH_PREFIX)
        .filter(|name| !name.is_empty())
}

/// Accept integers and finite floats (truncated toward zero).
fn as_integer(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.is_finite())
            .map(|f| f.trunc() as i64)
    })
}

fn reject(key: &str, value: &Value) -> bool {
    warn!(%key, %value, "Skipping set with a value of the wrong type");
    false
}
