//! End-condition evaluation.

use crate::catalog::Catalog;
use crate::state::GameState;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where the game stands after a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Win,
    Lose,
    Timeout,
    Continue,
}

impl Outcome {
    /// Whether the game is over.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Outcome::Continue)
    }

    /// Built-in ending text, used when the catalog has no `END_TEXT` override.
    pub fn default_narration(self) -> Option<&'static str> {
        match self {
            Outcome::Win => Some("🏆 You successfully completed your quest."),
            Outcome::Lose => Some("💀 You have fallen. Your quest ends here."),
            Outcome::Timeout => Some("⏰ Time has run out."),
            Outcome::Continue => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Outcome::Win => "WIN",
            Outcome::Lose => "LOSE",
            Outcome::Timeout => "TIMEOUT",
            Outcome::Continue => "CONTINUE",
        };
        f.write_str(name)
    }
}

/// Decide whether the game has ended. First match wins: WIN, LOSE, TIMEOUT.
///
/// An empty win set is satisfied immediately.
pub fn evaluate(state: &GameState, catalog: &Catalog) -> Outcome {
    let end = &catalog.end_conditions;

    if end.win_all_flags.iter().all(|flag| state.flag(flag)) {
        return Outcome::Win;
    }

    if end.lose_any_flags.iter().any(|flag| state.flag(flag)) {
        return Outcome::Lose;
    }

    if state.turns >= end.max_turns {
        return Outcome::Timeout;
    }

    Outcome::Continue
}
