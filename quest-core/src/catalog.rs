//! The rule catalog: the author-defined, read-only description of a quest.
//!
//! A catalog is loaded once at startup from a JSON document and never
//! changes afterwards. Most of it is opaque to the engine and only passed
//! through to the oracle for narrative grounding; the engine itself reads
//! the command list, the inventory limit, the end conditions and the start
//! state.

use crate::outcome::Outcome;
use crate::state::GameState;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

/// Inventory size used when the catalog does not set `INVENTORY_LIMIT`.
pub const DEFAULT_INVENTORY_LIMIT: usize = 5;

/// Turn budget used when `END_CONDITIONS` does not set `MAX_TURNS`.
pub const DEFAULT_MAX_TURNS: u32 = 50;

/// Errors from loading a rule catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read rule catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid rule catalog: {0}")]
    Json(#[from] serde_json::Error),
}

/// The rule catalog for one quest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    /// Recognized commands. The first word of each is an accepted prefix.
    #[serde(rename = "COMMANDS")]
    pub commands: Vec<String>,

    /// Lock identifiers mapped to their unlock conditions.
    #[serde(rename = "LOCKS", default)]
    pub locks: Map<String, Value>,

    /// Free-form quest description for the oracle.
    #[serde(rename = "QUEST")]
    pub quest: Value,

    #[serde(rename = "END_CONDITIONS")]
    pub end_conditions: EndConditions,

    #[serde(rename = "INVENTORY_LIMIT", default = "default_inventory_limit")]
    pub inventory_limit: usize,

    /// The state a new game starts from.
    #[serde(rename = "START")]
    pub start: GameState,

    /// Optional replacements for the built-in ending texts.
    #[serde(rename = "END_TEXT", default, skip_serializing_if = "EndText::is_empty")]
    pub end_text: EndText,
}

/// Flag-based and turn-based conditions that end the game.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndConditions {
    /// All of these flags must be true to win. An empty set wins at once.
    #[serde(rename = "WIN_ALL_FLAGS", default)]
    pub win_all_flags: BTreeSet<String>,

    /// Any one of these flags being true loses the game.
    #[serde(rename = "LOSE_ANY_FLAGS", default)]
    pub lose_any_flags: BTreeSet<String>,

    #[serde(rename = "MAX_TURNS", default = "default_max_turns")]
    pub max_turns: u32,
}

/// Author overrides for the narration shown when the game ends.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndText {
    #[serde(rename = "WIN", default, skip_serializing_if = "Option::is_none")]
    pub win: Option<String>,

    #[serde(rename = "LOSE", default, skip_serializing_if = "Option::is_none")]
    pub lose: Option<String>,

    #[serde(rename = "TIMEOUT", default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
}

impl EndText {
    fn is_empty(&self) -> bool {
        self.win.is_none() && self.lose.is_none() && self.timeout.is_none()
    }
}

fn default_inventory_limit() -> usize {
    DEFAULT_INVENTORY_LIMIT
}

fn default_max_turns() -> u32 {
    DEFAULT_MAX_TURNS
}

/// The part of the catalog the oracle gets to see.
///
/// Keeps the request small: the start state, inventory limit and ending
/// texts stay local.
#[derive(Debug, Serialize)]
pub struct RuleView<'a> {
    #[serde(rename = "COMMANDS")]
    pub commands: &'a [String],
    #[serde(rename = "LOCKS")]
    pub locks: &'a Map<String, Value>,
    #[serde(rename = "QUEST")]
    pub quest: &'a Value,
    #[serde(rename = "END_CONDITIONS")]
    pub end_conditions: &'a EndConditions,
}

impl Catalog {
    /// Parse a catalog from JSON text.
    pub fn from_json(text: &str) -> Result<Self, CatalogError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load a catalog from a JSON file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).await.map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// The reduced view sent to the oracle each turn.
    pub fn rule_view(&self) -> RuleView<'_> {
        RuleView {
            commands: &self.commands,
            locks: &self.locks,
            quest: &self.quest,
            end_conditions: &self.end_conditions,
        }
    }

    /// Lower-cased first word of every command; blank commands are skipped.
    pub fn action_prefixes(&self) -> impl Iterator<Item = String> + '_ {
        self.commands
            .iter()
            .filter_map(|cmd| cmd.split_whitespace().next())
            .map(str::to_lowercase)
    }

    /// Whether normalized input starts with one of the command prefixes.
    pub fn accepts(&self, input: &str) -> bool {
        self.action_prefixes().any(|prefix| input.starts_with(&prefix))
    }

    /// The narration for a terminal outcome, honouring `END_TEXT`.
    pub fn end_narration(&self, outcome: Outcome) -> Option<String> {
        let custom = match outcome {
            Outcome::Win => self.end_text.win.as_ref(),
            Outcome::Lose => self.end_text.lose.as_ref(),
            Outcome::Timeout => self.end_text.timeout.as_ref(),
            Outcome::Continue => None,
        };
        custom
            .cloned()
            .or_else(|| outcome.default_narration().map(str::to_string))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn minimal() -> serde_json::Value {
        json!({
            "COMMANDS": ["look", "take <item>", "go <direction>"],
            "QUEST": {"goal": "find the idol"},
            "END_CONDITIONS": {},
            "START": {"turns": 0, "inventory": [], "flags": {}}
        })
    }

    #[test]
    fn test_defaults_applied() {
        let catalog = Catalog::from_json(&minimal().to_string()).unwrap();

        assert_eq!(catalog.inventory_limit, DEFAULT_INVENTORY_LIMIT);
        assert_eq!(catalog.end_conditions.max_turns, DEFAULT_MAX_TURNS);
        assert!(catalog.end_conditions.win_all_flags.is_empty());
        assert!(catalog.locks.is_empty());
        assert_eq!(catalog.start.turns, 0);
    }

    #[test]
    fn test_required_fields() {
        for field in ["COMMANDS", "QUEST", "END_CONDITIONS", "START"] {
            let mut doc = minimal();
            doc.as_object_mut().unwrap().remove(field);
            let err = Catalog::from_json(&doc.to_string()).unwrap_err();
            assert!(
                err.to_string().contains(field),
                "error for missing {field} should name it: {err}"
            );
        }
    }

    #[test]
    fn test_full_catalog() {
        let doc = json!({
            "COMMANDS": ["look", "open <thing>"],
            "LOCKS": {"iron_door": {"requires": "iron_key"}},
            "QUEST": "Escape the crypt",
            "END_CONDITIONS": {
                "WIN_ALL_FLAGS": ["escaped", "escaped"],
                "LOSE_ANY_FLAGS": ["dead"],
                "MAX_TURNS": 12
            },
            "INVENTORY_LIMIT": 3,
            "START": {"turns": 0, "hp": 7, "room": "crypt"},
            "END_TEXT": {"WIN": "Daylight!"}
        });
        let catalog = Catalog::from_json(&doc.to_string()).unwrap();

        assert_eq!(catalog.inventory_limit, 3);
        assert_eq!(catalog.end_conditions.max_turns, 12);
        assert_eq!(catalog.end_conditions.win_all_flags.len(), 1);
        assert_eq!(catalog.start.hp, Some(7));
        assert_eq!(catalog.start.extra["room"], "crypt");
        assert_eq!(catalog.end_narration(Outcome::Win).as_deref(), Some("Daylight!"));
        assert!(catalog.end_narration(Outcome::Lose).is_some());
        assert!(catalog.end_narration(Outcome::Continue).is_none());
    }

    #[test]
    fn test_rule_view_hides_local_fields() {
        let catalog = Catalog::from_json(&minimal().to_string()).unwrap();
        let view = serde_json::to_value(catalog.rule_view()).unwrap();

        let keys: Vec<_> = view.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys.len(), 4);
        for key in ["COMMANDS", "LOCKS", "QUEST", "END_CONDITIONS"] {
            assert!(view.get(key).is_some(), "missing {key}");
        }
        assert!(view.get("START").is_none());
        assert!(view.get("INVENTORY_LIMIT").is_none());
    }

    #[test]
    fn test_prefix_matching() {
        let mut doc = minimal();
        doc["COMMANDS"] = json!(["Look", "take <item>", "  ", ""]);
        let catalog = Catalog::from_json(&doc.to_string()).unwrap();

        let prefixes: Vec<_> = catalog.action_prefixes().collect();
        assert_eq!(prefixes, vec!["look", "take"]);
        assert!(catalog.accepts("look around"));
        assert!(catalog.accepts("take the torch"));
        assert!(!catalog.accepts("dance"));
        assert!(!catalog.accepts(""));
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let err = Catalog::load("/definitely/not/here/rules.json")
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Io { .. }));
        assert!(err.to_string().contains("rules.json"));
    }
}
