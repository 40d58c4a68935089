//! Classification of player input.
//!
//! Input is classified before anything is mutated: a meta command is handled
//! locally and never reaches the oracle, an action is validated against the
//! catalog's command prefixes, and everything else is rejected.

use crate::catalog::Catalog;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Local commands that cost no turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaCommand {
    Help,
    Inventory,
    Save,
    Load,
    Quit,
}

impl MetaCommand {
    pub const ALL: [MetaCommand; 5] = [
        MetaCommand::Help,
        MetaCommand::Inventory,
        MetaCommand::Save,
        MetaCommand::Load,
        MetaCommand::Quit,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MetaCommand::Help => "help",
            MetaCommand::Inventory => "inventory",
            MetaCommand::Save => "save",
            MetaCommand::Load => "load",
            MetaCommand::Quit => "quit",
        }
    }
}

impl fmt::Display for MetaCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MetaCommand {
    type Err = ();

    /// Exact match on normalized input only; `save game` is not `save`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MetaCommand::ALL
            .into_iter()
            .find(|meta| meta.name() == s)
            .ok_or(())
    }
}

/// A classified line of player input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Meta(MetaCommand),

    /// A game action, already normalized (trimmed and lower-cased).
    Action(String),
}

/// Input that is neither a meta command nor a known action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid command. Type 'help' for a list of commands.")]
pub struct UnknownCommand {
    pub input: String,
}

/// Trim and lower-case raw input.
pub fn normalize_input(input: &str) -> String {
    input.trim().to_lowercase()
}

/// Classify raw input against the catalog.
pub fn classify(input: &str, catalog: &Catalog) -> Result<Command, UnknownCommand> {
    let input = normalize_input(input);

    if let Ok(meta) = input.parse::<MetaCommand>() {
        return Ok(Command::Meta(meta));
    }

    if !input.is_empty() && catalog.accepts(&input) {
        return Ok(Command::Action(input));
    }

    Err(UnknownCommand { input })
}
