//! Rule enforcement run after every turn.
//!
//! Whatever the oracle proposed, the state leaves a turn satisfying two
//! invariants: running out of hit points raises the `hp_zero` flag, and the
//! inventory never exceeds the catalog's limit. Violations are repaired, not
//! reported as errors.

use crate::catalog::Catalog;
use crate::state::{GameState, HP_ZERO_FLAG};
use std::fmt;
use tracing::info;

/// Something the player should be told about after enforcement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Items past the inventory limit were dropped.
    InventoryFull { dropped: Vec<String> },

    /// Hit points reached zero this turn.
    HpDepleted,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::InventoryFull { dropped } => write!(
                f,
                "Inventory full! You can't carry more items. (left behind: {})",
                dropped.join(", ")
            ),
            Notice::HpDepleted => write!(f, "Your strength gives out."),
        }
    }
}

/// Restore the state invariants, returning notices for the player.
///
/// Idempotent: a second call on the result changes nothing and yields no
/// notices.
pub fn enforce(state: &mut GameState, catalog: &Catalog) -> Vec<Notice> {
    let mut notices = Vec::new();

    if state.hp() <= 0 && !state.flag(HP_ZERO_FLAG) {
        info!(hp = state.hp(), "Hit points exhausted, raising {HP_ZERO_FLAG}");
        state.set_flag(HP_ZERO_FLAG, true);
        notices.push(Notice::HpDepleted);
    }

    let limit = catalog.inventory_limit;
    if state.inventory.len() > limit {
        let dropped = state.inventory.split_off(limit);
        info!(limit, ?dropped, "Inventory over limit, dropping newest items");
        notices.push(Notice::InventoryFull { dropped });
    }

    notices
}
