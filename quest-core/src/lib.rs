//! Turn engine for text quests narrated by a language model.
//!
//! This crate provides:
//! - A JSON rule catalog describing commands, locks and end conditions
//! - A typed game state with tolerant application of proposed changes
//! - Rule enforcement and end-condition evaluation after every turn
//! - An oracle gateway that sanitizes whatever the model replies
//! - Save files and an append-only transcript
//!
//! # Quick Start
//!
//! ```ignore
//! use quest_core::{Catalog, GameMaster, GameSession, TurnOutput};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let catalog = Catalog::load("rules.json").await?;
//!     let game_master = GameMaster::new(llm::Ollama::from_env()?);
//!
//!     let mut session = GameSession::new(catalog, game_master);
//!
//!     if let TurnOutput::Played(report) = session.submit("look around").await? {
//!         println!("{}", report.narration);
//!     }
//!
//!     session.save("save.json").await?;
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod command;
pub mod oracle;
pub mod outcome;
pub mod persist;
pub mod rules;
pub mod session;
pub mod state;
pub mod testing;
pub mod transcript;

// Primary public API
pub use catalog::{Catalog, CatalogError};
pub use command::{Command, MetaCommand, UnknownCommand};
pub use oracle::{
    GameMaster, GatewayConfig, Oracle, OracleError, OracleRequest, OracleResult,
    TransportFailurePolicy,
};
pub use outcome::Outcome;
pub use session::{
    GameSession, InvalidCommandPolicy, Phase, SessionConfig, SessionError, TurnOutput, TurnReport,
};
pub use state::{ChangeOp, GameState, TurnRecord};
pub use testing::{MockOracle, MockReply, TestHarness};
