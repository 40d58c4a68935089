//! Append-only, human-readable transcript of a game.
//!
//! Each entry looks like:
//!
//! ```text
//! [2025-01-31 18:04:11] PLAYER:
//! open the door
//!
//! ```

use chrono::{DateTime, Local};
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

/// Who wrote a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Player,
    Gm,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Player => f.write_str("PLAYER"),
            Role::Gm => f.write_str("GM"),
        }
    }
}

/// Format one entry.
pub fn format_entry(at: DateTime<Local>, role: Role, content: &str) -> String {
    format!("[{}] {role}:\n{content}\n\n", at.format("%Y-%m-%d %H:%M:%S"))
}

/// A transcript file.
#[derive(Debug, Clone)]
pub struct Transcript {
    path: PathBuf,
}

impl Transcript {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append an entry stamped with the current local time.
    pub async fn append(&self, role: Role, content: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(format_entry(Local::now(), role, content).as_bytes())
            .await?;
        file.flush().await
    }
}
