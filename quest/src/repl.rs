//! The line-oriented play loop.

use quest_core::{Catalog, GameSession, GameState, SessionError, TurnOutput};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Play until the game ends, the player quits, or stdin closes.
pub async fn run(mut session: GameSession) -> anyhow::Result<()> {
    if let Some(banner) = banner(session.catalog()) {
        println!("{banner}\n");
    }
    println!("Type 'help' for a list of commands.");
    println!("{}", status_line(session.state()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\n> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match session.submit(&line).await {
            Ok(output) => println!("{}", render(&output, session.state())),
            Err(SessionError::Terminated) => break,
            Err(SessionError::Persist(e)) => println!("Could not access the save file: {e}"),
            Err(e @ SessionError::Oracle(_)) => {
                println!("The game master is not answering ({e}). Try again.")
            }
        }

        if session.is_terminated() {
            break;
        }
    }

    Ok(())
}

/// Player-facing text for one input's result.
pub fn render(output: &TurnOutput, state: &GameState) -> String {
    match output {
        TurnOutput::Help { commands } => format!("Available commands: {}", commands.join(", ")),
        TurnOutput::Inventory { items } if items.is_empty() => "Inventory: (empty)".to_string(),
        TurnOutput::Inventory { items } => format!("Inventory: {}", items.join(", ")),
        TurnOutput::Saved { .. } => "Game saved.".to_string(),
        TurnOutput::Loaded { .. } => format!("Game loaded.\n{}", status_line(state)),
        TurnOutput::Quit => "Exiting game.".to_string(),
        TurnOutput::Rejected(e) => e.to_string(),
        TurnOutput::Played(report) => {
            let mut lines = vec![String::new(), report.narration.clone()];
            lines.extend(report.notices.iter().map(|n| n.to_string()));
            match &report.end_narration {
                Some(ending) => lines.push(ending.clone()),
                None => lines.push(status_line(state)),
            }
            lines.join("\n")
        }
    }
}

/// The quest title and premise, when the catalog has them.
pub fn banner(catalog: &Catalog) -> Option<String> {
    let title = catalog.quest.get("title")?.as_str()?;
    let intro = ["premise", "goal"]
        .iter()
        .find_map(|key| catalog.quest.get(*key).and_then(|v| v.as_str()));

    Some(match intro {
        Some(intro) => format!("{title}\n{intro}"),
        None => title.to_string(),
    })
}

pub fn status_line(state: &GameState) -> String {
    format!("[turn {} | hp {}]", state.turns, state.hp())
}
