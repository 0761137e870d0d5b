//! Card and column moves (`taskboard move`).

use anyhow::Result;
use console::style;

use taskboard::board::DragOutcome;
use taskboard::config::TaskboardConfig;
use taskboard_common::{CardId, ColumnId};

use super::super::MoveCommands;
use super::open_service;

pub async fn cmd_move(config: &TaskboardConfig, command: MoveCommands) -> Result<()> {
    let service = open_service(config)?;

    let (item, outcome) = match command {
        MoveCommands::Card { id, to, index } => {
            let outcome = service
                .move_card(&CardId::from(id.as_str()), &ColumnId::from(to), index)
                .await?;
            (id, outcome)
        }
        MoveCommands::Column { id, index } => {
            let outcome = service
                .move_column(&ColumnId::from(id.as_str()), index)
                .await?;
            (id, outcome)
        }
    };

    report(&item, &outcome)
}

fn report(item: &str, outcome: &DragOutcome) -> Result<()> {
    if outcome.applied.is_empty() && outcome.failures.is_empty() {
        println!("{} is already there; nothing to do.", item);
        return Ok(());
    }

    println!(
        "Moved {} ({} records updated)",
        style(item).bold(),
        outcome.applied.len()
    );

    if !outcome.is_complete() {
        for failure in &outcome.failures {
            println!(
                "  {} {}: {}",
                style("Failed:").red().bold(),
                failure.key,
                failure.error
            );
        }
        anyhow::bail!(
            "{} of {} writes failed; run 'taskboard board repair' to restore ordering",
            outcome.failures.len(),
            outcome.applied.len() + outcome.failures.len()
        );
    }
    Ok(())
}
