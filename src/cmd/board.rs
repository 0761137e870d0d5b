//! Board, column and card lifecycle commands.

use anyhow::{Context, Result};
use console::style;
use std::fmt::Write as _;

use taskboard::board::BoardView;
use taskboard::config::TaskboardConfig;
use taskboard_common::{BoardId, CardId, ColumnId};

use super::super::{BoardCommands, CardCommands, ColumnCommands};
use super::open_service;

pub async fn cmd_board(config: &TaskboardConfig, command: BoardCommands) -> Result<()> {
    let service = open_service(config)?;

    match command {
        BoardCommands::List => {
            let boards = service.list_boards().await?;
            if boards.is_empty() {
                println!("No boards yet. Run 'taskboard board create <title>' to add one.");
                return Ok(());
            }
            println!("{:<38} {:<12} Title", "Id", "Owner");
            for board in boards {
                println!("{:<38} {:<12} {}", board.id, board.owner, board.title);
            }
        }
        BoardCommands::Create { title } => {
            let board = service.create_board(&title).await?;
            println!("Created board {}", style(&board.title).bold());
            println!("  id: {}", board.id);
        }
        BoardCommands::Show { id } => {
            let view = service
                .board_view(&BoardId::from(id.as_str()))
                .await
                .with_context(|| format!("Failed to load board {}", id))?;
            print!("{}", render_board(&view));
        }
        BoardCommands::Rename { id, title } => {
            let board = service.rename_board(&BoardId::from(id), &title).await?;
            println!("Renamed board {} to {}", board.id, style(&board.title).bold());
        }
        BoardCommands::Delete { id } => {
            service.delete_board(&BoardId::from(id.as_str())).await?;
            println!("Deleted board {}", id);
        }
        BoardCommands::Repair { id } => {
            let report = service.repair_board(&BoardId::from(id.as_str())).await?;
            if report.total() == 0 {
                println!("Board {} is already in order.", id);
            } else {
                println!(
                    "Renumbered {} columns and {} cards on board {}",
                    report.columns, report.cards, id
                );
            }
        }
    }
    Ok(())
}

pub async fn cmd_column(config: &TaskboardConfig, command: ColumnCommands) -> Result<()> {
    let service = open_service(config)?;

    match command {
        ColumnCommands::Add { board, title } => {
            let column = service.create_column(&BoardId::from(board), &title).await?;
            println!(
                "Added column {} at position {}",
                style(&column.title).bold(),
                column.order
            );
            println!("  id: {}", column.id);
        }
        ColumnCommands::Rename { id, title } => {
            let column = service.rename_column(&ColumnId::from(id), &title).await?;
            println!("Renamed column {} to {}", column.id, style(&column.title).bold());
        }
        ColumnCommands::Delete { id } => {
            service.delete_column(&ColumnId::from(id.as_str())).await?;
            println!("Deleted column {}", id);
        }
    }
    Ok(())
}

pub async fn cmd_card(config: &TaskboardConfig, command: CardCommands) -> Result<()> {
    let service = open_service(config)?;

    match command {
        CardCommands::Add {
            column,
            title,
            order,
        } => {
            let card = service
                .create_card(&ColumnId::from(column), &title, order)
                .await?;
            println!(
                "Added card {} at position {}",
                style(&card.title).bold(),
                card.order
            );
            println!("  id: {}", card.id);
        }
        CardCommands::Rename { id, title } => {
            let card = service.rename_card(&CardId::from(id), &title).await?;
            println!("Renamed card {} to {}", card.id, style(&card.title).bold());
        }
        CardCommands::Delete { id } => {
            service.delete_card(&CardId::from(id.as_str())).await?;
            println!("Deleted card {}", id);
        }
    }
    Ok(())
}

/// Columns in order, each followed by its cards.
pub fn render_board(view: &BoardView) -> String {
    let mut out = String::new();
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", style(&view.board.title).bold().cyan());
    let _ = writeln!(out, "{}", style(view.board.id.as_str()).dim());

    if view.columns.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "  (no columns)");
    }

    for column in &view.columns {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{} {} {}",
            style(format!("[{}]", column.column.order)).dim(),
            style(&column.column.title).bold(),
            style(format!("({})", column.cards.len())).dim()
        );
        let _ = writeln!(out, "    {}", style(column.column.id.as_str()).dim());
        for card in &column.cards {
            let _ = writeln!(
                out,
                "  {:>2}. {}  {}",
                card.order,
                card.title,
                style(card.id.as_str()).dim()
            );
        }
    }
    let _ = writeln!(out);
    out
}
