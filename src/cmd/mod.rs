//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module    | Commands handled                 |
//! |-----------|----------------------------------|
//! | `init`    | `Init`                           |
//! | `serve`   | `Serve`                          |
//! | `board`   | `Board`, `Column`, `Card`        |
//! | `moves`   | `Move`                           |
//! | `config`  | `Config`                         |

pub mod board;
pub mod config;
pub mod init;
pub mod moves;
pub mod serve;

pub use board::{cmd_board, cmd_card, cmd_column};
pub use config::cmd_config;
pub use init::cmd_init;
pub use moves::cmd_move;
pub use serve::cmd_serve;

use anyhow::{Context, Result};
use taskboard::board::{BoardService, SqliteGateway};
use taskboard::config::TaskboardConfig;

/// Open the configured store for a one-shot command.
pub(crate) fn open_service(config: &TaskboardConfig) -> Result<BoardService<SqliteGateway>> {
    let db_path = config.db_path();
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create database directory")?;
    }
    let gateway = SqliteGateway::open(&db_path)
        .with_context(|| format!("Failed to open board database: {}", db_path.display()))?;
    Ok(BoardService::new(gateway, config.owner()))
}
