use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use taskboard::config::TaskboardConfig;
use taskboard::logging::{self, LogSettings};

mod cmd;

#[derive(Parser)]
#[command(name = "taskboard")]
#[command(version, about = "Local-first kanban board")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Project directory holding `.taskboard/` (defaults to the current directory)
    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create `.taskboard/` with a default config and an empty database
    Init,
    /// Serve the HTTP API and live change feed
    Serve {
        /// Port to serve on (overrides taskboard.toml)
        #[arg(short, long)]
        port: Option<u16>,

        /// Enable dev mode (permissive CORS for a local front-end dev server)
        #[arg(long)]
        dev: bool,
    },
    /// Manage boards
    Board {
        #[command(subcommand)]
        command: BoardCommands,
    },
    /// Manage columns
    Column {
        #[command(subcommand)]
        command: ColumnCommands,
    },
    /// Manage cards
    Card {
        #[command(subcommand)]
        command: CardCommands,
    },
    /// Move a card or column, keeping every list densely ordered
    Move {
        #[command(subcommand)]
        command: MoveCommands,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum BoardCommands {
    /// List all boards
    List,
    /// Create a board
    Create { title: String },
    /// Show a board with its columns and cards
    Show { id: String },
    /// Rename a board
    Rename { id: String, title: String },
    /// Delete a board and everything on it
    Delete { id: String },
    /// Renumber columns and cards so every list is ordered 0..n-1
    Repair { id: String },
}

#[derive(Subcommand, Clone)]
pub enum ColumnCommands {
    /// Append a column to a board
    Add { board: String, title: String },
    /// Rename a column
    Rename { id: String, title: String },
    /// Delete a column and its cards
    Delete { id: String },
}

#[derive(Subcommand, Clone)]
pub enum CardCommands {
    /// Add a card to a column
    Add {
        column: String,
        title: String,
        /// Insert at this position instead of appending
        #[arg(long)]
        order: Option<u32>,
    },
    /// Rename a card
    Rename { id: String, title: String },
    /// Delete a card
    Delete { id: String },
}

#[derive(Subcommand, Clone)]
pub enum MoveCommands {
    /// Move a card within or across columns
    Card {
        id: String,
        /// Destination column
        #[arg(long)]
        to: String,
        /// Destination index (appends when omitted)
        #[arg(long)]
        index: Option<usize>,
    },
    /// Move a column to a new index on its board
    Column {
        id: String,
        #[arg(long)]
        index: usize,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Initialize a default taskboard.toml file
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };
    let config = TaskboardConfig::with_cli_args(project_dir, cli.verbose)?;
    let _log_guard = logging::init(&LogSettings::from_config(&config))?;

    match &cli.command {
        Commands::Init => cmd::cmd_init(&config).await?,
        Commands::Serve { port, dev } => cmd::cmd_serve(&config, *port, *dev).await?,
        Commands::Board { command } => cmd::cmd_board(&config, command.clone()).await?,
        Commands::Column { command } => cmd::cmd_column(&config, command.clone()).await?,
        Commands::Card { command } => cmd::cmd_card(&config, command.clone()).await?,
        Commands::Move { command } => cmd::cmd_move(&config, command.clone()).await?,
        Commands::Config { command } => cmd::cmd_config(&config, command.clone())?,
    }

    Ok(())
}
