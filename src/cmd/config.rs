//! Configuration view and validation commands (`taskboard config`).

use anyhow::Result;

use taskboard::config::{TaskboardConfig, TaskboardToml};

use super::super::ConfigCommands;

fn print_sections(toml: &TaskboardToml) {
    println!("[user]");
    println!("  owner = \"{}\"", toml.user.owner);
    println!();
    println!("[storage]");
    println!("  db_path = \"{}\"", toml.storage.db_path.display());
    println!();
    println!("[server]");
    println!("  host = \"{}\"", toml.server.host);
    println!("  port = {}", toml.server.port);
    println!("  dev_mode = {}", toml.server.dev_mode);
    println!();
    println!("[logging]");
    println!("  level = \"{}\"", toml.logging.level);
    println!("  json = {}", toml.logging.json);
    if let Some(dir) = &toml.logging.directory {
        println!("  directory = \"{}\"", dir.display());
    }
    println!();
}

pub fn cmd_config(config: &TaskboardConfig, command: Option<ConfigCommands>) -> Result<()> {
    let config_path = config.config_path();

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Taskboard Configuration");
            println!("=======================");
            println!();

            if config_path.exists() {
                println!("Config file: {}", config_path.display());
                println!();
                print_sections(&TaskboardToml::load(&config_path)?);
            } else {
                println!("No taskboard.toml found at {}", config_path.display());
                println!();
                println!("Using default configuration:");
                print_sections(&TaskboardToml::default());
                println!("Run 'taskboard config init' to create a taskboard.toml file.");
                println!();
            }

            println!("Effective values (with env/CLI overrides):");
            println!("  owner = \"{}\"", config.owner());
            println!("  db_path = \"{}\"", config.db_path().display());
            println!("  log level = \"{}\"", config.log_level());
            println!();
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            let toml = if config_path.exists() {
                TaskboardToml::load(&config_path)?
            } else {
                println!("No taskboard.toml found. Checking defaults with env overrides.");
                config.toml.clone()
            };
            let warnings = toml.validate();

            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("taskboard.toml already exists at {}", config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            if !config.config_dir.exists() {
                std::fs::create_dir_all(&config.config_dir)?;
            }

            TaskboardToml::default().save(&config_path)?;

            println!("Created taskboard.toml at {}", config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [user] owner");
            println!("  - [storage] db_path");
            println!("  - [server] host, port, dev_mode");
            println!("  - [logging] level, json, directory");
            println!();
        }
    }

    Ok(())
}
