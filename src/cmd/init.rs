//! Project initialization (`taskboard init`).

use anyhow::{Context, Result};

use taskboard::config::{TaskboardConfig, TaskboardToml};

pub async fn cmd_init(config: &TaskboardConfig) -> Result<()> {
    std::fs::create_dir_all(&config.config_dir).with_context(|| {
        format!(
            "Failed to create config directory: {}",
            config.config_dir.display()
        )
    })?;

    let config_path = config.config_path();
    if config_path.exists() {
        println!("Config already exists at {}", config_path.display());
    } else {
        TaskboardToml::default().save(&config_path)?;
        println!("Created {}", config_path.display());
    }

    // Opening the store runs migrations.
    let service = super::open_service(config)?;
    service
        .gateway()
        .close()
        .await
        .context("Failed to close board database")?;
    println!("Board database ready at {}", config.db_path().display());
    Ok(())
}
