//! Configuration read from `.taskboard/taskboard.toml`.
//!
//! Settings are layered: file → environment → CLI.
//!
//! ```toml
//! [user]
//! owner = "local"
//!
//! [storage]
//! db_path = ".taskboard/taskboard.db"
//!
//! [server]
//! host = "127.0.0.1"
//! port = 3141
//! dev_mode = false
//!
//! [logging]
//! level = "info"
//! json = false
//! directory = ".taskboard/logs"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::board::server::ServerConfig;

pub const CONFIG_DIR: &str = ".taskboard";
pub const CONFIG_FILE: &str = "taskboard.toml";

pub const ENV_OWNER: &str = "TASKBOARD_OWNER";
pub const ENV_DB: &str = "TASKBOARD_DB";
pub const ENV_LOG: &str = "TASKBOARD_LOG";

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

/// Identity stamped on every record this process creates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSection {
    #[serde(default = "default_owner")]
    pub owner: String,
}

fn default_owner() -> String {
    "local".to_string()
}

impl Default for UserSection {
    fn default() -> Self {
        Self {
            owner: default_owner(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSection {
    /// Database file, relative to the project directory unless absolute.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

fn default_db_path() -> PathBuf {
    PathBuf::from(CONFIG_DIR).join("taskboard.db")
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Permissive CORS for a local front-end dev server.
    #[serde(default)]
    pub dev_mode: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3141
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            dev_mode: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSection {
    /// Level or `EnvFilter` directive. `RUST_LOG` wins when set.
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
    /// Daily rolling log files go here when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
            directory: None,
        }
    }
}

/// The complete taskboard.toml structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskboardToml {
    #[serde(default)]
    pub user: UserSection,
    #[serde(default)]
    pub storage: StorageSection,
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

impl TaskboardToml {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse taskboard.toml")
    }

    /// Load `taskboard.toml` from `config_dir`, or defaults if it is absent.
    pub fn load_or_default(config_dir: &Path) -> Result<Self> {
        let config_path = config_dir.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).context("Failed to serialize taskboard.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Overlay `TASKBOARD_*` variables from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Overlay environment values provided by `lookup`. Empty values are ignored.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(owner) = get(ENV_OWNER) {
            self.user.owner = owner;
        }
        if let Some(db) = get(ENV_DB) {
            self.storage.db_path = PathBuf::from(db);
        }
        if let Some(level) = get(ENV_LOG) {
            self.logging.level = level;
        }
    }

    /// Check for suspicious values. Returns human-readable warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.user.owner.trim().is_empty() {
            warnings.push("[user] owner is empty; new records will have no owner".to_string());
        }

        if self.server.port == 0 {
            warnings.push("[server] port is 0; the OS will pick a random port".to_string());
        }

        if !is_valid_level(&self.logging.level) {
            warnings.push(format!(
                "Invalid [logging] level '{}': expected one of {} or a filter directive",
                self.logging.level,
                LOG_LEVELS.join(", ")
            ));
        }

        warnings
    }
}

/// A bare level name, or a directive list such as `taskboard=debug,info`.
fn is_valid_level(level: &str) -> bool {
    let level = level.trim();
    if level.is_empty() {
        return false;
    }
    level.split(',').all(|directive| {
        let lvl = directive.rsplit('=').next().unwrap_or(directive).trim();
        LOG_LEVELS.contains(&lvl.to_lowercase().as_str())
    })
}

/// Resolved runtime configuration.
///
/// Merges, in increasing priority:
/// 1. taskboard.toml file
/// 2. Environment variables
/// 3. CLI arguments
#[derive(Debug, Clone)]
pub struct TaskboardConfig {
    pub project_dir: PathBuf,
    pub config_dir: PathBuf,
    pub toml: TaskboardToml,
    pub verbose: bool,
}

impl TaskboardConfig {
    /// Load configuration for a project directory. The directory must exist.
    pub fn new(project_dir: PathBuf) -> Result<Self> {
        let project_dir = project_dir
            .canonicalize()
            .context("Failed to resolve project directory")?;
        let config_dir = project_dir.join(CONFIG_DIR);
        let mut toml = TaskboardToml::load_or_default(&config_dir)?;
        toml.apply_env();

        Ok(Self {
            project_dir,
            config_dir,
            toml,
            verbose: false,
        })
    }

    /// Load configuration with CLI overrides.
    pub fn with_cli_args(project_dir: PathBuf, verbose: bool) -> Result<Self> {
        let mut config = Self::new(project_dir)?;
        config.verbose = verbose;
        Ok(config)
    }

    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }

    pub fn is_initialized(&self) -> bool {
        self.config_dir.is_dir()
    }

    pub fn owner(&self) -> &str {
        &self.toml.user.owner
    }

    /// Database path resolved against the project directory.
    pub fn db_path(&self) -> PathBuf {
        self.resolve(&self.toml.storage.db_path)
    }

    pub fn log_dir(&self) -> Option<PathBuf> {
        self.toml.logging.directory.as_deref().map(|dir| self.resolve(dir))
    }

    /// `--verbose` raises the level to debug.
    pub fn log_level(&self) -> &str {
        if self.verbose {
            "debug"
        } else {
            &self.toml.logging.level
        }
    }

    /// Server settings, with optional CLI overrides for port and dev mode.
    pub fn server_config(&self, port: Option<u16>, dev_mode: bool) -> ServerConfig {
        ServerConfig {
            host: self.toml.server.host.clone(),
            port: port.unwrap_or(self.toml.server.port),
            db_path: self.db_path(),
            owner: self.owner().to_string(),
            dev_mode: dev_mode || self.toml.server.dev_mode,
        }
    }

    pub fn validate(&self) -> Vec<String> {
        self.toml.validate()
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_dir.join(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let toml = TaskboardToml::default();
        assert_eq!(toml.user.owner, "local");
        assert_eq!(toml.storage.db_path, PathBuf::from(".taskboard/taskboard.db"));
        assert_eq!(toml.server.host, "127.0.0.1");
        assert_eq!(toml.server.port, 3141);
        assert!(!toml.server.dev_mode);
        assert_eq!(toml.logging.level, "info");
        assert!(!toml.logging.json);
        assert!(toml.logging.directory.is_none());
    }

    #[test]
    fn test_parse_empty_uses_defaults() {
        let toml = TaskboardToml::parse("").unwrap();
        assert_eq!(toml.server.port, 3141);
        assert_eq!(toml.user.owner, "local");
    }

    #[test]
    fn test_parse_partial_sections() {
        let content = r#"
[user]
owner = "ana"

[server]
port = 8080
dev_mode = true

[logging]
json = true
directory = "logs"
"#;
        let toml = TaskboardToml::parse(content).unwrap();
        assert_eq!(toml.user.owner, "ana");
        assert_eq!(toml.server.port, 8080);
        assert_eq!(toml.server.host, "127.0.0.1");
        assert!(toml.server.dev_mode);
        assert!(toml.logging.json);
        assert_eq!(toml.logging.level, "info");
        assert_eq!(toml.logging.directory, Some(PathBuf::from("logs")));
    }

    #[test]
    fn test_parse_invalid_toml() {
        let err = TaskboardToml::parse("[server\nport = ").unwrap_err();
        assert!(err.to_string().contains("taskboard.toml"));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);

        let mut toml = TaskboardToml::default();
        toml.user.owner = "sam".into();
        toml.server.port = 9000;
        toml.save(&path).unwrap();

        let loaded = TaskboardToml::load(&path).unwrap();
        assert_eq!(loaded.user.owner, "sam");
        assert_eq!(loaded.server.port, 9000);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempdir().unwrap();
        let toml = TaskboardToml::load_or_default(dir.path()).unwrap();
        assert_eq!(toml.user.owner, "local");
    }

    #[test]
    fn test_env_overrides_file() {
        let mut toml = TaskboardToml::parse("[user]\nowner = \"file\"").unwrap();
        let env: HashMap<&str, &str> = [
            (ENV_OWNER, "env-owner"),
            (ENV_DB, "/tmp/other.db"),
            (ENV_LOG, "debug"),
        ]
        .into_iter()
        .collect();

        toml.apply_env_from(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(toml.user.owner, "env-owner");
        assert_eq!(toml.storage.db_path, PathBuf::from("/tmp/other.db"));
        assert_eq!(toml.logging.level, "debug");
    }

    #[test]
    fn test_blank_env_values_are_ignored() {
        let mut toml = TaskboardToml::default();
        toml.apply_env_from(|key| (key == ENV_OWNER).then(|| "  ".to_string()));
        assert_eq!(toml.user.owner, "local");
    }

    #[test]
    fn test_validate_valid() {
        assert!(TaskboardToml::default().validate().is_empty());

        let mut toml = TaskboardToml::default();
        toml.logging.level = "taskboard=debug,warn".into();
        assert!(toml.validate().is_empty());
    }

    #[test]
    fn test_validate_reports_each_problem() {
        let mut toml = TaskboardToml::default();
        toml.user.owner = " ".into();
        toml.server.port = 0;
        toml.logging.level = "loud".into();

        let warnings = toml.validate();
        assert_eq!(warnings.len(), 3);
        assert!(warnings[0].contains("owner"));
        assert!(warnings[1].contains("port"));
        assert!(warnings[2].contains("loud"));
    }

    #[test]
    fn test_config_resolves_paths_against_project_dir() {
        let dir = tempdir().unwrap();
        let config = TaskboardConfig::new(dir.path().to_path_buf()).unwrap();
        let root = dir.path().canonicalize().unwrap();

        assert_eq!(config.config_path(), root.join(".taskboard/taskboard.toml"));
        assert!(!config.is_initialized());
        assert!(config.log_dir().is_none());

        let mut config = config;
        config.toml.storage.db_path = PathBuf::from("/var/board.db");
        assert_eq!(config.db_path(), PathBuf::from("/var/board.db"));
        config.toml.logging.directory = Some(PathBuf::from("logs"));
        assert_eq!(config.log_dir(), Some(root.join("logs")));
    }

    #[test]
    fn test_config_reads_file_from_config_dir() {
        let dir = tempdir().unwrap();
        let config_dir = dir.path().join(CONFIG_DIR);
        std::fs::create_dir_all(&config_dir).unwrap();
        std::fs::write(config_dir.join(CONFIG_FILE), "[server]\nport = 4000\n").unwrap();

        let config = TaskboardConfig::new(dir.path().to_path_buf()).unwrap();
        assert!(config.is_initialized());
        assert_eq!(config.toml.server.port, 4000);
    }

    #[test]
    fn test_cli_overrides() {
        let dir = tempdir().unwrap();
        let config = TaskboardConfig::with_cli_args(dir.path().to_path_buf(), true).unwrap();
        assert_eq!(config.log_level(), "debug");

        let server = config.server_config(Some(5555), true);
        assert_eq!(server.port, 5555);
        assert!(server.dev_mode);
        assert!(server.db_path.ends_with(".taskboard/taskboard.db"));

        let server = config.server_config(None, false);
        assert_eq!(server.port, config.toml.server.port);
    }
}
