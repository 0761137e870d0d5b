use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

use crate::config::TaskboardConfig;

const LOG_FILE_PREFIX: &str = "taskboard.log";

#[derive(Debug, Clone)]
pub struct LogSettings {
    /// Default filter directive. `RUST_LOG` replaces it when set.
    pub level: String,
    pub json: bool,
    pub directory: Option<PathBuf>,
}

impl LogSettings {
    pub fn from_config(config: &TaskboardConfig) -> Self {
        Self {
            level: config.log_level().to_string(),
            json: config.toml.logging.json,
            directory: config.log_dir(),
        }
    }
}

/// `RUST_LOG` if set and valid, else `level`, else `info`.
pub fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn stderr_layer(json: bool) -> BoxedLayer {
    if json {
        Box::new(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_current_span(true),
        )
    } else {
        Box::new(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(std::io::stderr)
                .with_target(true),
        )
    }
}

fn file_layer(dir: &Path, json: bool) -> Result<(BoxedLayer, WorkerGuard)> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;
    let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let layer: BoxedLayer = if json {
        Box::new(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(writer)
                .with_ansi(false),
        )
    } else {
        Box::new(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false),
        )
    };
    Ok((layer, guard))
}

/// Install the global subscriber. Keep the returned guard alive until exit
/// so buffered file output is flushed.
///
/// Installing twice is not an error; the second call leaves the first
/// subscriber in place.
pub fn init(settings: &LogSettings) -> Result<Option<WorkerGuard>> {
    let mut layers: Vec<BoxedLayer> = vec![stderr_layer(settings.json)];
    let mut guard = None;

    if let Some(dir) = &settings.directory {
        let (layer, g) = file_layer(dir, settings.json)?;
        layers.push(layer);
        guard = Some(g);
    }

    layers.push(Box::new(build_filter(&settings.level)));

    if Registry::default().with(layers).try_init().is_err() {
        tracing::debug!("Global subscriber already installed");
    }

    Ok(guard)
}
