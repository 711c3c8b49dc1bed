//! Tracing subscriber setup: an `EnvFilter`, a stderr `fmt` layer in the
//! configured format and an optional daily rolling log file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

use crate::config::LogFormat;

pub const ENV_LOG: &str = "PIPELINE_LOG";
const LOG_FILE_PREFIX: &str = "pipeline-board.log";

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// `--verbose` on the command line; forces `debug` when no env filter is set.
    pub verbose: bool,
    pub level: String,
    pub format: LogFormat,
    pub log_dir: Option<PathBuf>,
}

impl TelemetryConfig {
    pub fn new(verbose: bool, level: impl Into<String>, format: LogFormat) -> Self {
        Self {
            verbose,
            level: level.into(),
            format,
            log_dir: None,
        }
    }

    pub fn with_log_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.log_dir = dir;
        self
    }
}

/// Keeps the non-blocking file writer flushing until dropped.
pub struct TelemetryGuard {
    _guards: Vec<tracing_appender::non_blocking::WorkerGuard>,
}

pub fn init(config: TelemetryConfig) -> Result<TelemetryGuard> {
    let directives = filter_directives(
        &config.level,
        config.verbose,
        std::env::var(ENV_LOG).ok(),
        std::env::var("RUST_LOG").ok(),
    );
    let filter = EnvFilter::try_new(&directives)
        .or_else(|_| EnvFilter::try_new("info"))
        .context("Failed to build log filter")?;

    let mut guards = Vec::new();
    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    layers.push(build_stderr_layer(config.format));

    let mut file_setup_error = None;
    if let Some(dir) = &config.log_dir {
        match fs::create_dir_all(dir) {
            Ok(()) => {
                let (layer, guard) = build_file_layer(config.format, dir);
                layers.push(layer);
                guards.push(guard);
            }
            Err(err) => {
                file_setup_error =
                    Some(format!("log dir init failed for {}: {err}", dir.display()));
            }
        }
    }

    layers.push(Box::new(filter));

    Registry::default()
        .with(layers)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    if let Some(error) = file_setup_error {
        tracing::warn!("{error}");
    }

    Ok(TelemetryGuard { _guards: guards })
}

/// Filter directives in priority order: `PIPELINE_LOG`, `RUST_LOG`,
/// `--verbose`, then the configured level.
fn filter_directives(
    level: &str,
    verbose: bool,
    pipeline_log: Option<String>,
    rust_log: Option<String>,
) -> String {
    pipeline_log
        .into_iter()
        .chain(rust_log)
        .find(|v| !v.trim().is_empty())
        .unwrap_or_else(|| {
            if verbose {
                "debug".to_string()
            } else {
                level.to_string()
            }
        })
}

fn build_stderr_layer(format: LogFormat) -> Box<dyn Layer<Registry> + Send + Sync> {
    match format {
        LogFormat::Pretty => Box::new(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true),
        ),
        LogFormat::Json => Box::new(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_current_span(true),
        ),
    }
}

fn build_file_layer(
    format: LogFormat,
    dir: &Path,
) -> (
    Box<dyn Layer<Registry> + Send + Sync>,
    tracing_appender::non_blocking::WorkerGuard,
) {
    let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let layer: Box<dyn Layer<Registry> + Send + Sync> = match format {
        LogFormat::Pretty => Box::new(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true),
        ),
        LogFormat::Json => Box::new(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(writer)
                .with_target(true),
        ),
    };
    (layer, guard)
}
