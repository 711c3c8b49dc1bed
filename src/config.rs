//! Configuration for the pipeline board, read from `.pipeline/pipeline.toml`.
//!
//! Settings are layered file → environment → CLI. Every section and key is
//! optional; missing values fall back to the defaults shown below.
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! port = 3142
//! dev_mode = false
//!
//! [database]
//! path = ".pipeline/crm.db"
//!
//! [board]
//! current_user = "me"
//! default_sort = "manual"
//! card_warning_days = 14
//! card_danger_days = 30
//! header_warning_days = 30
//! header_danger_days = 60
//!
//! [logging]
//! level = "info"
//! format = "pretty"
//! directory = ".pipeline/logs"
//! ```
//!
//! | Variable           | Overrides            |
//! |--------------------|----------------------|
//! | `PIPELINE_DB_PATH` | `database.path`      |
//! | `PIPELINE_USER`    | `board.current_user` |
//! | `PIPELINE_PORT`    | `server.port`        |

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use pipeline_common::{SortMode, ViewState};

use crate::board::TimeThresholds;

pub const PIPELINE_DIR: &str = ".pipeline";
pub const CONFIG_FILE: &str = "pipeline.toml";

pub const ENV_DB_PATH: &str = "PIPELINE_DB_PATH";
pub const ENV_USER: &str = "PIPELINE_USER";
pub const ENV_PORT: &str = "PIPELINE_PORT";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_port")]
    pub port: u16,
    /// Permissive CORS for a local frontend dev server.
    #[serde(default)]
    pub dev_mode: bool,
}

fn default_port() -> u16 {
    3142
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            port: default_port(),
            dev_mode: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSection {
    /// SQLite file, relative to the project directory unless absolute.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

fn default_db_path() -> PathBuf {
    PathBuf::from(PIPELINE_DIR).join("crm.db")
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardSection {
    /// Owner id used by the `my_deals` quick filter and `--mine` scope.
    #[serde(default = "default_current_user")]
    pub current_user: String,
    #[serde(default)]
    pub default_sort: SortMode,
    #[serde(default = "default_card_warning_days")]
    pub card_warning_days: i64,
    #[serde(default = "default_card_danger_days")]
    pub card_danger_days: i64,
    #[serde(default = "default_header_warning_days")]
    pub header_warning_days: i64,
    #[serde(default = "default_header_danger_days")]
    pub header_danger_days: i64,
}

fn default_current_user() -> String {
    "me".to_string()
}

fn default_card_warning_days() -> i64 {
    TimeThresholds::CARD.warning_days
}

fn default_card_danger_days() -> i64 {
    TimeThresholds::CARD.danger_days
}

fn default_header_warning_days() -> i64 {
    TimeThresholds::HEADER.warning_days
}

fn default_header_danger_days() -> i64 {
    TimeThresholds::HEADER.danger_days
}

impl Default for BoardSection {
    fn default() -> Self {
        Self {
            current_user: default_current_user(),
            default_sort: SortMode::default(),
            card_warning_days: default_card_warning_days(),
            card_danger_days: default_card_danger_days(),
            header_warning_days: default_header_warning_days(),
            header_danger_days: default_header_danger_days(),
        }
    }
}

impl BoardSection {
    pub fn card_thresholds(&self) -> TimeThresholds {
        TimeThresholds {
            warning_days: self.card_warning_days,
            danger_days: self.card_danger_days,
        }
    }

    pub fn header_thresholds(&self) -> TimeThresholds {
        TimeThresholds {
            warning_days: self.header_warning_days,
            danger_days: self.header_danger_days,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Pretty => write!(f, "pretty"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => anyhow::bail!("Invalid log format '{}'. Valid values: pretty, json", s),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSection {
    /// Default filter directive when neither `PIPELINE_LOG` nor `RUST_LOG` is set.
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
    /// Daily rolling log files are written here when set.
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            directory: None,
        }
    }
}

/// Contents of `pipeline.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineToml {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub database: DatabaseSection,
    #[serde(default)]
    pub board: BoardSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

impl PipelineToml {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse pipeline.toml")
    }

    /// Load `pipeline.toml` from `pipeline_dir`, or defaults if it is missing.
    pub fn load_or_default(pipeline_dir: &Path) -> Result<Self> {
        let config_path = pipeline_dir.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).context("Failed to serialize pipeline.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        let pairs = [
            ("card", &self.board.card_warning_days, &self.board.card_danger_days),
            ("header", &self.board.header_warning_days, &self.board.header_danger_days),
        ];
        for (name, warning, danger) in pairs {
            if *warning < 0 || *danger < 0 {
                warnings.push(format!("{} thresholds must not be negative", name));
            }
            if warning >= danger {
                warnings.push(format!(
                    "{}_warning_days ({}) should be below {}_danger_days ({})",
                    name, warning, name, danger
                ));
            }
        }

        if self.board.current_user.trim().is_empty() {
            warnings.push("board.current_user is empty; my_deals will match nothing".to_string());
        }

        if self.server.port == 0 {
            warnings.push("server.port is 0; an ephemeral port will be chosen".to_string());
        }

        warnings
    }
}

/// Values passed on the command line. They win over file and environment.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub port: Option<u16>,
    pub db_path: Option<PathBuf>,
    pub user: Option<String>,
}

/// Resolved configuration for one project directory.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub project_dir: PathBuf,
    pub pipeline_dir: PathBuf,
    pub toml: PipelineToml,
    pub cli: CliOverrides,
}

impl PipelineConfig {
    pub fn new(project_dir: PathBuf) -> Result<Self> {
        let project_dir = project_dir
            .canonicalize()
            .context("Failed to resolve project directory")?;
        let pipeline_dir = project_dir.join(PIPELINE_DIR);
        let toml = PipelineToml::load_or_default(&pipeline_dir)?;

        Ok(Self {
            project_dir,
            pipeline_dir,
            toml,
            cli: CliOverrides::default(),
        })
    }

    pub fn with_cli_args(project_dir: PathBuf, cli: CliOverrides) -> Result<Self> {
        let mut config = Self::new(project_dir)?;
        config.cli = cli;
        Ok(config)
    }

    pub fn config_file(&self) -> PathBuf {
        self.pipeline_dir.join(CONFIG_FILE)
    }

    /// Database path (CLI → env → file), resolved against the project dir.
    pub fn db_path(&self) -> PathBuf {
        let path = self
            .cli
            .db_path
            .clone()
            .or_else(|| std::env::var(ENV_DB_PATH).ok().map(PathBuf::from))
            .unwrap_or_else(|| self.toml.database.path.clone());
        self.resolve(path)
    }

    /// Current user id (CLI → env → file).
    pub fn current_user(&self) -> String {
        self.cli
            .user
            .clone()
            .or_else(|| std::env::var(ENV_USER).ok().filter(|u| !u.trim().is_empty()))
            .unwrap_or_else(|| self.toml.board.current_user.clone())
    }

    /// Server port (CLI → env → file). An unparsable env value is ignored.
    pub fn port(&self) -> u16 {
        self.cli
            .port
            .or_else(|| {
                std::env::var(ENV_PORT)
                    .ok()
                    .and_then(|p| p.trim().parse().ok())
            })
            .unwrap_or(self.toml.server.port)
    }

    pub fn log_dir(&self) -> Option<PathBuf> {
        self.toml
            .logging
            .directory
            .clone()
            .map(|dir| self.resolve(dir))
    }

    /// Starting view for a new board session.
    pub fn view_state(&self) -> ViewState {
        let mut view = ViewState::for_user(&self.current_user());
        view.sort_mode = self.toml.board.default_sort;
        view
    }

    pub fn validate(&self) -> Vec<String> {
        self.toml.validate()
    }

    fn resolve(&self, path: PathBuf) -> PathBuf {
        if path.is_absolute() {
            path
        } else {
            self.project_dir.join(path)
        }
    }
}
