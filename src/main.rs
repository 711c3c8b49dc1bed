use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use pipeline_board::config::{CliOverrides, PipelineConfig};
use pipeline_board::telemetry::{self, TelemetryConfig};

mod cmd;

#[derive(Parser)]
#[command(name = "pipeline-board")]
#[command(version, about = "Sales pipeline board: filter, group and move deals across stages")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    /// SQLite database path. Overrides PIPELINE_DB_PATH and pipeline.toml.
    #[arg(long, global = true)]
    pub db_path: Option<PathBuf>,

    /// Current user id for `my_deals` and `--mine`. Overrides PIPELINE_USER.
    #[arg(long, global = true)]
    pub user: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create .pipeline/, the database and the default stage catalog
    Init {
        /// Also insert a handful of sample companies and deals
        #[arg(long)]
        demo: bool,
    },
    /// Serve the board API and WebSocket events
    Serve {
        /// Port to serve on (default from pipeline.toml)
        #[arg(short, long)]
        port: Option<u16>,

        /// Enable dev mode (permissive CORS, bind all interfaces)
        #[arg(long)]
        dev: bool,
    },
    /// Print the filtered board
    Board(BoardArgs),
    /// Move a deal to another stage through a full drag gesture
    Move {
        /// Deal id or exact deal name
        deal: String,
        /// Stage id or stage name
        stage: String,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(clap::Args, Clone, Default)]
pub struct BoardArgs {
    /// Only deals owned by the current user (owner scope)
    #[arg(long)]
    pub mine: bool,

    /// Case-insensitive search over name, company, contact and value
    #[arg(short, long)]
    pub search: Option<String>,

    /// my_deals, hot_deals, closing_soon, stale_deals, recent or all
    #[arg(short, long)]
    pub quick: Option<String>,

    /// manual, value_desc, value_asc, close_date, days_in_stage or name
    #[arg(long)]
    pub sort: Option<String>,

    #[arg(long)]
    pub min_value: Option<String>,

    #[arg(long)]
    pub max_value: Option<String>,

    /// Only deals carrying any of these tags (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub tags: Vec<String>,

    /// Print the board snapshot as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show the configuration file and effective values
    Show,
    /// Check the configuration for inconsistent values
    Validate,
    /// Write a default pipeline.toml
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };
    let config = PipelineConfig::with_cli_args(
        project_dir,
        CliOverrides {
            port: match &cli.command {
                Commands::Serve { port, .. } => *port,
                _ => None,
            },
            db_path: cli.db_path.clone(),
            user: cli.user.clone(),
        },
    )?;

    let logging = &config.toml.logging;
    let _telemetry = telemetry::init(
        TelemetryConfig::new(cli.verbose, logging.level.clone(), logging.format)
            .with_log_dir(config.log_dir()),
    )?;

    match &cli.command {
        Commands::Init { demo } => cmd::cmd_init(&config, *demo)?,
        Commands::Serve { dev, .. } => cmd::cmd_serve(&config, *dev).await?,
        Commands::Board(args) => cmd::cmd_board(&config, args).await?,
        Commands::Move { deal, stage } => cmd::cmd_move(&config, deal, stage).await?,
        Commands::Config { command } => cmd::cmd_config(&config, command.clone())?,
    }

    Ok(())
}
