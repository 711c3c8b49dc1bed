//! Configuration view and validation commands — `pipeline-board config`.

use anyhow::Result;

use pipeline_board::config::{PipelineConfig, PipelineToml};

use crate::ConfigCommands;

fn print_sections(toml: &PipelineToml) {
    println!("[server]");
    println!("  port = {}", toml.server.port);
    println!("  dev_mode = {}", toml.server.dev_mode);
    println!();

    println!("[database]");
    println!("  path = \"{}\"", toml.database.path.display());
    println!();

    println!("[board]");
    println!("  current_user = \"{}\"", toml.board.current_user);
    println!(
        "  default_sort = {}",
        serde_json::to_string(&toml.board.default_sort).unwrap_or_default()
    );
    println!("  card_warning_days = {}", toml.board.card_warning_days);
    println!("  card_danger_days = {}", toml.board.card_danger_days);
    println!("  header_warning_days = {}", toml.board.header_warning_days);
    println!("  header_danger_days = {}", toml.board.header_danger_days);
    println!();

    println!("[logging]");
    println!("  level = \"{}\"", toml.logging.level);
    println!("  format = \"{}\"", toml.logging.format);
    if let Some(dir) = &toml.logging.directory {
        println!("  directory = \"{}\"", dir.display());
    }
    println!();
}

pub fn cmd_config(config: &PipelineConfig, command: Option<ConfigCommands>) -> Result<()> {
    let config_path = config.config_file();

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Pipeline Board Configuration");
            println!("============================");
            println!();

            if config_path.exists() {
                println!("Config file: {}", config_path.display());
            } else {
                println!("No pipeline.toml found at {}", config_path.display());
                println!("Using default configuration.");
            }
            println!();
            print_sections(&config.toml);

            println!("Effective values (with env/CLI overrides):");
            println!("  db_path = \"{}\"", config.db_path().display());
            println!("  current_user = \"{}\"", config.current_user());
            println!("  port = {}", config.port());
            println!();

            if !config_path.exists() {
                println!("Run 'pipeline-board config init' to create a pipeline.toml file.");
                println!();
            }
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            if !config_path.exists() {
                println!("No pipeline.toml found. Using defaults (valid).");
                return Ok(());
            }

            let warnings = config.validate();
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
                println!("pipeline.toml already exists at {}", config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            std::fs::create_dir_all(&config.pipeline_dir)?;
            PipelineToml::default().save(&config_path)?;

            println!("Created pipeline.toml at {}", config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [server] port, dev_mode");
            println!("  - [board] current_user, default_sort and age thresholds");
            println!("  - [logging] level, format, directory");
            println!();
        }
    }

    Ok(())
}
