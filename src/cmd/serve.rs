//! Board API server command — `pipeline-board serve`.

use anyhow::Result;

use pipeline_board::config::{BoardSection, PipelineConfig};
use pipeline_board::server::{ServerConfig, start_server};

pub async fn cmd_serve(config: &PipelineConfig, dev: bool) -> Result<()> {
    for warning in config.validate() {
        eprintln!("Config warning: {}", warning);
    }

    start_server(ServerConfig {
        port: config.port(),
        db_path: config.db_path(),
        dev_mode: dev || config.toml.server.dev_mode,
        board: BoardSection {
            current_user: config.current_user(),
            ..config.toml.board.clone()
        },
    })
    .await
}
