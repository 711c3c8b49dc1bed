//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module   | Commands handled  |
//! |----------|-------------------|
//! | `init`   | `Init`            |
//! | `serve`  | `Serve`           |
//! | `board`  | `Board`, `Move`   |
//! | `config` | `Config`          |

pub mod board;
pub mod config;
pub mod init;
pub mod serve;

pub use board::{cmd_board, cmd_move};
pub use config::cmd_config;
pub use init::cmd_init;
pub use serve::cmd_serve;
