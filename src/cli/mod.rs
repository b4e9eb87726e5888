pub mod app;
pub mod commands;
pub mod display;
pub mod error_handler;

pub use app::App;
pub use commands::{Cli, Commands};
pub use error_handler::{display_error_and_exit, exit_code, CliError, CliResult};
