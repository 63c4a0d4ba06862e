pub mod app_config;
#[cfg(feature = "cli")]
pub mod cli;

pub use app_config::{AppConfig, DatabaseConfig, SearchConfig};
#[cfg(feature = "cli")]
pub use cli::{CliConfig, Command};
