pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliConfig, Command};

pub use adapters::{
    elasticsearch::ElasticsearchGateway, fake_index::InMemorySearchIndex,
    memory_store::InMemoryStore, sqlite_store::SqliteStore,
    warnings::{RecordingWarningSink, TracingWarningSink},
};
pub use config::AppConfig;
pub use core::{deadline::Deadline, service::ServiceSettings, service::ShopService};
pub use utils::error::{EntityKind, Result, ShopError, ValidationError};
