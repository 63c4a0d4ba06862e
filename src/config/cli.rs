use crate::domain::model::OrderBy;
use clap::{Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "shop-discovery")]
#[command(about = "Shop creation, recommendation and keyword search against a configured store and index")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "shop-discovery.toml")]
    pub config: String,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// Per-request deadline in seconds, overriding service.request_timeout_seconds
    #[arg(long)]
    pub deadline_seconds: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Create the database schema
    Init,

    /// Register a new shop
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        seller: i64,
        #[arg(long)]
        category: i64,
        #[arg(long, allow_negative_numbers = true)]
        latitude: f64,
        #[arg(long, allow_negative_numbers = true)]
        longitude: f64,
        #[arg(long, default_value = "0")]
        price: u32,
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
    },

    /// Show one shop
    Get {
        #[arg(long)]
        id: i64,
    },

    /// List every shop
    List,

    /// Shops nearest to a position
    Recommend {
        #[arg(long, allow_negative_numbers = true)]
        latitude: f64,
        #[arg(long, allow_negative_numbers = true)]
        longitude: f64,
    },

    /// Keyword search with tag facets
    Search {
        #[arg(long)]
        keyword: String,
        #[arg(long, allow_negative_numbers = true)]
        latitude: f64,
        #[arg(long, allow_negative_numbers = true)]
        longitude: f64,
        #[arg(long, default_value = "relevance")]
        order_by: OrderBy,
        #[arg(long)]
        category: Option<i64>,
        #[arg(long)]
        tag: Option<String>,
    },

    /// Shop count and categories
    Stats,
}
