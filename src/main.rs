use anyhow::Context;
use clap::Parser;
use serde_json::{json, Value};
use shop_discovery::core::{CategoryId, Coordinate, NewShop, SearchQuery, SellerId, ShopId};
use shop_discovery::utils::{logger, validation::Validate};
use shop_discovery::{
    AppConfig, CliConfig, Command, Deadline, ElasticsearchGateway, ShopService, SqliteStore,
    TracingWarningSink,
};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    let config = AppConfig::from_file(&cli.config)
        .with_context(|| format!("Failed to load config file '{}'", cli.config))?;

    // 初始化日誌
    if cli.json_logs || config.json_logs() {
        logger::init_json_logger(config.log_level());
    } else {
        logger::init_cli_logger(cli.verbose, config.log_level());
    }
    tracing::info!("🚀 Starting shop-discovery with {}", cli.config);

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let store = Arc::new(SqliteStore::connect(&config.database.url, config.max_connections()).await?);

    if let Command::Init = cli.command {
        store.run_migrations().await?;
        println!("✅ Schema ready at {}", config.database.url);
        store.close().await;
        return Ok(());
    }

    let gateway = Arc::new(ElasticsearchGateway::from_config(&config.search));
    let service = ShopService::new(
        store.clone(),
        gateway,
        Arc::new(TracingWarningSink),
        config.service_settings(),
    );

    let deadline = cli
        .deadline_seconds
        .map(Duration::from_secs)
        .or_else(|| config.request_timeout())
        .map_or_else(Deadline::unbounded, Deadline::after);

    let result = run(&service, cli.command, deadline).await;
    store.close().await;

    match result {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }
        Err(e) => {
            tracing::error!(
                "❌ Request failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());

            std::process::exit(e.severity().exit_code());
        }
    }
}

async fn run(
    service: &ShopService,
    command: Command,
    deadline: Deadline,
) -> shop_discovery::Result<Value> {
    let value = match command {
        // handled before the service is built
        Command::Init => Value::Null,
        Command::Create {
            name,
            seller,
            category,
            latitude,
            longitude,
            price,
            tags,
        } => {
            let shop = NewShop {
                name,
                location: Coordinate::new(latitude, longitude),
                price_per_person: price,
                seller_id: SellerId(seller),
                category_id: CategoryId(category),
                tags,
            };
            serde_json::to_value(service.create_shop(shop, deadline).await?)?
        }
        Command::Get { id } => serde_json::to_value(service.get_shop(ShopId(id), deadline).await?)?,
        Command::List => serde_json::to_value(service.list_shops(deadline).await?)?,
        Command::Recommend {
            latitude,
            longitude,
        } => serde_json::to_value(
            service
                .recommend(Coordinate::new(latitude, longitude), deadline)
                .await?,
        )?,
        Command::Search {
            keyword,
            latitude,
            longitude,
            order_by,
            category,
            tag,
        } => {
            let mut query =
                SearchQuery::new(Coordinate::new(latitude, longitude), keyword).order_by(order_by);
            if let Some(category) = category {
                query = query.category(CategoryId(category));
            }
            if let Some(tag) = tag {
                query = query.tag(tag);
            }
            serde_json::to_value(service.search(&query, deadline).await?)?
        }
        Command::Stats => json!({
            "shops": service.count_shops(deadline).await?,
            "categories": service.list_categories(deadline).await?,
        }),
    };
    Ok(value)
}
