use crate::config::app_config::DEFAULT_SEARCH_TIMEOUT_SECONDS;
use crate::core::deadline::Deadline;
use crate::core::enrichment::EnrichmentJoin;
use crate::core::geo::GeoRecommendationEngine;
use crate::core::search::HybridSearchCoordinator;
use crate::core::validation::ValidationPipeline;
use crate::domain::model::{Category, Coordinate, NewShop, SearchOutcome, SearchQuery, Shop, ShopId};
use crate::domain::ports::{RelationalStore, SearchIndexGateway, WarningSink};
use crate::utils::error::{Result, ShopError};
use crate::utils::validation::Validate;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceSettings {
    pub search_timeout: Duration,
    pub recommend_limit: Option<usize>,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            search_timeout: Duration::from_secs(DEFAULT_SEARCH_TIMEOUT_SECONDS),
            recommend_limit: None,
        }
    }
}

/// Entry point for shop creation, lookup, recommendation and search.
///
/// All collaborators are injected at construction; the service holds no
/// mutable state of its own and can be shared across concurrent requests.
pub struct ShopService {
    store: Arc<dyn RelationalStore>,
    validation: ValidationPipeline,
    enrichment: Arc<EnrichmentJoin>,
    recommendations: GeoRecommendationEngine,
    search: HybridSearchCoordinator,
}

impl ShopService {
    pub fn new(
        store: Arc<dyn RelationalStore>,
        gateway: Arc<dyn SearchIndexGateway>,
        warnings: Arc<dyn WarningSink>,
        settings: ServiceSettings,
    ) -> Self {
        let enrichment = Arc::new(EnrichmentJoin::new(store.clone(), warnings.clone()));
        Self {
            validation: ValidationPipeline::new(store.clone()),
            recommendations: GeoRecommendationEngine::new(
                store.clone(),
                enrichment.clone(),
                settings.recommend_limit,
            ),
            search: HybridSearchCoordinator::new(
                store.clone(),
                gateway,
                enrichment.clone(),
                warnings,
                settings.search_timeout,
            ),
            enrichment,
            store,
        }
    }

    /// Validates and persists a shop, then returns it as stored with snapshots attached.
    pub async fn create_shop(&self, shop: NewShop, deadline: Deadline) -> Result<Shop> {
        shop.validate()?;
        self.validation.validate_for_creation(&shop, deadline).await?;

        let id = deadline
            .run("store.insert_shop", self.store.insert_shop(&shop, Utc::now()))
            .await?;
        tracing::info!("✅ Created shop {} '{}'", id, shop.name);

        self.get_shop(id, deadline)
            .await?
            .ok_or_else(|| ShopError::Storage {
                message: format!("shop {} not readable after insert", id),
            })
    }

    /// `None` when no shop has this id.
    pub async fn get_shop(&self, id: ShopId, deadline: Deadline) -> Result<Option<Shop>> {
        match deadline.run("store.shop", self.store.shop(id)).await? {
            Some(shop) => Ok(Some(self.enrichment.enrich_one(shop, deadline).await?)),
            None => Ok(None),
        }
    }

    pub async fn list_shops(&self, deadline: Deadline) -> Result<Vec<Shop>> {
        let shops = deadline.run("store.shops", self.store.shops()).await?;
        self.enrichment.enrich(shops, deadline).await
    }

    pub async fn recommend(&self, origin: Coordinate, deadline: Deadline) -> Result<Vec<Shop>> {
        self.recommendations.recommend(origin, deadline).await
    }

    pub async fn search(&self, query: &SearchQuery, deadline: Deadline) -> Result<SearchOutcome> {
        self.search.search(query, deadline).await
    }

    pub async fn count_shops(&self, deadline: Deadline) -> Result<u64> {
        deadline.run("store.count_shops", self.store.count_shops()).await
    }

    pub async fn list_categories(&self, deadline: Deadline) -> Result<Vec<Category>> {
        deadline.run("store.categories", self.store.categories()).await
    }
}
