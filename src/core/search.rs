use crate::core::deadline::Deadline;
use crate::core::enrichment::EnrichmentJoin;
use crate::core::geo::{compare_by_distance, great_circle_meters};
use crate::domain::model::{OrderBy, SearchHit, SearchOutcome, SearchQuery, Shop, ShopId, Warning};
use crate::domain::ports::{RelationalStore, SearchIndexGateway, WarningSink};
use crate::utils::error::{Result, ShopError};
use crate::utils::validation::{validate_non_empty_string, Validate};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Keyword search over the index, hydrated from the relational store.
///
/// The index only supplies ranked ids and tag counts. Records always come from
/// the store, in the rank order the index returned, then optionally re-sorted by
/// [`OrderBy`]:
///
/// - `Relevance` (default): index rank.
/// - `Distance`: nearest to the query origin first, ties by id.
/// - `Price`: cheapest `price_per_person` first, ties by index rank.
///
/// A failed keyword match fails the request. A failed tag aggregation only
/// empties the facet list.
pub struct HybridSearchCoordinator {
    store: Arc<dyn RelationalStore>,
    gateway: Arc<dyn SearchIndexGateway>,
    enrichment: Arc<EnrichmentJoin>,
    warnings: Arc<dyn WarningSink>,
    search_timeout: Duration,
}

impl HybridSearchCoordinator {
    pub fn new(
        store: Arc<dyn RelationalStore>,
        gateway: Arc<dyn SearchIndexGateway>,
        enrichment: Arc<EnrichmentJoin>,
        warnings: Arc<dyn WarningSink>,
        search_timeout: Duration,
    ) -> Self {
        Self {
            store,
            gateway,
            enrichment,
            warnings,
            search_timeout,
        }
    }

    pub async fn search(&self, query: &SearchQuery, deadline: Deadline) -> Result<SearchOutcome> {
        validate_non_empty_string("keyword", &query.keyword)?;
        query.origin.validate()?;

        let budget = deadline.cap(self.search_timeout);
        let index_query = query.index_query();
        let (hits, facets) = tokio::join!(
            self.bounded(
                "search.match_by_keyword",
                deadline,
                budget,
                self.gateway.match_by_keyword(&index_query, budget),
            ),
            self.bounded(
                "search.aggregate_tags",
                deadline,
                budget,
                self.gateway.aggregate_tags(&index_query, budget),
            ),
        );

        let mut warnings = Vec::new();
        let hits = hits?;
        let facets = facets.unwrap_or_else(|e| {
            self.report(
                Warning::FacetsUnavailable {
                    reason: e.to_string(),
                },
                &mut warnings,
            );
            Vec::new()
        });
        tracing::debug!(
            "Index returned {} hits and {} facets for '{}'",
            hits.len(),
            facets.len(),
            query.keyword
        );

        let mut shops = self.hydrate(&hits, deadline, &mut warnings).await?;

        // The index already filtered; this drops hits whose stored record has
        // since moved out of the requested category or tag.
        shops.retain(|shop| {
            query.category_id.map_or(true, |id| shop.category_id == id)
                && query.tag.as_deref().map_or(true, |tag| shop.has_tag(tag))
        });
        for shop in &mut shops {
            shop.distance_meters = Some(great_circle_meters(query.origin, shop.location));
        }
        match query.order_by {
            OrderBy::Relevance => {}
            OrderBy::Distance => shops.sort_by(compare_by_distance),
            // stable sort keeps relevance order among equal prices
            OrderBy::Price => shops.sort_by_key(|shop| shop.price_per_person),
        }

        let shops = self
            .enrichment
            .enrich_collecting(shops, deadline, &mut warnings)
            .await?;
        tracing::info!(
            "Search '{}' returned {} shops, {} facets, {} warnings",
            query.keyword,
            shops.len(),
            facets.len(),
            warnings.len()
        );

        Ok(SearchOutcome {
            shops,
            facets,
            warnings,
        })
    }

    /// Loads the hit ids from the store and puts them back into rank order.
    /// Ids the store no longer knows are dropped and reported as index drift.
    async fn hydrate(
        &self,
        hits: &[SearchHit],
        deadline: Deadline,
        warnings: &mut Vec<Warning>,
    ) -> Result<Vec<Shop>> {
        let mut seen = HashSet::with_capacity(hits.len());
        let ranked_ids: Vec<ShopId> = hits
            .iter()
            .map(|hit| hit.shop_id)
            .filter(|id| seen.insert(*id))
            .collect();
        if ranked_ids.is_empty() {
            return Ok(Vec::new());
        }

        let fetched = deadline
            .run("store.shops_by_ids", self.store.shops_by_ids(&ranked_ids))
            .await?;
        let mut by_id: HashMap<ShopId, Shop> =
            fetched.into_iter().map(|shop| (shop.id, shop)).collect();

        let mut shops = Vec::with_capacity(ranked_ids.len());
        for id in ranked_ids {
            match by_id.remove(&id) {
                Some(shop) => shops.push(shop),
                None => self.report(Warning::IndexDrift { shop_id: id }, warnings),
            }
        }
        Ok(shops)
    }

    /// Bounds a gateway call by the search timeout and the caller's deadline.
    async fn bounded<T, F>(
        &self,
        operation: &str,
        deadline: Deadline,
        budget: Duration,
        fut: F,
    ) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(budget, fut).await {
            Ok(result) => result,
            Err(_) if deadline.is_expired() => Err(ShopError::DeadlineExceeded {
                operation: operation.to_string(),
            }),
            Err(_) => Err(ShopError::search_unavailable(format!(
                "{} timed out after {:?}",
                operation, budget
            ))),
        }
    }

    fn report(&self, warning: Warning, warnings: &mut Vec<Warning>) {
        self.warnings.report(&warning);
        warnings.push(warning);
    }
}
