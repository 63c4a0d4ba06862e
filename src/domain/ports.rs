use crate::domain::model::{
    Category, CategoryId, Coordinate, IndexQuery, NewShop, SearchHit, Seller, SellerId, Shop,
    ShopId, TagFacet, Warning,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Primary record store for shops and the sellers/categories they reference.
///
/// Implementations must be safe to share between concurrent requests.
#[async_trait]
pub trait RelationalStore: Send + Sync {
    async fn seller(&self, id: SellerId) -> Result<Option<Seller>>;

    async fn category(&self, id: CategoryId) -> Result<Option<Category>>;

    async fn categories(&self) -> Result<Vec<Category>>;

    async fn shop(&self, id: ShopId) -> Result<Option<Shop>>;

    async fn shops(&self) -> Result<Vec<Shop>>;

    /// Fetches the shops that exist among `ids`. The returned order is unspecified
    /// and ids that do not resolve are simply absent.
    async fn shops_by_ids(&self, ids: &[ShopId]) -> Result<Vec<Shop>>;

    async fn count_shops(&self) -> Result<u64>;

    /// Persists a new shop atomically and returns its assigned id.
    async fn insert_shop(&self, shop: &NewShop, at: DateTime<Utc>) -> Result<ShopId>;

    /// Shops ordered nearest-first from `origin`, when the store can do it natively.
    /// `None` means the caller has to order the full shop list itself.
    async fn shops_by_distance(&self, _origin: Coordinate) -> Result<Option<Vec<Shop>>> {
        Ok(None)
    }
}

/// External full-text engine holding a searchable copy of shop names and tags.
///
/// Both calls are bounded by `timeout`; exceeding it or failing in transport
/// yields `ShopError::SearchUnavailable`.
#[async_trait]
pub trait SearchIndexGateway: Send + Sync {
    /// Shop ids matching the keyword within the query's category/tag filters,
    /// most relevant first.
    async fn match_by_keyword(&self, query: &IndexQuery, timeout: Duration)
        -> Result<Vec<SearchHit>>;

    /// Tag counts over the same documents `match_by_keyword` would select.
    async fn aggregate_tags(&self, query: &IndexQuery, timeout: Duration) -> Result<Vec<TagFacet>>;
}

/// Receives non-fatal conditions (orphaned references, index drift, degraded facets).
pub trait WarningSink: Send + Sync {
    fn report(&self, warning: &Warning);
}
