use crate::core::geo::order_by_distance;
use crate::domain::model::{
    Category, CategoryId, Coordinate, NewShop, Seller, SellerId, Shop, ShopId,
};
use crate::domain::ports::RelationalStore;
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
struct Tables {
    sellers: BTreeMap<SellerId, Seller>,
    categories: BTreeMap<CategoryId, Category>,
    shops: BTreeMap<ShopId, Shop>,
    // highest shop id ever stored; ids are never reused after removal
    last_shop_id: i64,
}

/// Process-local store. Lookups by id list return shops in ascending id order,
/// not in the order requested.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
    native_geo: bool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that answers [`RelationalStore::shops_by_distance`] itself.
    pub fn with_native_geo() -> Self {
        Self {
            native_geo: true,
            ..Self::default()
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn put_seller(&self, seller: Seller) {
        self.write().sellers.insert(seller.id, seller);
    }

    pub fn put_category(&self, category: Category) {
        self.write().categories.insert(category.id, category);
    }

    /// Stores `shop` as-is; derived fields are cleared.
    pub fn put_shop(&self, mut shop: Shop) {
        shop.seller = None;
        shop.category = None;
        shop.distance_meters = None;
        let mut tables = self.write();
        tables.last_shop_id = tables.last_shop_id.max(shop.id.0);
        tables.shops.insert(shop.id, shop);
    }

    pub fn remove_seller(&self, id: SellerId) -> Option<Seller> {
        self.write().sellers.remove(&id)
    }

    pub fn remove_shop(&self, id: ShopId) -> Option<Shop> {
        self.write().shops.remove(&id)
    }
}

#[async_trait]
impl RelationalStore for InMemoryStore {
    async fn seller(&self, id: SellerId) -> Result<Option<Seller>> {
        Ok(self.read().sellers.get(&id).cloned())
    }

    async fn category(&self, id: CategoryId) -> Result<Option<Category>> {
        Ok(self.read().categories.get(&id).cloned())
    }

    async fn categories(&self) -> Result<Vec<Category>> {
        Ok(self.read().categories.values().cloned().collect())
    }

    async fn shop(&self, id: ShopId) -> Result<Option<Shop>> {
        Ok(self.read().shops.get(&id).cloned())
    }

    async fn shops(&self) -> Result<Vec<Shop>> {
        Ok(self.read().shops.values().cloned().collect())
    }

    async fn shops_by_ids(&self, ids: &[ShopId]) -> Result<Vec<Shop>> {
        let tables = self.read();
        Ok(tables
            .shops
            .values()
            .filter(|shop| ids.contains(&shop.id))
            .cloned()
            .collect())
    }

    async fn count_shops(&self) -> Result<u64> {
        Ok(self.read().shops.len() as u64)
    }

    async fn insert_shop(&self, shop: &NewShop, at: DateTime<Utc>) -> Result<ShopId> {
        let mut tables = self.write();
        tables.last_shop_id += 1;
        let id = ShopId(tables.last_shop_id);
        tables.shops.insert(id, Shop::from_new(id, shop, at));
        Ok(id)
    }

    async fn shops_by_distance(&self, origin: Coordinate) -> Result<Option<Vec<Shop>>> {
        if !self.native_geo {
            return Ok(None);
        }
        let shops: Vec<Shop> = self.read().shops.values().cloned().collect();
        Ok(Some(order_by_distance(origin, shops)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_shop(name: &str) -> NewShop {
        NewShop {
            name: name.to_string(),
            location: Coordinate::new(10.0, 10.0),
            price_per_person: 20,
            seller_id: SellerId(1),
            category_id: CategoryId(1),
            tags: vec!["wifi".to_string()],
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_increasing_ids() {
        let store = InMemoryStore::new();
        let now = Utc::now();

        let first = store.insert_shop(&new_shop("A"), now).await.unwrap();
        let second = store.insert_shop(&new_shop("B"), now).await.unwrap();

        assert_eq!(first, ShopId(1));
        assert_eq!(second, ShopId(2));
        assert_eq!(store.count_shops().await.unwrap(), 2);
        assert_eq!(store.shop(second).await.unwrap().unwrap().name, "B");
    }

    #[tokio::test]
    async fn test_removed_ids_are_not_reused() {
        let store = InMemoryStore::new();
        let now = Utc::now();

        store.insert_shop(&new_shop("A"), now).await.unwrap();
        let second = store.insert_shop(&new_shop("B"), now).await.unwrap();
        store.remove_shop(second);
        let third = store.insert_shop(&new_shop("C"), now).await.unwrap();
        assert_eq!(third, ShopId(3));

        store.put_shop(Shop::from_new(ShopId(10), &new_shop("Seeded"), now));
        store.remove_shop(ShopId(10));
        let next = store.insert_shop(&new_shop("D"), now).await.unwrap();
        assert_eq!(next, ShopId(11));
        assert!(store.shop(ShopId(10)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_shops_by_ids_ignores_request_order_and_missing_ids() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        for name in ["A", "B", "C"] {
            store.insert_shop(&new_shop(name), now).await.unwrap();
        }

        let shops = store
            .shops_by_ids(&[ShopId(3), ShopId(42), ShopId(1)])
            .await
            .unwrap();
        let ids: Vec<ShopId> = shops.iter().map(|s| s.id).collect();

        assert_eq!(ids, vec![ShopId(1), ShopId(3)]);
    }

    #[tokio::test]
    async fn test_geo_ordering_only_when_native() {
        let store = InMemoryStore::new();
        assert!(store
            .shops_by_distance(Coordinate::new(0.0, 0.0))
            .await
            .unwrap()
            .is_none());

        let native = InMemoryStore::with_native_geo();
        native.insert_shop(&new_shop("A"), Utc::now()).await.unwrap();
        let ordered = native
            .shops_by_distance(Coordinate::new(0.0, 0.0))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ordered.len(), 1);
        assert!(ordered[0].distance_meters.is_some());
    }
}
