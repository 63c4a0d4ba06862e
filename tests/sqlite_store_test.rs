use shop_discovery::core::{
    CategoryId, Coordinate, NewShop, RelationalStore, SearchQuery, SellerId, ShopId, Warning,
};
use shop_discovery::{
    Deadline, EntityKind, InMemorySearchIndex, RecordingWarningSink, ServiceSettings, ShopError,
    ShopService, SqliteStore, ValidationError,
};
use std::sync::Arc;
use std::time::Duration;

// A single connection keeps every query on the same in-memory database.
async fn memory_store() -> SqliteStore {
    let store = SqliteStore::connect("sqlite::memory:", 1).await.unwrap();
    store.run_migrations().await.unwrap();
    store
}

fn new_shop(name: &str, latitude: f64, seller_id: SellerId, category_id: CategoryId) -> NewShop {
    NewShop {
        name: name.to_string(),
        location: Coordinate::new(latitude, 121.5),
        price_per_person: 85,
        seller_id,
        category_id,
        tags: vec!["hotpot".to_string(), "spicy".to_string()],
    }
}

fn deadline() -> Deadline {
    Deadline::after(Duration::from_secs(5))
}

#[tokio::test]
async fn test_migrations_are_idempotent() {
    let store = memory_store().await;
    store.run_migrations().await.unwrap();
    assert_eq!(store.count_shops().await.unwrap(), 0);
}

#[tokio::test]
async fn test_reference_lookups() {
    let store = memory_store().await;
    let active = store.insert_seller("Active", false).await.unwrap();
    let retired = store.insert_seller("Retired", true).await.unwrap();
    let category = store.insert_category("Hotpot").await.unwrap();

    assert!(!store.seller(active).await.unwrap().unwrap().disabled);
    assert!(store.seller(retired).await.unwrap().unwrap().disabled);
    assert!(store.seller(SellerId(999)).await.unwrap().is_none());

    store.set_seller_disabled(retired, false).await.unwrap();
    assert!(!store.seller(retired).await.unwrap().unwrap().disabled);

    assert_eq!(store.category(category).await.unwrap().unwrap().name, "Hotpot");
    assert!(store.category(CategoryId(999)).await.unwrap().is_none());
    assert_eq!(store.categories().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_insert_and_read_back_shop() {
    let store = memory_store().await;
    let seller = store.insert_seller("S1", false).await.unwrap();
    let category = store.insert_category("C1").await.unwrap();
    let at = chrono::Utc::now();

    let supplied = new_shop("Red Pot", 31.230_416_4, seller, category);
    let id = store.insert_shop(&supplied, at).await.unwrap();
    let shop = store.shop(id).await.unwrap().unwrap();

    assert_eq!(shop.name, "Red Pot");
    assert_eq!(shop.location, supplied.location);
    assert_eq!(shop.location.latitude_micro(), 31_230_416);
    assert_eq!(shop.location.longitude_micro(), 121_500_000);
    assert_eq!(shop.price_per_person, 85);
    assert_eq!(shop.tags, supplied.tags);
    assert_eq!(shop.created_at, at);
    assert_eq!(shop.updated_at, at);
    assert!(shop.seller.is_none());
    assert_eq!(store.count_shops().await.unwrap(), 1);
}

#[tokio::test]
async fn test_shops_by_ids_skips_unknown_ids() {
    let store = memory_store().await;
    let seller = store.insert_seller("S1", false).await.unwrap();
    let category = store.insert_category("C1").await.unwrap();
    let at = chrono::Utc::now();

    let mut ids = Vec::new();
    for (i, name) in ["one", "two", "three"].iter().enumerate() {
        let shop = new_shop(name, i as f64, seller, category);
        ids.push(store.insert_shop(&shop, at).await.unwrap());
    }

    let mut found: Vec<ShopId> = store
        .shops_by_ids(&[ids[2], ShopId(4040), ids[0]])
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.id)
        .collect();
    found.sort();
    assert_eq!(found, vec![ids[0], ids[2]]);

    assert!(store.shops_by_ids(&[]).await.unwrap().is_empty());

    store.delete_shop(ids[1]).await.unwrap();
    assert_eq!(store.shops().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_service_over_sqlite() {
    let store = Arc::new(memory_store().await);
    let index = Arc::new(InMemorySearchIndex::new());
    let sink = Arc::new(RecordingWarningSink::new());
    let service = ShopService::new(
        store.clone(),
        index.clone(),
        sink.clone(),
        ServiceSettings::default(),
    );

    let seller = store.insert_seller("S1", false).await.unwrap();
    let retired = store.insert_seller("Retired", true).await.unwrap();
    let category = store.insert_category("C1").await.unwrap();

    let err = service
        .create_shop(new_shop("Nope", 1.0, retired, category), deadline())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ShopError::Validation(ValidationError::EntityDisabled {
            entity: EntityKind::Seller,
            ..
        })
    ));

    let far = service
        .create_shop(new_shop("Far Pot", 2.0, seller, category), deadline())
        .await
        .unwrap();
    let near = service
        .create_shop(new_shop("Near Pot", 1.0, seller, category), deadline())
        .await
        .unwrap();
    assert_eq!(far.seller.as_ref().unwrap().name, "S1");
    assert_eq!(service.count_shops(deadline()).await.unwrap(), 2);

    let nearest = service
        .recommend(Coordinate::new(0.0, 121.5), deadline())
        .await
        .unwrap();
    assert_eq!(
        nearest.iter().map(|s| s.id).collect::<Vec<_>>(),
        vec![near.id, far.id]
    );

    index.index_shop(&far);
    index.index_shop(&near);
    index.fixed_ranking(vec![far.id, near.id]);
    let outcome = service
        .search(&SearchQuery::new(Coordinate::new(0.0, 121.5), "pot"), deadline())
        .await
        .unwrap();
    assert_eq!(
        outcome.shops.iter().map(|s| s.id).collect::<Vec<_>>(),
        vec![far.id, near.id]
    );

    store.delete_seller(seller).await.unwrap();
    let orphaned = service.get_shop(near.id, deadline()).await.unwrap().unwrap();
    assert!(orphaned.seller.is_none());
    assert_eq!(
        sink.take(),
        vec![Warning::OrphanedReference {
            shop_id: near.id,
            entity: EntityKind::Seller,
            reference_id: seller.0,
        }]
    );
}
