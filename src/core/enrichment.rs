use crate::core::deadline::Deadline;
use crate::domain::model::{Category, CategoryId, Seller, SellerId, Shop, Warning};
use crate::domain::ports::{RelationalStore, WarningSink};
use crate::utils::error::{EntityKind, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Attaches seller and category snapshots to shops on every read path.
///
/// A missing reference leaves the snapshot empty and is reported as an
/// [`Warning::OrphanedReference`]; it never fails the batch. Store errors do.
pub struct EnrichmentJoin {
    store: Arc<dyn RelationalStore>,
    warnings: Arc<dyn WarningSink>,
}

impl EnrichmentJoin {
    pub fn new(store: Arc<dyn RelationalStore>, warnings: Arc<dyn WarningSink>) -> Self {
        Self { store, warnings }
    }

    pub async fn enrich_one(&self, shop: Shop, deadline: Deadline) -> Result<Shop> {
        let mut enriched = self.enrich(vec![shop], deadline).await?;
        // enrich is length-preserving
        Ok(enriched.remove(0))
    }

    pub async fn enrich(&self, shops: Vec<Shop>, deadline: Deadline) -> Result<Vec<Shop>> {
        self.enrich_collecting(shops, deadline, &mut Vec::new()).await
    }

    /// Like [`EnrichmentJoin::enrich`], also appending every reported warning to `collected`.
    pub async fn enrich_collecting(
        &self,
        shops: Vec<Shop>,
        deadline: Deadline,
        collected: &mut Vec<Warning>,
    ) -> Result<Vec<Shop>> {
        let mut sellers: HashMap<SellerId, Option<Seller>> = HashMap::new();
        let mut categories: HashMap<CategoryId, Option<Category>> = HashMap::new();
        let mut enriched = Vec::with_capacity(shops.len());

        for mut shop in shops {
            if !sellers.contains_key(&shop.seller_id) {
                let seller = deadline
                    .run("store.seller", self.store.seller(shop.seller_id))
                    .await?;
                sellers.insert(shop.seller_id, seller);
            }
            if !categories.contains_key(&shop.category_id) {
                let category = deadline
                    .run("store.category", self.store.category(shop.category_id))
                    .await?;
                categories.insert(shop.category_id, category);
            }

            shop.seller = sellers.get(&shop.seller_id).cloned().flatten();
            shop.category = categories.get(&shop.category_id).cloned().flatten();

            if shop.seller.is_none() {
                self.report_orphan(&shop, EntityKind::Seller, shop.seller_id.0, collected);
            }
            if shop.category.is_none() {
                self.report_orphan(&shop, EntityKind::Category, shop.category_id.0, collected);
            }
            enriched.push(shop);
        }

        tracing::debug!(
            "Enriched {} shops ({} sellers, {} categories looked up)",
            enriched.len(),
            sellers.len(),
            categories.len()
        );
        Ok(enriched)
    }

    fn report_orphan(
        &self,
        shop: &Shop,
        entity: EntityKind,
        reference_id: i64,
        collected: &mut Vec<Warning>,
    ) {
        let warning = Warning::OrphanedReference {
            shop_id: shop.id,
            entity,
            reference_id,
        };
        self.warnings.report(&warning);
        collected.push(warning);
    }
}
