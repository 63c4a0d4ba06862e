use crate::domain::model::{CategoryId, IndexQuery, SearchHit, Shop, ShopId, TagFacet};
use crate::domain::ports::SearchIndexGateway;
use crate::utils::error::{Result, ShopError};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;
use std::time::Duration;

/// The searchable projection of a shop.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedShop {
    pub id: ShopId,
    pub name: String,
    pub category_id: CategoryId,
    pub tags: Vec<String>,
}

impl From<&Shop> for IndexedShop {
    fn from(shop: &Shop) -> Self {
        Self {
            id: shop.id,
            name: shop.name.clone(),
            category_id: shop.category_id,
            tags: shop.tags.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
enum Behavior {
    #[default]
    Normal,
    Fail(String),
    Delay(Duration),
}

/// In-process search index with scriptable failures and latency.
///
/// Matching scores a document by how many keyword terms occur in its name,
/// restricted by the query's category and tag filters, and returns at most
/// [`InMemorySearchIndex::limit_hits`] ids. [`InMemorySearchIndex::fixed_ranking`]
/// overrides the match result with an exact, unfiltered id list; tag aggregation
/// always uses the term matching.
#[derive(Default)]
pub struct InMemorySearchIndex {
    documents: RwLock<BTreeMap<ShopId, IndexedShop>>,
    ranking: RwLock<Option<Vec<ShopId>>>,
    max_hits: RwLock<Option<usize>>,
    match_behavior: RwLock<Behavior>,
    facet_behavior: RwLock<Behavior>,
    match_calls: AtomicUsize,
    facet_calls: AtomicUsize,
}

impl InMemorySearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn index_shop(&self, shop: &Shop) {
        self.index_document(IndexedShop::from(shop));
    }

    pub fn index_document(&self, document: IndexedShop) {
        self.documents
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(document.id, document);
    }

    pub fn fixed_ranking(&self, ids: Vec<ShopId>) {
        *self.ranking.write().unwrap_or_else(|e| e.into_inner()) = Some(ids);
    }

    /// Returns matching back to term scoring.
    pub fn clear_ranking(&self) {
        *self.ranking.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    /// Caps the number of ids a match returns, like the real index's `size`.
    pub fn limit_hits(&self, max_hits: usize) {
        *self.max_hits.write().unwrap_or_else(|e| e.into_inner()) = Some(max_hits);
    }

    pub fn fail_matches(&self, reason: &str) {
        set(&self.match_behavior, Behavior::Fail(reason.to_string()));
    }

    pub fn fail_facets(&self, reason: &str) {
        set(&self.facet_behavior, Behavior::Fail(reason.to_string()));
    }

    /// Makes every match take `delay`, ignoring the caller's timeout.
    pub fn delay_matches(&self, delay: Duration) {
        set(&self.match_behavior, Behavior::Delay(delay));
    }

    pub fn delay_facets(&self, delay: Duration) {
        set(&self.facet_behavior, Behavior::Delay(delay));
    }

    pub fn match_calls(&self) -> usize {
        self.match_calls.load(Ordering::SeqCst)
    }

    pub fn facet_calls(&self) -> usize {
        self.facet_calls.load(Ordering::SeqCst)
    }

    fn scored(&self, query: &IndexQuery) -> Vec<(IndexedShop, usize)> {
        let terms: Vec<String> = query
            .keyword
            .split_whitespace()
            .map(|t| t.to_lowercase())
            .collect();
        let documents = self.documents.read().unwrap_or_else(|e| e.into_inner());
        documents
            .values()
            .filter(|doc| query.category_id.map_or(true, |id| id == doc.category_id))
            .filter(|doc| query.tag.as_ref().map_or(true, |tag| doc.tags.contains(tag)))
            .filter_map(|doc| {
                let name = doc.name.to_lowercase();
                let score = terms.iter().filter(|t| name.contains(t.as_str())).count();
                (score > 0).then(|| (doc.clone(), score))
            })
            .collect()
    }
}

fn set(slot: &RwLock<Behavior>, behavior: Behavior) {
    *slot.write().unwrap_or_else(|e| e.into_inner()) = behavior;
}

async fn apply(slot: &RwLock<Behavior>) -> Result<()> {
    let behavior = slot.read().unwrap_or_else(|e| e.into_inner()).clone();
    match behavior {
        Behavior::Normal => Ok(()),
        Behavior::Fail(reason) => Err(ShopError::search_unavailable(reason)),
        Behavior::Delay(delay) => {
            tokio::time::sleep(delay).await;
            Ok(())
        }
    }
}

#[async_trait]
impl SearchIndexGateway for InMemorySearchIndex {
    async fn match_by_keyword(
        &self,
        query: &IndexQuery,
        _timeout: Duration,
    ) -> Result<Vec<SearchHit>> {
        self.match_calls.fetch_add(1, Ordering::SeqCst);
        apply(&self.match_behavior).await?;

        let fixed = self.ranking.read().unwrap_or_else(|e| e.into_inner()).clone();
        if let Some(ids) = fixed {
            let total = ids.len();
            return Ok(ids
                .into_iter()
                .enumerate()
                .map(|(rank, shop_id)| SearchHit {
                    shop_id,
                    score: (total - rank) as f32,
                })
                .collect());
        }

        let mut scored = self.scored(query);
        scored.sort_by(|(a, sa), (b, sb)| sb.cmp(sa).then_with(|| a.id.cmp(&b.id)));
        if let Some(max_hits) = *self.max_hits.read().unwrap_or_else(|e| e.into_inner()) {
            scored.truncate(max_hits);
        }
        Ok(scored
            .into_iter()
            .map(|(doc, score)| SearchHit {
                shop_id: doc.id,
                score: score as f32,
            })
            .collect())
    }

    async fn aggregate_tags(&self, query: &IndexQuery, _timeout: Duration) -> Result<Vec<TagFacet>> {
        self.facet_calls.fetch_add(1, Ordering::SeqCst);
        apply(&self.facet_behavior).await?;

        let mut counts: HashMap<String, u64> = HashMap::new();
        for (doc, _) in self.scored(query) {
            for tag in doc.tags {
                *counts.entry(tag).or_default() += 1;
            }
        }

        let mut facets: Vec<TagFacet> = counts
            .into_iter()
            .map(|(tag, count)| TagFacet { tag, count })
            .collect();
        facets.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.tag.cmp(&b.tag)));
        Ok(facets)
    }
}
