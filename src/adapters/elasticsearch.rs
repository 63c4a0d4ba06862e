use crate::config::app_config::SearchConfig;
use crate::domain::model::{IndexQuery, SearchHit, ShopId, TagFacet};
use crate::domain::ports::SearchIndexGateway;
use crate::utils::error::{Result, ShopError};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

const NAME_FIELD: &str = "name";
const TAGS_FIELD: &str = "tags";
const CATEGORY_FIELD: &str = "category_id";
const TAGS_AGGREGATION: &str = "tags";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    timed_out: bool,
    hits: Hits,
    #[serde(default)]
    aggregations: Option<Aggregations>,
}

#[derive(Debug, Deserialize)]
struct Hits {
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "_id", default)]
    id: Option<String>,
    #[serde(rename = "_score", default)]
    score: Option<f32>,
    #[serde(rename = "_source", default)]
    source: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct Aggregations {
    tags: TermsAggregation,
}

#[derive(Debug, Deserialize)]
struct TermsAggregation {
    buckets: Vec<Bucket>,
}

#[derive(Debug, Deserialize)]
struct Bucket {
    key: Value,
    doc_count: u64,
}

impl Hit {
    /// The shop id from `_source.id`, falling back to the document `_id`.
    fn shop_id(&self) -> Option<ShopId> {
        let from_source = self.source.as_ref().and_then(|s| s.get("id")).and_then(|id| {
            id.as_i64()
                .or_else(|| id.as_str().and_then(|s| s.parse().ok()))
        });
        from_source
            .or_else(|| self.id.as_deref().and_then(|s| s.parse().ok()))
            .map(ShopId)
    }
}

/// [`SearchIndexGateway`] over the Elasticsearch `_search` REST endpoint.
pub struct ElasticsearchGateway {
    client: Client,
    endpoint: String,
    index: String,
    max_hits: usize,
    max_facets: usize,
    retry_attempts: u32,
    retry_delay: Duration,
}

impl ElasticsearchGateway {
    pub fn new(endpoint: impl Into<String>, index: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            index: index.into(),
            max_hits: 100,
            max_facets: 20,
            retry_attempts: 0,
            retry_delay: Duration::from_millis(200),
        }
    }

    pub fn from_config(config: &SearchConfig) -> Self {
        Self::new(config.endpoint.clone(), config.index.clone())
            .with_limits(config.max_hits(), config.max_facets())
            .with_retries(config.retry_attempts(), config.retry_delay())
    }

    pub fn with_limits(mut self, max_hits: usize, max_facets: usize) -> Self {
        self.max_hits = max_hits;
        self.max_facets = max_facets;
        self
    }

    /// Retries transport failures and 5xx responses. Timeouts are never retried.
    pub fn with_retries(mut self, attempts: u32, delay: Duration) -> Self {
        self.retry_attempts = attempts;
        self.retry_delay = delay;
        self
    }

    fn search_url(&self) -> String {
        format!("{}/{}/_search", self.endpoint.trim_end_matches('/'), self.index)
    }

    async fn post_search(&self, body: &Value, timeout: Duration) -> Result<SearchResponse> {
        let url = self.search_url();
        let mut attempt = 0;

        loop {
            tracing::debug!("📡 POST {} (attempt {})", url, attempt + 1);
            let failure = match self.client.post(&url).json(body).timeout(timeout).send().await {
                Ok(response) if response.status().is_success() => {
                    let parsed: SearchResponse = response.json().await.map_err(|e| {
                        ShopError::search_unavailable(format!("Malformed search response: {}", e))
                    })?;
                    if parsed.timed_out {
                        return Err(ShopError::search_unavailable(
                            "Search index reported a timeout",
                        ));
                    }
                    return Ok(parsed);
                }
                Ok(response) if response.status().is_server_error() => {
                    format!("Search index returned {}", response.status())
                }
                Ok(response) => {
                    return Err(ShopError::search_unavailable(format!(
                        "Search index rejected the request with {}",
                        response.status()
                    )));
                }
                Err(e) if e.is_timeout() => {
                    return Err(ShopError::search_unavailable(format!(
                        "Search request timed out after {:?}",
                        timeout
                    )));
                }
                Err(e) => format!("Search request failed: {}", e),
            };

            if attempt >= self.retry_attempts {
                return Err(ShopError::search_unavailable(failure));
            }
            attempt += 1;
            tracing::warn!(
                "🔄 {} - retrying ({}/{})",
                failure,
                attempt,
                self.retry_attempts
            );
            tokio::time::sleep(self.retry_delay).await;
        }
    }

    fn match_body(&self, query: &IndexQuery, timeout: Duration) -> Value {
        json!({
            "query": filtered_query(query),
            "_source": ["id"],
            "size": self.max_hits,
            "timeout": format!("{}ms", timeout.as_millis()),
        })
    }

    fn facet_body(&self, query: &IndexQuery, timeout: Duration) -> Value {
        json!({
            "size": 0,
            "query": filtered_query(query),
            "aggs": {
                TAGS_AGGREGATION: { "terms": { "field": TAGS_FIELD, "size": self.max_facets } }
            },
            "timeout": format!("{}ms", timeout.as_millis()),
        })
    }
}

/// Keyword match restricted by the optional category and tag filters.
/// Shared by the match and the aggregation so both see the same documents.
fn filtered_query(query: &IndexQuery) -> Value {
    let mut filters = Vec::new();
    if let Some(category_id) = query.category_id {
        filters.push(json!({ "term": { CATEGORY_FIELD: category_id.0 } }));
    }
    if let Some(tag) = &query.tag {
        filters.push(json!({ "term": { TAGS_FIELD: tag } }));
    }

    json!({
        "bool": {
            "must": [{ "match": { NAME_FIELD: query.keyword } }],
            "filter": filters,
        }
    })
}

#[async_trait]
impl SearchIndexGateway for ElasticsearchGateway {
    async fn match_by_keyword(
        &self,
        query: &IndexQuery,
        timeout: Duration,
    ) -> Result<Vec<SearchHit>> {
        let response = self
            .post_search(&self.match_body(query, timeout), timeout)
            .await?;

        let mut hits = Vec::with_capacity(response.hits.hits.len());
        for hit in response.hits.hits {
            match hit.shop_id() {
                Some(shop_id) => hits.push(SearchHit {
                    shop_id,
                    score: hit.score.unwrap_or_default(),
                }),
                None => tracing::warn!("Skipping search hit without a shop id: {:?}", hit.id),
            }
        }
        Ok(hits)
    }

    async fn aggregate_tags(&self, query: &IndexQuery, timeout: Duration) -> Result<Vec<TagFacet>> {
        let response = self
            .post_search(&self.facet_body(query, timeout), timeout)
            .await?;

        let buckets = response
            .aggregations
            .map(|aggs| aggs.tags.buckets)
            .unwrap_or_default();
        Ok(buckets
            .into_iter()
            .map(|bucket| TagFacet {
                tag: match bucket.key {
                    Value::String(s) => s,
                    other => other.to_string(),
                },
                count: bucket.doc_count,
            })
            .collect())
    }
}
