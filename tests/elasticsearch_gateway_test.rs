use httpmock::prelude::*;
use serde_json::json;
use shop_discovery::adapters::elasticsearch::ElasticsearchGateway;
use shop_discovery::core::{CategoryId, SearchIndexGateway, ShopId, TagFacet};
use shop_discovery::domain::model::IndexQuery;
use shop_discovery::ShopError;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(5);

fn index_query() -> IndexQuery {
    IndexQuery {
        keyword: "hotpot".to_string(),
        category_id: Some(CategoryId(2)),
        tag: None,
    }
}

#[tokio::test]
async fn test_match_keeps_index_rank() {
    let server = MockServer::start();

    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/shop/_search")
            .body_contains("\"_source\"")
            .body_contains("hotpot");
        then.status(200).json_body(json!({
            "timed_out": false,
            "hits": {
                "total": { "value": 3 },
                "hits": [
                    { "_id": "7", "_score": 3.2, "_source": { "id": 7 } },
                    { "_id": "3", "_score": 2.5, "_source": { "id": 3 } },
                    { "_id": "9", "_score": 0.4, "_source": { "id": "9" } }
                ]
            }
        }));
    });

    let gateway = ElasticsearchGateway::new(server.base_url(), "shop");
    let hits = gateway
        .match_by_keyword(&IndexQuery::keyword("hotpot"), TIMEOUT)
        .await
        .unwrap();

    mock.assert();
    assert_eq!(
        hits.iter().map(|h| h.shop_id).collect::<Vec<_>>(),
        vec![ShopId(7), ShopId(3), ShopId(9)]
    );
    assert_eq!(hits[0].score, 3.2);
}

#[tokio::test]
async fn test_filtered_match_sends_filters_to_index() {
    let server = MockServer::start();

    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/shop/_search")
            .body_contains("\"_source\"")
            .body_contains("\"category_id\":2")
            .body_contains("\"tags\":\"spicy\"");
        then.status(200).json_body(json!({
            "hits": { "hits": [ { "_id": "120", "_score": 0.9, "_source": { "id": 120 } } ] }
        }));
    });

    let gateway = ElasticsearchGateway::new(server.base_url(), "shop");
    let query = IndexQuery {
        tag: Some("spicy".to_string()),
        ..index_query()
    };
    let hits = gateway.match_by_keyword(&query, TIMEOUT).await.unwrap();

    mock.assert();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].shop_id, ShopId(120));
}

#[tokio::test]
async fn test_tag_aggregation_parsed() {
    let server = MockServer::start();

    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/shop/_search")
            .body_contains("\"aggs\"")
            .body_contains("category_id");
        then.status(200).json_body(json!({
            "timed_out": false,
            "hits": { "hits": [] },
            "aggregations": {
                "tags": {
                    "buckets": [
                        { "key": "spicy", "doc_count": 12 },
                        { "key": "late-night", "doc_count": 4 }
                    ]
                }
            }
        }));
    });

    let gateway = ElasticsearchGateway::new(server.base_url(), "shop");
    let facets = gateway.aggregate_tags(&index_query(), TIMEOUT).await.unwrap();

    mock.assert();
    assert_eq!(
        facets,
        vec![
            TagFacet {
                tag: "spicy".to_string(),
                count: 12
            },
            TagFacet {
                tag: "late-night".to_string(),
                count: 4
            },
        ]
    );
}

#[tokio::test]
async fn test_server_error_retried_then_reported() {
    let server = MockServer::start();

    let mock = server.mock(|when, then| {
        when.method(POST).path("/shop/_search");
        then.status(503).body("unavailable");
    });

    let gateway = ElasticsearchGateway::new(server.base_url(), "shop")
        .with_retries(2, Duration::from_millis(10));
    let err = gateway
        .match_by_keyword(&IndexQuery::keyword("hotpot"), TIMEOUT)
        .await
        .unwrap_err();

    mock.assert_hits(3);
    assert!(matches!(err, ShopError::SearchUnavailable { .. }));
}

#[tokio::test]
async fn test_client_error_not_retried() {
    let server = MockServer::start();

    let mock = server.mock(|when, then| {
        when.method(POST).path("/shop/_search");
        then.status(400).body("bad query");
    });

    let gateway = ElasticsearchGateway::new(server.base_url(), "shop")
        .with_retries(2, Duration::from_millis(10));
    let err = gateway
        .match_by_keyword(&IndexQuery::keyword("hotpot"), TIMEOUT)
        .await
        .unwrap_err();

    mock.assert_hits(1);
    assert!(matches!(err, ShopError::SearchUnavailable { .. }));
}

#[tokio::test]
async fn test_slow_index_times_out() {
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(POST).path("/shop/_search");
        then.status(200)
            .delay(Duration::from_millis(500))
            .json_body(json!({ "hits": { "hits": [] } }));
    });

    let gateway = ElasticsearchGateway::new(server.base_url(), "shop");
    let err = gateway
        .match_by_keyword(&IndexQuery::keyword("hotpot"), Duration::from_millis(50))
        .await
        .unwrap_err();

    assert!(matches!(err, ShopError::SearchUnavailable { .. }));
}

#[tokio::test]
async fn test_partial_results_rejected() {
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(POST).path("/shop/_search");
        then.status(200).json_body(json!({
            "timed_out": true,
            "hits": { "hits": [ { "_id": "1", "_source": { "id": 1 } } ] }
        }));
    });

    let gateway = ElasticsearchGateway::new(server.base_url(), "shop");
    let err = gateway
        .match_by_keyword(&IndexQuery::keyword("hotpot"), TIMEOUT)
        .await
        .unwrap_err();

    assert!(matches!(err, ShopError::SearchUnavailable { .. }));
}

#[tokio::test]
async fn test_malformed_response_rejected() {
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(POST).path("/shop/_search");
        then.status(200).body("<html>proxy error</html>");
    });

    let gateway = ElasticsearchGateway::new(server.base_url(), "shop");
    let err = gateway
        .aggregate_tags(&index_query(), TIMEOUT)
        .await
        .unwrap_err();

    assert!(matches!(err, ShopError::SearchUnavailable { .. }));
}
