//! Integration tests for openFDA pagination

#![allow(clippy::unwrap_used, clippy::expect_used)]

use medref_ingest::config::OpenFdaConfig;
use medref_ingest::sources::{DocumentSource, OpenFdaSource, OPENFDA_SOURCE};
use medref_ingest::IngestError;
use serde_json::{json, Value};
use wiremock::{
    matchers::{method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

const LABEL_PATH: &str = "/drug/label.json";

/// A page of `count` label results whose ids start at `offset`
fn label_page(offset: usize, count: usize) -> Value {
    let results: Vec<Value> = (offset..offset + count)
        .map(|i| {
            json!({
                "id": format!("label-{}", i),
                "openfda": {
                    "brand_name": [format!("Brand {}", i)],
                    "generic_name": ["ibuprofen"]
                },
                "indications_and_usage": ["Temporarily relieves minor aches and pains."],
                "warnings": "Allergy alert."
            })
        })
        .collect();

    json!({
        "meta": {"results": {"skip": offset, "limit": count, "total": 1000}},
        "results": results
    })
}

fn config_for(server: &MockServer) -> OpenFdaConfig {
    OpenFdaConfig {
        url: format!("{}{}", server.uri(), LABEL_PATH),
        ..OpenFdaConfig::default()
    }
}

async fn mount_page(server: &MockServer, skip: usize, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(LABEL_PATH))
        .and(query_param("search", "openfda.brand_name:*"))
        .and(query_param("limit", "100"))
        .and(query_param("skip", skip.to_string()))
        .respond_with(response)
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_pagination_stops_on_empty_page() {
    let server = MockServer::start().await;
    mount_page(&server, 0, ResponseTemplate::new(200).set_body_json(label_page(0, 100))).await;
    mount_page(&server, 100, ResponseTemplate::new(200).set_body_json(label_page(100, 100))).await;
    mount_page(&server, 200, ResponseTemplate::new(200).set_body_json(json!({"results": []}))).await;

    let source = OpenFdaSource::new(config_for(&server)).unwrap();
    let records = source.fetch_records().await.unwrap();

    assert_eq!(records.len(), 200);
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
    assert_eq!(records[0].doc_id.as_deref(), Some("openfda_label-0"));
    assert_eq!(records[199].doc_id.as_deref(), Some("openfda_label-199"));
}

#[tokio::test]
async fn test_pagination_stops_on_404() {
    let server = MockServer::start().await;
    mount_page(&server, 0, ResponseTemplate::new(200).set_body_json(label_page(0, 100))).await;
    mount_page(
        &server,
        100,
        ResponseTemplate::new(404).set_body_json(json!({"error": {"code": "NOT_FOUND"}})),
    )
    .await;

    let source = OpenFdaSource::new(config_for(&server)).unwrap();
    let records = source.fetch_records().await.unwrap();

    assert_eq!(records.len(), 100);
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_pagination_stops_at_max_pages() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LABEL_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(label_page(0, 2)))
        .expect(3)
        .mount(&server)
        .await;

    let config = OpenFdaConfig {
        max_pages: 3,
        page_size: 2,
        ..config_for(&server)
    };
    let records = OpenFdaSource::new(config).unwrap().fetch_records().await.unwrap();
    assert_eq!(records.len(), 6);

    let skips: Vec<String> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter_map(|req| {
            req.url
                .query_pairs()
                .find(|(key, _)| key == "skip")
                .map(|(_, value)| value.into_owned())
        })
        .collect();
    assert_eq!(skips, vec!["0", "2", "4"]);
}

#[tokio::test]
async fn test_server_error_aborts_fetch() {
    let server = MockServer::start().await;
    mount_page(&server, 0, ResponseTemplate::new(200).set_body_json(label_page(0, 100))).await;
    mount_page(&server, 100, ResponseTemplate::new(500)).await;

    let source = OpenFdaSource::new(config_for(&server)).unwrap();
    let err = source.fetch_records().await.unwrap_err();

    assert!(err.is_transport());
    match err {
        IngestError::Status { status, .. } => assert_eq!(status.as_u16(), 500),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_records_carry_label_fields() {
    let server = MockServer::start().await;
    mount_page(&server, 0, ResponseTemplate::new(200).set_body_json(label_page(0, 1))).await;
    mount_page(&server, 100, ResponseTemplate::new(404)).await;

    let source = OpenFdaSource::new(config_for(&server)).unwrap();
    assert_eq!(source.source_name(), OPENFDA_SOURCE);

    let records = source.fetch_records().await.unwrap();
    let record = &records[0];

    assert_eq!(record.title.as_deref(), Some("Brand 0"));
    assert_eq!(record.category.as_deref(), Some("drug"));
    assert_eq!(record.url, None);
    assert_eq!(
        record.raw_text.as_deref(),
        Some("Temporarily relieves minor aches and pains.\n\nAllergy alert.")
    );

    let meta: Value = serde_json::from_str(record.meta_json.as_deref().unwrap()).unwrap();
    assert_eq!(meta["id"], "label-0");
}
