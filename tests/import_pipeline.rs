//! End-to-end pipeline tests: decode an upload, map and validate its rows,
//! and drive the importer against a mock HTTP backend.

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use subimport::{
    BulkImporter, FileDecoder, HttpSubmitter, ImportFile, ImportState, ImporterConfig,
    LabelMapper, RetryPolicy, SubscriptionMapper, build_records, parse_and_map,
};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_config() -> ImporterConfig {
    ImporterConfig {
        delay_between_calls: Duration::from_millis(1),
        retry: RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(1),
            max_backoff: Duration::from_millis(10),
            jitter: false,
        },
    }
}

#[tokio::test]
async fn csv_labels_import_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/labels"))
        .and(body_partial_json(json!({
            "name": "Entertainment",
            "color": "#FF5733",
            "owner": { "type": "personal" },
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 1 })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/labels"))
        .and(body_partial_json(json!({
            "name": "News",
            "color": "#0000FF",
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 2 })))
        .expect(1)
        .mount(&server)
        .await;

    let file = ImportFile::new(
        "labels.csv",
        "name,color\nEntertainment,#FF5733\nNews,0000FF\n",
    );
    let rows = FileDecoder::new().parse(&file).unwrap();
    let records = build_records(&LabelMapper, &rows);
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.is_valid));

    let endpoint = format!("{}/labels", server.uri()).parse().unwrap();
    let submitter = HttpSubmitter::new(endpoint);
    let importer = BulkImporter::new(records, Arc::new(submitter), fast_config());

    importer.import_records(&[0, 1]).await;

    let progress = importer.progress().await;
    assert_eq!(progress.total, 2);
    assert_eq!(progress.completed, 2);
    assert_eq!(progress.failed, 0);
    assert!(!progress.in_progress);
    for index in 0..2 {
        assert_eq!(
            importer.status(index).await.unwrap().state,
            ImportState::Success,
            "index {index}"
        );
    }
}

#[tokio::test]
async fn yaml_subscriptions_report_mixed_outcomes() {
    let accepted = "9f0c1e5a-3f2b-4c8d-9a6e-1b2c3d4e5f60";
    let rejected = "5a6b7c8d-9e0f-4a1b-8c2d-3e4f5a6b7c8d";

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/subscriptions"))
        .and(body_partial_json(json!({ "providerId": accepted })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/subscriptions"))
        .and(body_partial_json(json!({ "providerId": rejected })))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({ "message": "start date is in the past" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let yaml = format!(
        "- providerId: {accepted}\n  startDate: 2024-01-15\n  recurrency: monthly\n\
         - startDate: 2024-01-15\n  recurrency: monthly\n\
         - providerId: {rejected}\n  startDate: 2024-01-15\n  recurrency: monthly\n"
    );
    let file = ImportFile::new("subscriptions.yaml", yaml);
    let records = parse_and_map(&file, &SubscriptionMapper).unwrap();
    assert_eq!(records.len(), 3);
    assert!(records[0].is_valid);
    assert!(!records[1].is_valid, "the row without a provider fails validation");
    assert!(records[2].is_valid);

    let endpoint = format!("{}/subscriptions", server.uri()).parse().unwrap();
    let submitter = HttpSubmitter::new(endpoint);
    let importer = BulkImporter::new(records, Arc::new(submitter), fast_config());

    importer.import_records(&[0, 1, 2]).await;

    assert_eq!(
        importer.status(0).await.unwrap().state,
        ImportState::Success
    );
    let invalid = importer.status(1).await.unwrap();
    assert_eq!(invalid.state, ImportState::Error);
    assert_eq!(
        invalid.error.as_deref(),
        Some("Record has validation errors")
    );
    let rejected_status = importer.status(2).await.unwrap();
    assert_eq!(rejected_status.state, ImportState::Error);
    assert_eq!(
        rejected_status.error.as_deref(),
        Some("Validation error: start date is in the past")
    );

    let progress = importer.progress().await;
    assert_eq!(progress.completed, 1);
    assert_eq!(progress.failed, 2);
}

#[tokio::test]
async fn transient_server_errors_are_retried_end_to_end() {
    let server = MockServer::start().await;
    // the first call hits a 503; the retry lands on the healthy mock
    Mock::given(method("POST"))
        .and(path("/labels"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/labels"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 1 })))
        .expect(1)
        .mount(&server)
        .await;

    let file = ImportFile::new("labels.json", r##"[{ "name": "Gym", "color": "#00FF00" }]"##);
    let records = parse_and_map(&file, &LabelMapper).unwrap();

    let endpoint = format!("{}/labels", server.uri()).parse().unwrap();
    let submitter = HttpSubmitter::new(endpoint);
    let importer = BulkImporter::new(records, Arc::new(submitter), fast_config());

    importer.import_records(&[0]).await;

    assert_eq!(
        importer.status(0).await.unwrap().state,
        ImportState::Success,
        "a single 503 is retried away"
    );
    let progress = importer.progress().await;
    assert_eq!(progress.completed, 1);
    assert_eq!(progress.failed, 0);
}
