//! End-to-end contract tests for the profits REST API.
//!
//! Every test starts from a store holding exactly the three sample profits.

mod support;

use axum::http::StatusCode;
use chrono::{TimeZone, Utc};
use serde_json::json;

use profits_api::api::ProfitId;
use profits_api::db::repository::ProfitRepository;
use profits_api::db::seed::sample_profits;
use profits_api::db::ProfitFilter;
use profits_api::http::router::MAX_BODY_BYTES;
use support::{first_sample_id, TestApp};

async fn stored_count(app: &TestApp) -> usize {
    app.repo.count(ProfitFilter::all()).await.unwrap()
}

// =============================================================================
// GET /profits
// =============================================================================

#[tokio::test]
async fn test_list_returns_every_profit() {
    let app = TestApp::seeded().await;

    let (status, body) = app.send("GET", "/profits", None).await;

    assert_eq!(status, StatusCode::OK);
    let items = body.as_array().expect("array body");
    assert_eq!(items.len(), sample_profits().len());
    assert_eq!(items[0]["name"], "Payment 1");
    assert_eq!(items[2]["name"], "Payment 3");
}

#[tokio::test]
async fn test_list_on_failing_store_is_server_error() {
    let app = TestApp::seeded().await;
    app.repo.set_healthy(false);

    let (status, body) = app.send("GET", "/profits", None).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "REPOSITORY_ERROR");
}

// =============================================================================
// GET /profits/{id}
// =============================================================================

#[tokio::test]
async fn test_get_one_profit_by_id() {
    let app = TestApp::seeded().await;
    let expected = &sample_profits()[0];

    let (status, body) = app
        .send("GET", &format!("/profits/{}", expected.id), None)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["_id"], expected.id.to_string());
    assert_eq!(body["amount"].as_f64(), Some(expected.amount));
    assert_eq!(body["name"], expected.name.as_str());
    assert_eq!(body["year"], "2018-01-01T00:00:00.000Z");
}

#[tokio::test]
async fn test_get_malformed_id_is_not_found() {
    let app = TestApp::seeded().await;

    let (status, body) = app.send("GET", "/profits/123", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_get_nonexistent_profit_is_not_found() {
    let app = TestApp::seeded().await;
    let id = ProfitId::generate();

    let (status, _) = app.send("GET", &format!("/profits/{}", id), None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =============================================================================
// POST /profits
// =============================================================================

#[tokio::test]
async fn test_create_profit() {
    let app = TestApp::seeded().await;

    let (status, body) = app
        .send(
            "POST",
            "/profits",
            Some(json!({ "amount": 200, "name": "Payment 4", "year": "2018-03-01T00:00:00.000Z" })),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["amount"].as_f64(), Some(200.0));
    assert_eq!(body["name"], "Payment 4");
    assert_eq!(body["year"], "2018-03-01T00:00:00.000Z");
    assert_eq!(stored_count(&app).await, 4);

    let id = body["_id"].as_str().expect("assigned id");
    assert!(ProfitId::parse(id).is_ok());

    let (status, fetched) = app.send("GET", &format!("/profits/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, body);
}

#[tokio::test]
async fn test_create_accepts_epoch_millis_year() {
    let app = TestApp::seeded().await;

    let (status, body) = app
        .send(
            "POST",
            "/profits",
            Some(json!({ "amount": 12.5, "name": "Millis", "year": 1_519_862_400_000_i64 })),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["year"], "2018-03-01T00:00:00.000Z");
}

#[tokio::test]
async fn test_create_rejects_empty_body() {
    let app = TestApp::seeded().await;

    let (status, body) = app.send("POST", "/profits", Some(json!({}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    let fields: Vec<&str> = body["details"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|issue| issue["field"].as_str())
        .collect();
    assert_eq!(fields, ["amount", "name", "year"]);
    assert_eq!(stored_count(&app).await, 3);
}

#[tokio::test]
async fn test_create_rejects_wrong_types() {
    let app = TestApp::seeded().await;

    let (status, body) = app
        .send(
            "POST",
            "/profits",
            Some(json!({ "amount": "lots", "name": "Payment 4", "year": "someday" })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"].as_array().unwrap().len(), 2);
    assert_eq!(stored_count(&app).await, 3);
}

#[tokio::test]
async fn test_create_rejects_year_before_4713_bc() {
    let app = TestApp::seeded().await;
    let year = Utc.with_ymd_and_hms(-5000, 1, 1, 0, 0, 0).unwrap().timestamp_millis();

    let (status, body) = app
        .send(
            "POST",
            "/profits",
            Some(json!({ "amount": 1, "name": "Ancient", "year": year })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(body["details"][0]["field"], "year");
    assert_eq!(stored_count(&app).await, 3);
}

#[tokio::test]
async fn test_create_rejects_undecodable_json() {
    let app = TestApp::seeded().await;

    let (status, body) = app.send_raw("POST", "/profits", "{\"amount\": ").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
    assert_eq!(stored_count(&app).await, 3);
}

#[tokio::test]
async fn test_create_rejects_oversized_body_with_413() {
    let app = TestApp::seeded().await;
    let name = "x".repeat(MAX_BODY_BYTES + 1);
    let body = json!({ "amount": 1, "name": name, "year": "2018-03-01" }).to_string();

    let (status, body) = app.send_raw("POST", "/profits", &body).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["code"], "PAYLOAD_TOO_LARGE");
    assert_eq!(stored_count(&app).await, 3);
}

// =============================================================================
// PUT /profits/{id}
// =============================================================================

#[tokio::test]
async fn test_update_profit_changes_only_supplied_fields() {
    let app = TestApp::seeded().await;
    let id = first_sample_id();

    let (status, body) = app
        .send("PUT", &format!("/profits/{}", id), Some(json!({ "amount": 300 })))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["_id"], id.as_str());
    assert_eq!(body["amount"].as_f64(), Some(300.0));
    assert_eq!(body["name"], "Payment 1");
    assert_eq!(body["year"], "2018-01-01T00:00:00.000Z");
}

#[tokio::test]
async fn test_update_with_empty_patch_returns_current_record() {
    let app = TestApp::seeded().await;
    let id = first_sample_id();

    let (status, body) = app
        .send("PUT", &format!("/profits/{}", id), Some(json!({})))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["amount"].as_f64(), Some(100.0));
}

#[tokio::test]
async fn test_update_rejects_invalid_field_without_writing() {
    let app = TestApp::seeded().await;
    let id = first_sample_id();

    let (status, body) = app
        .send("PUT", &format!("/profits/{}", id), Some(json!({ "amount": 5, "name": "  " })))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (_, current) = app.send("GET", &format!("/profits/{}", id), None).await;
    assert_eq!(current["amount"].as_f64(), Some(100.0));
    assert_eq!(current["name"], "Payment 1");
}

#[tokio::test]
async fn test_update_malformed_id_is_not_found() {
    let app = TestApp::seeded().await;

    let (status, _) = app
        .send("PUT", "/profits/123", Some(json!({ "amount": 300 })))
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_malformed_id_wins_over_bad_body() {
    let app = TestApp::seeded().await;

    let (status, _) = app.send_raw("PUT", "/profits/123", "not json").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_nonexistent_profit_is_not_found() {
    let app = TestApp::seeded().await;
    let id = ProfitId::generate();

    let (status, _) = app
        .send("PUT", &format!("/profits/{}", id), Some(json!({ "amount": 300 })))
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =============================================================================
// DELETE /profits/{id}
// =============================================================================

#[tokio::test]
async fn test_delete_profit() {
    let app = TestApp::seeded().await;
    let id = first_sample_id();

    let (status, body) = app.send("DELETE", &format!("/profits/{}", id), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["_id"], id.as_str());
    assert_eq!(body["name"], "Payment 1");

    let parsed = ProfitId::parse(&id).unwrap();
    assert!(app.repo.find_by_id(parsed).await.unwrap().is_none());

    let (status, _) = app.send("GET", &format!("/profits/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_malformed_id_is_not_found() {
    let app = TestApp::seeded().await;

    let (status, _) = app.send("DELETE", "/profits/123", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(stored_count(&app).await, 3);
}

#[tokio::test]
async fn test_delete_nonexistent_profit_is_not_found() {
    let app = TestApp::seeded().await;
    let id = ProfitId::generate();

    let (status, _) = app.send("DELETE", &format!("/profits/{}", id), None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(stored_count(&app).await, 3);
}

// =============================================================================
// GET /health
// =============================================================================

#[tokio::test]
async fn test_health_reports_store_state() {
    let app = TestApp::seeded().await;

    let (status, body) = app.send("GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "connected");

    app.repo.set_healthy(false);
    let (status, body) = app.send("GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_ne!(body["database"], "connected");
}
