//! Integration tests for ChainLedger API endpoints

use axum::http::{HeaderName, HeaderValue};
use axum_test::TestServer;
use chainledger::api::{build_api_router, ApiState};
use chainledger::LedgerService;
use serde_json::{json, Value};
use std::sync::Arc;

const TRUSTED_ORIGIN: &str = "http://localhost:5173";

fn test_server() -> TestServer {
    let state = Arc::new(ApiState::new(LedgerService::default()));
    let router = build_api_router(state, &[TRUSTED_ORIGIN.to_string()]);
    TestServer::new(router).expect("Failed to create test server")
}

#[tokio::test]
async fn test_transaction_lifecycle() {
    let server = test_server();

    let response = server.get("/api/health").await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["status"], "healthy");
    assert!(json["timestamp"].is_string());

    let response = server
        .post("/api/transactions")
        .json(&json!({"sender": "A", "receiver": "B", "amount": "100", "note": "rent"}))
        .await;
    assert_eq!(response.status_code(), 200);
    let first: Value = response.json();
    assert_eq!(first["index"], 1);
    assert_eq!(first["amount"], "100");
    assert_eq!(first["previous_hash"], "0".repeat(64));

    let response = server
        .post("/api/transactions")
        .json(&json!({"sender": "B", "receiver": "C", "amount": 50}))
        .await;
    assert_eq!(response.status_code(), 200);
    let second: Value = response.json();
    assert_eq!(second["index"], 2);
    assert_eq!(second["previous_hash"], first["hash"]);
    assert_eq!(second["note"], "");

    let response = server.get("/api/chain").await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["length"], 2);
    assert_eq!(json["blocks"][0]["index"], 1);
    assert_eq!(json["blocks"][1]["index"], 2);

    let response = server.get("/api/chain/verify").await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["valid"], true);
    assert_eq!(json["mode"], "full");
    assert_eq!(json["blocks_checked"], 2);
    assert!(json["first_violation"].is_null());

    let response = server.get("/api/chain/block/2").await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["sender"], "B");

    let response = server.get("/api/chain/block/3").await;
    assert_eq!(response.status_code(), 404);
    let json: Value = response.json();
    assert!(json["error"].is_string());

    let response = server
        .post("/api/chain/clear")
        .json(&json!({"confirm": true}))
        .await;
    assert_eq!(response.status_code(), 200);

    let response = server.get("/api/chain").await;
    let json: Value = response.json();
    assert_eq!(json["length"], 0);
    assert!(json["blocks"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_invalid_transactions_are_rejected() {
    let server = test_server();

    for body in [
        json!({"sender": "", "receiver": "B", "amount": "1"}),
        json!({"sender": "A", "receiver": "", "amount": "1"}),
        json!({"sender": "A", "receiver": "B", "amount": "-1"}),
        json!({"sender": "A", "receiver": "B", "amount": "lots"}),
        json!({"sender": "A", "receiver": "B", "amount": -2.5}),
    ] {
        let response = server.post("/api/transactions").json(&body).await;
        assert_eq!(response.status_code(), 400, "body {} should be rejected", body);
        let json: Value = response.json();
        assert!(json["error"].as_str().unwrap().starts_with("Invalid input"));
    }

    let json: Value = server.get("/api/chain").await.json();
    assert_eq!(json["length"], 0);

    let json: Value = server.get("/api/stats").await.json();
    assert_eq!(json["transactions_rejected"], 5);
    assert_eq!(json["transactions_submitted"], 0);
    assert_eq!(json["chain_length"], 0);
}

#[tokio::test]
async fn test_blocks_are_paged_newest_first() {
    let server = test_server();
    for i in 0..5 {
        server
            .post("/api/transactions")
            .json(&json!({"sender": format!("s{}", i), "receiver": "r", "amount": i}))
            .await;
    }

    let response = server.get("/api/chain/blocks?page=0&limit=2").await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["total"], 5);
    assert_eq!(json["limit"], 2);
    assert_eq!(json["blocks"][0]["index"], 5);
    assert_eq!(json["blocks"][1]["index"], 4);

    let json: Value = server.get("/api/chain/blocks?page=2&limit=2").await.json();
    assert_eq!(json["blocks"].as_array().unwrap().len(), 1);
    assert_eq!(json["blocks"][0]["index"], 1);

    let json: Value = server.get("/api/chain/blocks?page=9").await.json();
    assert!(json["blocks"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_stats_count_requests() {
    let server = test_server();
    server.get("/api/health").await;
    server.get("/api/chain/block/1").await;

    let json: Value = server.get("/api/stats").await.json();
    assert!(json["total_requests"].as_u64().unwrap() >= 2);
    assert!(json["failed_requests"].as_u64().unwrap() >= 1);
    assert!(json["uptime_seconds"].is_number());
}

#[tokio::test]
async fn test_malformed_bodies_get_json_errors() {
    let server = test_server();

    for body in [
        json!({"receiver": "B", "amount": "1"}),
        json!({"sender": "A", "receiver": "B", "amount": null}),
        json!({"sender": "A", "receiver": "B", "amount": true}),
    ] {
        let response = server.post("/api/transactions").json(&body).await;
        assert_eq!(response.status_code(), 400, "body {} should be rejected", body);
        let json: Value = response.json();
        assert!(json["error"].as_str().unwrap().starts_with("Invalid input for body"));
    }

    let response = server.post("/api/transactions").text("sender=A").await;
    assert_eq!(response.status_code(), 400);

    let json: Value = server.get("/api/stats").await.json();
    assert_eq!(json["transactions_rejected"], 4);
    assert_eq!(json["chain_length"], 0);
}

#[tokio::test]
async fn test_clear_requires_confirmation() {
    let server = test_server();
    server
        .post("/api/transactions")
        .json(&json!({"sender": "A", "receiver": "B", "amount": "1"}))
        .await;

    let response = server.post("/api/chain/clear").await;
    assert_eq!(response.status_code(), 400);

    let response = server
        .post("/api/chain/clear")
        .json(&json!({"confirm": false}))
        .await;
    assert_eq!(response.status_code(), 400);

    let json: Value = server.get("/api/chain").await.json();
    assert_eq!(json["length"], 1);
}

#[tokio::test]
async fn test_cors_only_allows_configured_origins() {
    let server = test_server();
    let origin = HeaderName::from_static("origin");
    let allow_origin = "access-control-allow-origin";

    let response = server
        .get("/api/health")
        .add_header(origin.clone(), HeaderValue::from_static(TRUSTED_ORIGIN))
        .await;
    assert_eq!(
        response.headers().get(allow_origin).and_then(|v| v.to_str().ok()),
        Some(TRUSTED_ORIGIN)
    );

    let response = server
        .get("/api/health")
        .add_header(origin, HeaderValue::from_static("https://evil.example"))
        .await;
    assert!(response.headers().get(allow_origin).is_none());
}

#[tokio::test]
async fn test_amount_text_is_returned_as_submitted() {
    let server = test_server();
    let response = server
        .post("/api/transactions")
        .json(&json!({"sender": "A", "receiver": "B", "amount": " 007 "}))
        .await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["amount"], "007");
}
