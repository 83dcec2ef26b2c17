//! Integration tests for the gateway HTTP client.
//!
//! Uses a mock HTTP server to simulate gateway responses.

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use services::services::config::GatewayConfig;
use services::services::gateway::{GatewayClient, GatewayError};
use services::services::remote::RemoteRepo;
use services::services::schema::{Record, SyncTable};

fn client_for(server: &MockServer) -> GatewayClient {
    GatewayClient::new(GatewayConfig::new(server.uri(), "test-key")).expect("client")
}

#[tokio::test]
async fn test_execute_returns_recordset() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/query"))
        .and(header("x-api-key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {
                "recordset": [{"id": "u1", "email": "a@example.com"}],
                "rowsAffected": [1]
            },
            "error": null
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let result = client
        .execute("SELECT * FROM app_users", None)
        .await
        .expect("query");

    assert_eq!(result.recordset.len(), 1);
    assert_eq!(result.recordset[0].get("id"), Some(&json!("u1")));
    assert_eq!(result.rows_affected, vec![1]);
}

#[tokio::test]
async fn test_execute_sends_profile_and_omits_absent_params() {
    let server = MockServer::start().await;
    // `params` must not appear in the body at all when None.
    Mock::given(method("POST"))
        .and(path("/v1/query"))
        .and(body_partial_json(json!({
            "sql": "SELECT 1",
            "server": "primary",
            "database": "project_tracker"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {"recordset": [], "rowsAffected": []},
            "error": null
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.execute("SELECT 1", None).await.expect("query");

    let requests = server.received_requests().await.expect("requests");
    let body: serde_json::Value = requests[0].body_json().expect("json body");
    assert!(body.get("params").is_none());
}

#[tokio::test]
async fn test_gateway_failure_message_surfaces_verbatim() {
    let server = MockServer::start().await;
    let message = "Violation of UNIQUE KEY constraint 'UQ_app_users_email'";
    Mock::given(method("POST"))
        .and(path("/v1/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "data": null,
            "error": message
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .execute("INSERT INTO app_users (id) VALUES (@id)", None)
        .await
        .unwrap_err();

    match err {
        GatewayError::Gateway(msg) => assert_eq!(msg, message),
        other => panic!("expected Gateway error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_http_error_carries_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/query"))
        .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.execute("SELECT 1", None).await.unwrap_err();

    // Auth failures are not transient; the retry wrapper must not
    // hammer the gateway with a bad key.
    assert!(!err.is_transient());
    match err {
        GatewayError::Http { status, body } => {
            assert_eq!(status, 401);
            assert_eq!(body, "unauthorized");
        }
        other => panic!("expected Http error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_retry_recovers_from_transient_server_error() {
    let server = MockServer::start().await;
    // First attempt fails with a 503; the retry gets a clean response.
    Mock::given(method("POST"))
        .and(path("/v1/query"))
        .respond_with(ResponseTemplate::new(503).set_body_string("warming up"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {"recordset": [{"id": "u1"}], "rowsAffected": []},
            "error": null
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let result = client
        .execute_with_retry("SELECT * FROM app_users WHERE id = @id", None)
        .await
        .expect("retried query");
    assert_eq!(result.recordset.len(), 1);
}

#[tokio::test]
async fn test_health_check() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert!(client.health_check().await);
}

#[tokio::test]
async fn test_health_check_degraded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "degraded"})))
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert!(!client.health_check().await);
}

#[tokio::test]
async fn test_remote_repo_insert_translates_columns() {
    let server = MockServer::start().await;
    // The wire statement must use remote column names; the caller-facing
    // record uses local field names.
    Mock::given(method("POST"))
        .and(path("/v1/query"))
        .and(body_partial_json(json!({
            "params": {
                "id": "u1",
                "full_name": "Ada",
                "password_hash": "secret"
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {
                "recordset": [{
                    "id": "u1",
                    "full_name": "Ada",
                    "password_hash": "secret"
                }],
                "rowsAffected": [1]
            },
            "error": null
        })))
        .expect(1)
        .mount(&server)
        .await;

    let repo = RemoteRepo::new(Arc::new(client_for(&server)));

    let mut record = Record::new();
    record.insert("id".into(), json!("u1"));
    record.insert("name".into(), json!("Ada"));
    record.insert("password".into(), json!("secret"));

    let inserted = repo
        .insert(SyncTable::Users, &record)
        .await
        .expect("insert")
        .expect("row returned");

    // Response rows come back translated to local field names.
    assert_eq!(inserted.get("name"), Some(&json!("Ada")));
    assert_eq!(inserted.get("password"), Some(&json!("secret")));
    assert!(inserted.get("full_name").is_none());

    let requests = server.received_requests().await.expect("requests");
    let body: serde_json::Value = requests[0].body_json().expect("json body");
    let sql = body.get("sql").and_then(|v| v.as_str()).expect("sql");
    assert!(sql.contains("IF NOT EXISTS"), "{sql}");
    assert!(sql.contains("full_name"), "{sql}");
    assert!(!sql.contains("password)"), "local field name leaked: {sql}");
}
