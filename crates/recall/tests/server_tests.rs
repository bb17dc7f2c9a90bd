//! Full-stack integration test
//!
//! Drives the HTTP surface with the real remote oracle (against a mock
//! LLM endpoint) and real file-backed storage, end to end.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use recall_server::config::OracleConfig;
use recall_server::memory::{ConflictPairs, MemoryService};
use recall_server::oracle::RemoteOracle;
use recall_server::server::{AppState, create_router};
use recall_server::storage::FileStore;

fn completion_body(content: &str) -> serde_json::Value {
    json!({
        "choices": [{
            "message": {
                "content": content
            }
        }]
    })
}

async fn mock_llm(extraction: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(extraction)))
        .mount(&server)
        .await;
    server
}

fn app_over(dir: &TempDir, llm: &MockServer) -> axum::Router {
    unsafe { std::env::set_var("TEST_STACK_API_KEY", "test-key") };
    let config = OracleConfig {
        enabled: true,
        api_url: llm.uri(),
        api_key_env: "TEST_STACK_API_KEY".to_string(),
        model: "gpt-4o-mini".to_string(),
        timeout_secs: 5,
    };
    let oracle = RemoteOracle::new(&config).unwrap();
    let store = FileStore::new(dir.path()).unwrap();

    let service = Arc::new(MemoryService::new(
        Arc::new(store),
        Arc::new(oracle),
        ConflictPairs::default(),
        3,
        Duration::from_millis(1),
    ));

    create_router(Arc::new(AppState { service }), Duration::from_secs(5))
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn message_flows_from_http_to_disk_and_back() {
    let dir = TempDir::new().unwrap();
    let llm = mock_llm(r#"{"name": "John", "likes": ["pizza"]}"#).await;
    let app = app_over(&dir, &llm);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/users/john/messages")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({"message": "Hi, I'm John and I love pizza"}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["changes"].as_array().unwrap().len(), 2);
    assert_eq!(
        body["context"],
        "User Personal Information:\n- likes: pizza\n- name: John"
    );

    // The snapshot is readable back through the API
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/users/john/memories")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(
        body_json(response).await,
        json!({"likes": ["pizza"], "name": "John"})
    );

    // And it hit the disk, not just process memory
    let user_files: Vec<_> = std::fs::read_dir(dir.path().join("users"))
        .unwrap()
        .collect();
    assert_eq!(user_files.len(), 1);

    // Deleting a field removes it from subsequent reads
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/users/john/memories/likes")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/users/john/context")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(
        body_json(response).await,
        json!({"context": "User Personal Information:\n- name: John"})
    );
}

#[tokio::test]
async fn llm_outage_still_returns_ok_with_no_changes() {
    let dir = TempDir::new().unwrap();

    // An LLM endpoint that always errors
    let llm = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&llm)
        .await;

    let app = app_over(&dir, &llm);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/users/u1/messages")
                .header("content-type", "application/json")
                .body(Body::from(json!({"message": "hello"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    // Oracle failure degrades to "no update", not a client-facing error
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["changes"], json!([]));
    assert_eq!(body["context"], "");
}
