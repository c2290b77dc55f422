// Integration tests for Prompt Transformer
//
// These tests drive the full HTTP stack (routing, auth middleware, stores and
// dispatcher) against an in-memory database and a mock provider server.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use mockito::Matcher;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use prompt_transformer::{
    config::{DeploymentKeys, ProviderEndpoints},
    dispatcher::{Dispatcher, DispatcherSettings},
    http_client::ProviderHttpClient,
    routes::{self, AppState},
    store::{Database, SqliteCredentialStore, SqliteHistoryStore, SqliteInstructionStore},
};

const API_KEY: &str = "test-api-key-secret";

// ==================================================================================================
// Test Helpers
// ==================================================================================================

/// Create a test application state; every provider points at `base_url`
fn create_test_app_state(base_url: &str) -> AppState {
    let db = Database::open_in_memory().expect("Failed to open in-memory database");
    let http_client =
        Arc::new(ProviderHttpClient::new(5, 10).expect("Failed to create HTTP client"));

    let settings = DispatcherSettings {
        endpoints: ProviderEndpoints {
            openai: base_url.to_string(),
            anthropic: base_url.to_string(),
            google: base_url.to_string(),
            openrouter: base_url.to_string(),
        },
        deployment_keys: DeploymentKeys {
            openrouter: Some("sk-or-deploy".to_string()),
            google: None,
        },
        ..DispatcherSettings::default()
    };

    AppState {
        proxy_api_key: API_KEY.to_string(),
        dispatcher: Arc::new(Dispatcher::new(http_client, settings)),
        credentials: Arc::new(SqliteCredentialStore::new(db.clone())),
        history: Arc::new(SqliteHistoryStore::new(db.clone())),
        instructions: SqliteInstructionStore::new(db),
    }
}

/// Build the test application router
fn build_test_app(state: AppState) -> Router {
    routes::build_app(state)
}

/// Helper to parse JSON response body
async fn parse_json_body(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn authed(method: &str, uri: &str) -> axum::http::request::Builder {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", API_KEY))
}

async fn send_json(app: &Router, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            authed(method, uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    (status, parse_json_body(response.into_body()).await)
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(authed("GET", uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    (status, parse_json_body(response.into_body()).await)
}

// ==================================================================================================
// Health Check Tests
// ==================================================================================================

#[tokio::test]
async fn test_root_endpoint() {
    let app = build_test_app(create_test_app_state("http://127.0.0.1:9"));

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = parse_json_body(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["message"], "Prompt Transformer is running");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = build_test_app(create_test_app_state("http://127.0.0.1:9"));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = parse_json_body(response.into_body()).await;
    assert_eq!(body["status"], "healthy");
    assert!(body["timestamp"].is_string());
}

// ==================================================================================================
// Authentication Tests
// ==================================================================================================

#[tokio::test]
async fn test_frameworks_without_auth() {
    let app = build_test_app(create_test_app_state("http://127.0.0.1:9"));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/v1/frameworks")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = parse_json_body(response.into_body()).await;
    assert_eq!(body["error"]["type"], "auth_error");
    assert!(body["error"]["message"].as_str().unwrap().contains("API Key"));
}

#[tokio::test]
async fn test_transform_with_invalid_auth() {
    let app = build_test_app(create_test_app_state("http://127.0.0.1:9"));

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/transform")
                .header("x-api-key", "wrong-api-key")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({"input": "hi", "framework": "CLEAR", "model": "gpt-4"}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_x_api_key_header_is_accepted() {
    let app = build_test_app(create_test_app_state("http://127.0.0.1:9"));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/v1/models")
                .header("x-api-key", API_KEY)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

// ==================================================================================================
// Catalog Tests
// ==================================================================================================

#[tokio::test]
async fn test_frameworks_listing() {
    let app = build_test_app(create_test_app_state("http://127.0.0.1:9"));

    let (status, body) = get_json(&app, "/v1/frameworks").await;
    assert_eq!(status, StatusCode::OK);

    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["CLEAR", "STAR", "STaC", "PEACH"]);
    assert_eq!(body[0]["structure"].as_array().unwrap().len(), 5);
    assert!(body[0].get("guidance").is_none());
}

#[tokio::test]
async fn test_models_listing() {
    let app = build_test_app(create_test_app_state("http://127.0.0.1:9"));

    let (status, body) = get_json(&app, "/v1/models").await;
    assert_eq!(status, StatusCode::OK);

    let models = body.as_array().unwrap();
    let gpt4 = models.iter().find(|m| m["id"] == "gpt-4").unwrap();
    assert_eq!(gpt4["provider"], "openai");
    let gemini = models.iter().find(|m| m["id"] == "gemini-pro").unwrap();
    assert_eq!(gemini["provider"], "google");
}

// ==================================================================================================
// Local Transform Tests
// ==================================================================================================

#[tokio::test]
async fn test_local_transform_clear() {
    let app = build_test_app(create_test_app_state("http://127.0.0.1:9"));

    let (status, body) = send_json(
        &app,
        "POST",
        "/v1/transform/local",
        json!({
            "input": "Write a blog post about sustainable gardening for beginners",
            "framework": "CLEAR",
            "model": "gpt-4"
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let content = body["content"].as_str().unwrap();
    assert!(content.starts_with("**Context:**"));
    for header in ["**Length:**", "**Examples:**", "**Audience:**", "**Role:**"] {
        assert!(content.contains(header), "missing {}", header);
    }
}

#[tokio::test]
async fn test_local_transform_unknown_framework() {
    let app = build_test_app(create_test_app_state("http://127.0.0.1:9"));

    let (status, body) = send_json(
        &app,
        "POST",
        "/v1/transform/local",
        json!({"input": "hello", "framework": "XYZ", "model": "gpt-4"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["content"].as_str().unwrap().contains("not supported"));
}

// ==================================================================================================
// Remote Transform Tests
// ==================================================================================================

#[tokio::test]
async fn test_transform_success_is_saved_to_history() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/chat/completions")
        .match_header("authorization", "Bearer sk-or-deploy")
        .match_body(Matcher::PartialJson(json!({"model": "openai/gpt-4o"})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"choices":[{"message":{"content":"  **Situation:** tea shop  "}}]}"#)
        .create_async()
        .await;

    let app = build_test_app(create_test_app_state(&server.url()));

    let (status, body) = send_json(
        &app,
        "POST",
        "/v1/transform",
        json!({
            "input": "blog about tea",
            "framework": "STAR",
            "model": "openrouter/openai/gpt-4o",
            "save": true
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"], "**Situation:** tea shop");
    assert!(body.get("error").is_none());
    let prompt_id = body["prompt_id"].as_str().unwrap().to_string();
    mock.assert_async().await;

    let (status, history) = get_json(&app, "/v1/prompts").await;
    assert_eq!(status, StatusCode::OK);
    let prompts = history.as_array().unwrap();
    assert_eq!(prompts.len(), 1);
    assert_eq!(prompts[0]["id"], prompt_id.as_str());
    assert_eq!(prompts[0]["framework"], "STAR");
    let transformation = &prompts[0]["transformations"][0];
    assert_eq!(transformation["transformed_content"], "**Situation:** tea shop");
    assert_eq!(transformation["provider"], "openrouter");
    assert_eq!(transformation["model_used"], "openai/gpt-4o");

    // deleting the prompt removes its transformations with it
    let response = app
        .clone()
        .oneshot(
            authed("DELETE", &format!("/v1/prompts/{}", prompt_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let (_, history) = get_json(&app, "/v1/prompts").await;
    assert!(history.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_transform_empty_input() {
    let app = build_test_app(create_test_app_state("http://127.0.0.1:9"));

    let (status, body) = send_json(
        &app,
        "POST",
        "/v1/transform",
        json!({"input": "   ", "framework": "CLEAR", "model": "gpt-4", "save": true}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"], "");
    assert_eq!(body["error"], "Please provide some input text to transform.");
    assert!(body.get("prompt_id").is_none());
}

#[tokio::test]
async fn test_transform_missing_user_key() {
    let app = build_test_app(create_test_app_state("http://127.0.0.1:9"));

    let (status, body) = send_json(
        &app,
        "POST",
        "/v1/transform",
        json!({"input": "hello", "framework": "CLEAR", "model": "claude-3-opus"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"], "");
    assert!(body["error"].as_str().unwrap().contains("Anthropic"));
}

#[tokio::test]
async fn test_transform_upstream_401() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/v1/chat/completions")
        .with_status(401)
        .with_body(r#"{"error":{"message":"bad key"}}"#)
        .create_async()
        .await;

    let app = build_test_app(create_test_app_state(&server.url()));

    let (status, _) = send_json(&app, "PUT", "/v1/keys/openai", json!({"key": "sk-user"})).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send_json(
        &app,
        "POST",
        "/v1/transform",
        json!({"input": "hello", "framework": "CLEAR", "model": "gpt-4", "save": true}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["error"],
        "Invalid API key. Please check your OpenAI API key."
    );

    // failures are never written to history
    let (_, history) = get_json(&app, "/v1/prompts").await;
    assert!(history.as_array().unwrap().is_empty());
}

// ==================================================================================================
// Credential Tests
// ==================================================================================================

#[tokio::test]
async fn test_key_save_status_delete() {
    let app = build_test_app(create_test_app_state("http://127.0.0.1:9"));

    let (_, status_body) = get_json(&app, "/v1/keys").await;
    assert_eq!(
        status_body,
        json!({"openai": false, "anthropic": false, "google": false})
    );

    let (_, body) = send_json(&app, "PUT", "/v1/keys/anthropic", json!({"key": "sk-ant"})).await;
    assert_eq!(body, json!({"success": true}));

    let (_, status_body) = get_json(&app, "/v1/keys").await;
    assert_eq!(status_body["anthropic"], true);
    // the key itself never leaves the server
    assert!(!status_body.to_string().contains("sk-ant"));

    let response = app
        .clone()
        .oneshot(
            authed("DELETE", "/v1/keys/anthropic")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = parse_json_body(response.into_body()).await;
    assert_eq!(body, json!({"success": true}));

    let (_, status_body) = get_json(&app, "/v1/keys").await;
    assert_eq!(status_body["anthropic"], false);
}

#[tokio::test]
async fn test_key_save_rejects_unknown_provider() {
    let app = build_test_app(create_test_app_state("http://127.0.0.1:9"));

    let (status, body) = send_json(&app, "PUT", "/v1/keys/mistral", json!({"key": "k"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());
}

// ==================================================================================================
// System Instruction Tests
// ==================================================================================================

#[tokio::test]
async fn test_instruction_crud() {
    let app = build_test_app(create_test_app_state("http://127.0.0.1:9"));

    let (status, created) = send_json(
        &app,
        "POST",
        "/v1/instructions",
        json!({"name": "Tone", "content": "Be friendly"}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_str().unwrap().to_string();

    let (status, updated) = send_json(
        &app,
        "PUT",
        &format!("/v1/instructions/{}", id),
        json!({"name": "Tone", "content": "Be formal"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["content"], "Be formal");

    let (_, list) = get_json(&app, "/v1/instructions").await;
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (status, body) = send_json(
        &app,
        "POST",
        "/v1/instructions",
        json!({"name": " ", "content": "x"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "validation_error");

    let response = app
        .clone()
        .oneshot(
            authed("DELETE", &format!("/v1/instructions/{}", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .clone()
        .oneshot(
            authed("DELETE", &format!("/v1/instructions/{}", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_transform_uses_selected_instruction() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/chat/completions")
        .match_body(Matcher::Regex("Always answer in French".to_string()))
        .with_status(200)
        .with_body(r#"{"choices":[{"message":{"content":"bonjour"}}]}"#)
        .create_async()
        .await;

    let app = build_test_app(create_test_app_state(&server.url()));

    let (_, created) = send_json(
        &app,
        "POST",
        "/v1/instructions",
        json!({"name": "French", "content": "Always answer in French"}),
    )
    .await;

    let (status, body) = send_json(
        &app,
        "POST",
        "/v1/transform",
        json!({
            "input": "hello",
            "framework": "PEACH",
            "model": "openrouter/mistral/mistral-7b",
            "instruction_id": created["id"]
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"], "bonjour");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_transform_with_unknown_instruction() {
    let app = build_test_app(create_test_app_state("http://127.0.0.1:9"));

    let (status, body) = send_json(
        &app,
        "POST",
        "/v1/transform",
        json!({"input": "hello", "framework": "CLEAR", "model": "gpt-4", "instruction_id": "nope"}),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["type"], "not_found");
}
