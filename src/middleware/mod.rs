// Authentication and CORS middleware

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use tower_http::cors::{Any, CorsLayer};

use crate::error::ApiError;
use crate::routes::AppState;

/// Authentication middleware
///
/// Verifies the API key in the Authorization header or x-api-key header.
/// Expects format: "Bearer {PROXY_API_KEY}" or just the key in x-api-key.
pub async fn auth_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(auth_header) = request.headers().get("authorization") {
        if let Ok(auth_str) = auth_header.to_str() {
            if auth_str.strip_prefix("Bearer ") == Some(state.proxy_api_key.as_str()) {
                return Ok(next.run(request).await);
            }
        }
    }

    if let Some(api_key_header) = request.headers().get("x-api-key") {
        if let Ok(key_str) = api_key_header.to_str() {
            if key_str == state.proxy_api_key {
                return Ok(next.run(request).await);
            }
        }
    }

    let path = request.uri().path();
    let method = request.method();
    let request_id = uuid::Uuid::new_v4().to_string()[..8].to_string();
    tracing::warn!(
        "[{}] Access attempt with invalid or missing API key: {} {}",
        request_id,
        method,
        path
    );
    Err(ApiError::AuthError(
        "Invalid or missing API Key".to_string(),
    ))
}

/// Create CORS middleware layer
///
/// The browser UI is served from another origin, so every origin is allowed.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::{Dispatcher, DispatcherSettings};
    use crate::http_client::ProviderHttpClient;
    use crate::store::{Database, SqliteCredentialStore, SqliteHistoryStore, SqliteInstructionStore};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        routing::get,
        Router,
    };
    use std::sync::Arc;
    use tower::util::ServiceExt;

    fn create_test_state() -> AppState {
        let db = Database::open_in_memory().unwrap();
        let http = Arc::new(ProviderHttpClient::new(5, 10).unwrap());
        AppState {
            proxy_api_key: "test-key-123".to_string(),
            dispatcher: Arc::new(Dispatcher::new(http, DispatcherSettings::default())),
            credentials: Arc::new(SqliteCredentialStore::new(db.clone())),
            history: Arc::new(SqliteHistoryStore::new(db.clone())),
            instructions: SqliteInstructionStore::new(db),
        }
    }

    async fn test_handler() -> &'static str {
        "OK"
    }

    fn create_test_app(state: AppState) -> Router {
        Router::new()
            .route("/test", get(test_handler))
            .layer(axum::middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            ))
            .with_state(state)
    }

    async fn status_for(header: Option<(&str, &str)>) -> StatusCode {
        let app = create_test_app(create_test_state());
        let mut builder = Request::builder().uri("/test");
        if let Some((name, value)) = header {
            builder = builder.header(name, value);
        }
        let request = builder.body(Body::empty()).unwrap();
        app.oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn test_auth_middleware_with_valid_bearer_token() {
        assert_eq!(
            status_for(Some(("authorization", "Bearer test-key-123"))).await,
            StatusCode::OK
        );
    }

    #[tokio::test]
    async fn test_auth_middleware_with_valid_x_api_key() {
        assert_eq!(
            status_for(Some(("x-api-key", "test-key-123"))).await,
            StatusCode::OK
        );
    }

    #[tokio::test]
    async fn test_auth_middleware_rejects_bad_credentials() {
        assert_eq!(
            status_for(Some(("authorization", "Bearer wrong-key"))).await,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_for(Some(("x-api-key", "wrong-key"))).await,
            StatusCode::UNAUTHORIZED
        );
        // token without "Bearer " prefix
        assert_eq!(
            status_for(Some(("authorization", "test-key-123"))).await,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(status_for(None).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_cors_layer_allows_all_origins() {
        let app = Router::new()
            .route("/test", get(test_handler))
            .layer(cors_layer());

        let request = Request::builder()
            .uri("/test")
            .header("origin", "https://example.com")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        let allow_origin = response
            .headers()
            .get("access-control-allow-origin")
            .unwrap();
        assert_eq!(allow_origin, "*");
    }

    #[tokio::test]
    async fn test_cors_layer_handles_preflight_options() {
        let app = Router::new()
            .route("/test", get(test_handler))
            .layer(cors_layer());

        let request = Request::builder()
            .method("OPTIONS")
            .uri("/test")
            .header("origin", "https://example.com")
            .header("access-control-request-method", "POST")
            .header("access-control-request-headers", "content-type, x-api-key")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("access-control-allow-methods").unwrap(),
            "*"
        );
        assert_eq!(
            response.headers().get("access-control-allow-headers").unwrap(),
            "*"
        );
    }
}
