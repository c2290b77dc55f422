use anyhow::Context;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware::{self as axum_middleware},
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;

use crate::dispatcher::{upstream_model, Dispatcher, TransformationRequest, TransformationResult};
use crate::error::{ApiError, Result, StoreError};
use crate::frameworks::{self, Framework};
use crate::middleware;
use crate::resolver::{self, resolve_provider, ModelInfo, Provider};
use crate::store::{
    ApiKeySet, CredentialStore, HistoryStore, KeyStatus, PromptRecord, SqliteInstructionStore,
    SystemInstruction,
};
use crate::templates;

/// Run a store call on the blocking pool
async fn run_store<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> std::result::Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    let value = tokio::task::spawn_blocking(f)
        .await
        .context("store task failed")??;
    Ok(value)
}

/// Application version from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub proxy_api_key: String,
    pub dispatcher: Arc<Dispatcher>,
    pub credentials: Arc<dyn CredentialStore>,
    pub history: Arc<dyn HistoryStore>,
    pub instructions: SqliteInstructionStore,
}

/// Full application: health routes, authenticated API routes, CORS and tracing
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(health_routes())
        .merge(api_routes(state))
        .layer(middleware::cors_layer())
        .layer(TraceLayer::new_for_http())
}

/// Health check routes (no authentication required)
pub fn health_routes() -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
}

/// Prompt API routes (require authentication)
pub fn api_routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/frameworks", get(frameworks_handler))
        .route("/v1/models", get(models_handler))
        .route("/v1/transform", post(transform_handler))
        .route("/v1/transform/local", post(local_transform_handler))
        .route("/v1/prompts", get(list_prompts_handler))
        .route("/v1/prompts/:id", axum::routing::delete(delete_prompt_handler))
        .route("/v1/keys", get(key_status_handler))
        .route(
            "/v1/keys/:provider",
            put(save_key_handler).delete(delete_key_handler),
        )
        .route(
            "/v1/instructions",
            get(list_instructions_handler).post(add_instruction_handler),
        )
        .route(
            "/v1/instructions/:id",
            put(update_instruction_handler).delete(delete_instruction_handler),
        )
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ))
        .with_state(state)
}

/// GET / - Simple health check
async fn root_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "message": "Prompt Transformer is running",
        "version": VERSION
    }))
}

/// GET /health - Detailed health check
async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
        "version": VERSION
    }))
}

/// GET /v1/frameworks
async fn frameworks_handler() -> Json<&'static [Framework]> {
    Json(frameworks::list_frameworks())
}

/// GET /v1/models
async fn models_handler() -> Json<&'static [ModelInfo]> {
    Json(resolver::known_models())
}

#[derive(Debug, Deserialize)]
pub struct TransformBody {
    #[serde(default)]
    pub input: String,
    #[serde(default)]
    pub framework: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub instruction_id: Option<String>,
    /// Persist prompt and result to history on success
    #[serde(default)]
    pub save: bool,
}

#[derive(Debug, Serialize)]
pub struct TransformResponse {
    #[serde(flatten)]
    pub result: TransformationResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_id: Option<String>,
}

/// POST /v1/transform - Transform input with an AI provider
///
/// Always answers 200; failures are reported in the `error` field.
async fn transform_handler(
    State(state): State<AppState>,
    Json(body): Json<TransformBody>,
) -> Result<Json<TransformResponse>> {
    tracing::info!(
        "Request to /v1/transform: framework={}, model={}, save={}",
        body.framework,
        body.model,
        body.save
    );

    let mut request = TransformationRequest::new(&body.input, &body.framework, &body.model);
    if let Some(id) = body.instruction_id.clone() {
        let instructions = state.instructions.clone();
        let lookup_id = id.clone();
        let instruction = run_store(move || instructions.get(&lookup_id))
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("instruction {}", id)))?;
        request = request.with_system_instruction(instruction.content);
    }

    let credentials = state.credentials.clone();
    let api_keys = match run_store(move || credentials.load()).await {
        Ok(keys) => keys,
        Err(e) => {
            tracing::error!("Failed to load API keys: {}", e);
            return Ok(Json(TransformResponse {
                result: TransformationResult::failure(format!("Failed to load API keys: {}", e)),
                prompt_id: None,
            }));
        }
    };

    let started = Instant::now();
    let result = state.dispatcher.generate(&request, &api_keys).await;
    let elapsed_ms = started.elapsed().as_millis() as i64;

    let prompt_id = if body.save && result.is_success() {
        let history = state.history.clone();
        let saved_request = request.clone();
        let content = result.content().to_string();
        tokio::task::spawn_blocking(move || {
            save_history(history.as_ref(), &saved_request, &content, elapsed_ms)
        })
        .await
        .unwrap_or_else(|e| {
            tracing::error!("History task failed: {}", e);
            None
        })
    } else {
        None
    };

    Ok(Json(TransformResponse { result, prompt_id }))
}

/// Prompt row first, then the transformation; failures are logged, not returned
///
/// A prompt whose transformation cannot be stored is removed again.
fn save_history(
    history: &dyn HistoryStore,
    request: &TransformationRequest,
    content: &str,
    elapsed_ms: i64,
) -> Option<String> {
    let prompt = match history.save(&request.input_text, &request.framework, &request.model, None) {
        Ok(prompt) => prompt,
        Err(e) => {
            tracing::error!("Error saving prompt: {}", e);
            return None;
        }
    };

    let provider = resolve_provider(&request.model);
    if let Err(e) = history.save_transformation(
        &prompt.id,
        content,
        provider.as_str(),
        upstream_model(provider, &request.model),
        Some(elapsed_ms),
    ) {
        tracing::error!("Error saving transformation: {}", e);
        if let Err(e) = history.delete(&prompt.id) {
            tracing::error!(prompt_id = %prompt.id, "Error removing orphaned prompt: {}", e);
        }
        return None;
    }

    Some(prompt.id)
}

#[derive(Debug, Deserialize)]
pub struct LocalTransformBody {
    #[serde(default)]
    pub input: String,
    #[serde(default)]
    pub framework: String,
    #[serde(default)]
    pub model: String,
}

/// POST /v1/transform/local - Template based transformation, no provider call
async fn local_transform_handler(Json(body): Json<LocalTransformBody>) -> Json<Value> {
    let content = templates::transform(&body.input, &body.framework, &body.model);
    Json(json!({ "content": content }))
}

/// GET /v1/prompts - History, newest first
async fn list_prompts_handler(State(state): State<AppState>) -> Result<Json<Vec<PromptRecord>>> {
    let history = state.history.clone();
    Ok(Json(run_store(move || history.list()).await?))
}

/// DELETE /v1/prompts/:id
async fn delete_prompt_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let history = state.history.clone();
    let target = id.clone();
    run_store(move || history.delete(&target)).await?;
    tracing::info!(prompt_id = %id, "Deleted prompt");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /v1/keys - Which providers have a stored key
async fn key_status_handler(State(state): State<AppState>) -> Result<Json<KeyStatus>> {
    let credentials = state.credentials.clone();
    let keys: ApiKeySet = run_store(move || credentials.load()).await?;
    Ok(Json(keys.status()))
}

#[derive(Debug, Deserialize)]
pub struct SaveKeyBody {
    pub key: String,
}

/// `{success, error?}` outcome of a key operation
#[derive(Debug, Serialize, PartialEq)]
pub struct KeyOperation {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl KeyOperation {
    fn from_result<E: std::fmt::Display>(result: std::result::Result<(), E>) -> Self {
        match result {
            Ok(()) => Self {
                success: true,
                error: None,
            },
            Err(e) => Self {
                success: false,
                error: Some(e.to_string()),
            },
        }
    }
}

/// PUT /v1/keys/:provider
async fn save_key_handler(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Json(body): Json<SaveKeyBody>,
) -> Json<KeyOperation> {
    let result = match provider.parse::<Provider>() {
        Ok(p) => {
            let credentials = state.credentials.clone();
            key_operation(move || credentials.save(p, &body.key)).await
        }
        Err(e) => Err(e),
    };
    Json(KeyOperation::from_result(result))
}

/// DELETE /v1/keys/:provider
async fn delete_key_handler(
    State(state): State<AppState>,
    Path(provider): Path<String>,
) -> Json<KeyOperation> {
    let result = match provider.parse::<Provider>() {
        Ok(p) => {
            let credentials = state.credentials.clone();
            key_operation(move || credentials.delete(p)).await
        }
        Err(e) => Err(e),
    };
    Json(KeyOperation::from_result(result))
}

/// Credential write on the blocking pool, errors flattened to their message
async fn key_operation<F>(f: F) -> std::result::Result<(), String>
where
    F: FnOnce() -> std::result::Result<(), StoreError> + Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result.map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    }
}

#[derive(Debug, Deserialize)]
pub struct InstructionBody {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub content: String,
}

/// GET /v1/instructions
async fn list_instructions_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<SystemInstruction>>> {
    let instructions = state.instructions.clone();
    Ok(Json(run_store(move || instructions.list()).await?))
}

/// POST /v1/instructions
async fn add_instruction_handler(
    State(state): State<AppState>,
    Json(body): Json<InstructionBody>,
) -> Result<(StatusCode, Json<SystemInstruction>)> {
    let instructions = state.instructions.clone();
    let instruction = run_store(move || instructions.add(&body.name, &body.content)).await?;
    Ok((StatusCode::CREATED, Json(instruction)))
}

/// PUT /v1/instructions/:id
async fn update_instruction_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<InstructionBody>,
) -> Result<Json<SystemInstruction>> {
    let instructions = state.instructions.clone();
    Ok(Json(
        run_store(move || instructions.update(&id, &body.name, &body.content)).await?,
    ))
}

/// DELETE /v1/instructions/:id
async fn delete_instruction_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let instructions = state.instructions.clone();
    run_store(move || instructions.delete(&id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
