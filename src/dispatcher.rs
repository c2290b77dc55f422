// Remote transformation dispatcher
//
// Builds the provider specific request for a transformation, issues it once
// and folds every outcome into a `TransformationResult`.

use reqwest::{Request, StatusCode};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

use crate::config::{Config, DeploymentKeys, ProviderEndpoints};
use crate::error::TransformError;
use crate::frameworks;
use crate::http_client::{error_kind, ProviderHttpClient};
use crate::models::anthropic::{
    AnthropicMessage, AnthropicMessagesRequest, AnthropicMessagesResponse, ANTHROPIC_VERSION,
};
use crate::models::google::{self, GenerateContentRequest};
use crate::models::openai::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage};
use crate::models::ErrorEnvelope;
use crate::resolver::{resolve_provider, Provider};
use crate::store::ApiKeySet;

/// Routing prefix that selects OpenRouter; not part of OpenRouter's own model ids
const OPENROUTER_PREFIX: &str = "openrouter/";

/// One transformation to perform
#[derive(Debug, Clone, PartialEq)]
pub struct TransformationRequest {
    pub input_text: String,
    pub framework: String,
    pub model: String,
    /// Extra instruction appended to the framework system prompt
    pub system_instruction: Option<String>,
}

impl TransformationRequest {
    pub fn new(
        input_text: impl Into<String>,
        framework: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            input_text: input_text.into(),
            framework: framework.into(),
            model: model.into(),
            system_instruction: None,
        }
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }
}

/// Outcome of a transformation: content or error, never both
///
/// Serializes as `{"content": "..."}` or `{"content": "", "error": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TransformationResult {
    Success { content: String },
    Failure { content: String, error: String },
}

impl TransformationResult {
    pub fn success(content: impl Into<String>) -> Self {
        TransformationResult::Success {
            content: content.into(),
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        TransformationResult::Failure {
            content: String::new(),
            error: error.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TransformationResult::Success { .. })
    }

    pub fn content(&self) -> &str {
        match self {
            TransformationResult::Success { content } | TransformationResult::Failure { content, .. } => content,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            TransformationResult::Success { .. } => None,
            TransformationResult::Failure { error, .. } => Some(error),
        }
    }
}

impl From<Result<String, TransformError>> for TransformationResult {
    fn from(result: Result<String, TransformError>) -> Self {
        match result {
            Ok(content) => TransformationResult::success(content),
            Err(e) => TransformationResult::failure(e.to_string()),
        }
    }
}

/// Provider independent knobs for outbound requests
#[derive(Debug, Clone)]
pub struct DispatcherSettings {
    pub endpoints: ProviderEndpoints,
    pub deployment_keys: DeploymentKeys,
    pub max_tokens: u32,
    pub temperature: f32,
    pub openrouter_referer: String,
    pub openrouter_title: String,
}

impl DispatcherSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            endpoints: config.endpoints.clone(),
            deployment_keys: config.deployment_keys.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            openrouter_referer: config.openrouter_referer.clone(),
            openrouter_title: config.openrouter_title.clone(),
        }
    }
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            endpoints: ProviderEndpoints::default(),
            deployment_keys: DeploymentKeys::default(),
            max_tokens: 1000,
            temperature: 0.7,
            openrouter_referer: "https://prompt-transformer.local".to_string(),
            openrouter_title: "Prompt Transformer Service".to_string(),
        }
    }
}

/// Sends transformations to the AI providers
pub struct Dispatcher {
    http: Arc<ProviderHttpClient>,
    settings: DispatcherSettings,
}

impl Dispatcher {
    pub fn new(http: Arc<ProviderHttpClient>, settings: DispatcherSettings) -> Self {
        Self { http, settings }
    }

    /// Transform `input_text` with `framework` on `model`
    pub async fn generate_prompt_with_ai(
        &self,
        input_text: &str,
        framework: &str,
        model: &str,
        api_keys: &ApiKeySet,
    ) -> TransformationResult {
        let request = TransformationRequest::new(input_text, framework, model);
        self.generate(&request, api_keys).await
    }

    /// Run a transformation; failures come back as `TransformationResult::Failure`
    pub async fn generate(
        &self,
        request: &TransformationRequest,
        api_keys: &ApiKeySet,
    ) -> TransformationResult {
        let started = Instant::now();
        let result = self.try_generate(request, api_keys).await;

        match &result {
            Ok(content) => tracing::info!(
                model = %request.model,
                framework = %request.framework,
                output_len = content.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Transformation succeeded"
            ),
            Err(e) => tracing::warn!(
                model = %request.model,
                framework = %request.framework,
                error_class = e.class(),
                error = %e,
                "Transformation failed"
            ),
        }

        result.into()
    }

    /// Same as `generate` but keeps the typed error
    pub async fn try_generate(
        &self,
        request: &TransformationRequest,
        api_keys: &ApiKeySet,
    ) -> Result<String, TransformError> {
        if request.input_text.trim().is_empty() {
            return Err(TransformError::EmptyInput);
        }

        let provider = resolve_provider(&request.model);
        let api_key = self.resolve_credential(provider, api_keys)?;

        tracing::info!(
            provider = %provider,
            model = %request.model,
            framework = %request.framework,
            input_len = request.input_text.len(),
            "Calling AI provider"
        );

        let system = system_prompt(request);
        let user = user_message(&request.input_text);
        let http_request = self.build_request(provider, &request.model, &api_key, &system, &user)?;

        let response = self.http.send(provider, http_request).await?;
        let status = response.status();
        let body = response.text().await.map_err(|e| TransformError::Transport {
            provider,
            kind: error_kind(&e),
            message: e.without_url().to_string(),
        })?;

        if !status.is_success() {
            return Err(upstream_error(provider, status, &body));
        }

        extract_content(provider, &body)
    }

    /// Deployment keys first for Google/OpenRouter; user keys for the rest
    fn resolve_credential(
        &self,
        provider: Provider,
        api_keys: &ApiKeySet,
    ) -> Result<String, TransformError> {
        let deployment = &self.settings.deployment_keys;
        let key = match provider {
            Provider::OpenRouter => deployment.openrouter.clone(),
            Provider::Google => deployment
                .google
                .clone()
                .or_else(|| Some(api_keys.google.clone())),
            Provider::OpenAI | Provider::Anthropic => Some(api_keys.get(provider).to_string()),
        };

        key.map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or(TransformError::MissingCredential(provider))
    }

    fn build_request(
        &self,
        provider: Provider,
        model: &str,
        api_key: &str,
        system: &str,
        user: &str,
    ) -> Result<Request, TransformError> {
        let client = self.http.client();
        let endpoints = &self.settings.endpoints;
        let model = upstream_model(provider, model);

        let builder = match provider {
            Provider::OpenAI | Provider::OpenRouter => {
                let body = ChatCompletionRequest {
                    model: model.to_string(),
                    messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
                    max_tokens: self.settings.max_tokens,
                    temperature: self.settings.temperature,
                };
                let base = if provider == Provider::OpenRouter {
                    &endpoints.openrouter
                } else {
                    &endpoints.openai
                };
                let builder = client
                    .post(format!("{}/v1/chat/completions", base))
                    .bearer_auth(api_key)
                    .json(&body);
                if provider == Provider::OpenRouter {
                    builder
                        .header("HTTP-Referer", &self.settings.openrouter_referer)
                        .header("X-Title", &self.settings.openrouter_title)
                } else {
                    builder
                }
            }
            Provider::Anthropic => {
                let body = AnthropicMessagesRequest {
                    model: model.to_string(),
                    max_tokens: self.settings.max_tokens,
                    messages: vec![AnthropicMessage {
                        role: "user".to_string(),
                        content: format!("{}\n\n{}", system, user),
                    }],
                };
                client
                    .post(format!("{}/v1/messages", endpoints.anthropic))
                    .header("x-api-key", api_key)
                    .header("anthropic-version", ANTHROPIC_VERSION)
                    .json(&body)
            }
            Provider::Google => {
                let body = GenerateContentRequest::single_text(
                    format!("{}\n\n{}", system, user),
                    self.settings.max_tokens,
                    self.settings.temperature,
                );
                client
                    .post(google_url(&endpoints.google, model)?)
                    .query(&[("key", api_key)])
                    .json(&body)
            }
        };

        builder
            .build()
            .map_err(|e| TransformError::Request(e.without_url().to_string()))
    }
}

/// Model id as the provider expects it
pub fn upstream_model(provider: Provider, model: &str) -> &str {
    let model = model.trim();
    if provider == Provider::OpenRouter {
        if let Some(head) = model.get(..OPENROUTER_PREFIX.len()) {
            if head.eq_ignore_ascii_case(OPENROUTER_PREFIX) {
                return &model[OPENROUTER_PREFIX.len()..];
            }
        }
    }
    model
}

/// generateContent URL; the model id is one encoded path segment
fn google_url(base: &str, model: &str) -> Result<reqwest::Url, TransformError> {
    let mut url = reqwest::Url::parse(base)
        .map_err(|e| TransformError::Request(format!("invalid Google base URL: {}", e)))?;
    url.path_segments_mut()
        .map_err(|_| TransformError::Request(format!("invalid Google base URL: {}", base)))?
        .pop_if_empty()
        .extend(["v1beta", "models", format!("{}:generateContent", model).as_str()]);
    Ok(url)
}

fn system_prompt(request: &TransformationRequest) -> String {
    let base = frameworks::system_instruction(&request.framework);
    match request
        .system_instruction
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        Some(extra) => format!("{}\n\nAdditional instructions:\n{}", base, extra),
        None => base,
    }
}

fn user_message(input_text: &str) -> String {
    format!("Transform this input: \"{}\"", input_text)
}

/// Map a non-2xx response to the message shown to the user
fn upstream_error(provider: Provider, status: StatusCode, body: &str) -> TransformError {
    let message = match status.as_u16() {
        401 | 403 => format!(
            "Invalid API key. Please check your {} API key.",
            provider.display_name()
        ),
        429 => "Rate limit exceeded. Please try again later.".to_string(),
        _ => ErrorEnvelope::parse(body)
            .message()
            .map(str::to_string)
            .unwrap_or_else(|| {
                format!(
                    "{} API error: {} {}",
                    provider.display_name(),
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("Unknown Error")
                )
            }),
    };

    tracing::error!(
        provider = %provider,
        status = status.as_u16(),
        response_body = %body,
        "Provider returned an error"
    );

    TransformError::Upstream {
        provider,
        status: status.as_u16(),
        message,
    }
}

/// Pull the generated text out of a 2xx body; blank content is an error
fn extract_content(provider: Provider, body: &str) -> Result<String, TransformError> {
    let content = match provider {
        Provider::OpenAI | Provider::OpenRouter => serde_json::from_str::<ChatCompletionResponse>(body)
            .ok()
            .and_then(|r| r.content().map(str::to_string)),
        Provider::Anthropic => serde_json::from_str::<AnthropicMessagesResponse>(body)
            .ok()
            .and_then(|r| r.text().map(str::to_string)),
        Provider::Google => serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| google::extract_text(&v).map(str::to_string)),
    };

    content
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .ok_or_else(|| {
            tracing::warn!(provider = %provider, "Provider response contained no content");
            TransformError::EmptyContent(provider)
        })
}
