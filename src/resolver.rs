// Provider resolution from free-form model identifiers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Upstream AI vendor or gateway that serves a completion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAI,
    Anthropic,
    Google,
    OpenRouter,
}

impl Provider {
    /// Tag used in storage and JSON ("openai", "anthropic", ...)
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenAI => "openai",
            Provider::Anthropic => "anthropic",
            Provider::Google => "google",
            Provider::OpenRouter => "openrouter",
        }
    }

    /// Human readable vendor name for messages
    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::OpenAI => "OpenAI",
            Provider::Anthropic => "Anthropic",
            Provider::Google => "Google",
            Provider::OpenRouter => "OpenRouter",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAI),
            "anthropic" => Ok(Provider::Anthropic),
            "google" => Ok(Provider::Google),
            "openrouter" => Ok(Provider::OpenRouter),
            other => Err(format!("Unknown provider: {}", other)),
        }
    }
}

/// Provider used when no rule matches
pub const DEFAULT_PROVIDER: Provider = Provider::OpenAI;

/// Ordered (needle, provider) rules; first match wins.
///
/// "openrouter" is checked before the vendor names because the gateway owns
/// authentication for ids like "openrouter/openai/gpt-4o".
const PROVIDER_RULES: &[(&str, Provider)] = &[
    ("openrouter", Provider::OpenRouter),
    ("gpt", Provider::OpenAI),
    ("claude", Provider::Anthropic),
    ("gemini", Provider::Google),
];

/// Classify a model id into a provider
pub fn resolve_provider(model_id: &str) -> Provider {
    match_rule(model_id).unwrap_or_else(|| {
        tracing::warn!(
            model = model_id,
            fallback = %DEFAULT_PROVIDER,
            "Unrecognized model id, using default provider"
        );
        DEFAULT_PROVIDER
    })
}

/// Rule lookup without the default; `None` when nothing matches
pub fn match_rule(model_id: &str) -> Option<Provider> {
    let lower = model_id.to_lowercase();
    PROVIDER_RULES
        .iter()
        .find(|(needle, _)| lower.contains(needle))
        .map(|(_, provider)| *provider)
}

/// A model offered in the selector
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub provider: Provider,
    pub strengths: &'static [&'static str],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge: Option<&'static str>,
    pub description: &'static str,
}

const KNOWN_MODELS: &[ModelInfo] = &[
    ModelInfo {
        id: "gpt-4",
        name: "GPT-4",
        provider: Provider::OpenAI,
        strengths: &["Advanced Reasoning", "Code", "Analysis"],
        badge: Some("Latest"),
        description: "Most capable OpenAI model for complex tasks",
    },
    ModelInfo {
        id: "gpt-3.5-turbo",
        name: "GPT-3.5 Turbo",
        provider: Provider::OpenAI,
        strengths: &["Speed", "Cost-Effective", "General Purpose"],
        badge: None,
        description: "Fast and efficient for most tasks",
    },
    ModelInfo {
        id: "claude-3",
        name: "Claude 3 Sonnet",
        provider: Provider::Anthropic,
        strengths: &["Writing", "Safety", "Long Context"],
        badge: Some("Recommended"),
        description: "Excellent for creative writing and analysis",
    },
    ModelInfo {
        id: "gemini-pro",
        name: "Gemini Pro",
        provider: Provider::Google,
        strengths: &["Multimodal", "Integration", "Research"],
        badge: None,
        description: "Google's advanced AI with strong research capabilities",
    },
];

/// Models offered for selection; any other id is still accepted
pub fn known_models() -> &'static [ModelInfo] {
    KNOWN_MODELS
}
