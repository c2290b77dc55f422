// Wire formats for the upstream provider APIs

pub mod anthropic;
pub mod google;
pub mod openai;

use serde::Deserialize;

/// Error envelope shared by all providers: `{"error": {"message": "..."}}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorEnvelope {
    #[serde(default)]
    pub error: Option<ErrorBody>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, rename = "type")]
    pub error_type: Option<String>,
}

impl ErrorEnvelope {
    /// Parse an error body, tolerating non-JSON and unexpected shapes
    pub fn parse(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_default()
    }

    /// Provider supplied message, if any and non-blank
    pub fn message(&self) -> Option<&str> {
        self.error
            .as_ref()
            .and_then(|e| e.message.as_deref())
            .map(str::trim)
            .filter(|m| !m.is_empty())
    }
}
