// Anthropic messages format

use serde::{Deserialize, Serialize};

pub const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicMessage {
    pub role: String,
    pub content: String,
}

/// Single user message; the system text is embedded inline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicMessagesRequest {
    pub model: String,
    pub max_tokens: u32,
    pub messages: Vec<AnthropicMessage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnthropicMessagesResponse {
    #[serde(default)]
    pub content: Vec<ContentBlock>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentBlock {
    #[serde(default, rename = "type")]
    pub block_type: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

impl AnthropicMessagesResponse {
    /// `content[0].text`
    pub fn text(&self) -> Option<&str> {
        self.content.first().and_then(|b| b.text.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_text() {
        let resp: AnthropicMessagesResponse = serde_json::from_value(json!({
            "id": "msg_1",
            "type": "message",
            "content": [{"type": "text", "text": "Structured prompt"}],
            "stop_reason": "end_turn"
        }))
        .unwrap();
        assert_eq!(resp.text(), Some("Structured prompt"));

        let resp: AnthropicMessagesResponse = serde_json::from_value(json!({"content": []})).unwrap();
        assert_eq!(resp.text(), None);
    }
}
