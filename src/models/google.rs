// Google Generative Language (generateContent) format

use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Serialize)]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct Content {
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Part {
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationConfig {
    #[serde(rename = "maxOutputTokens")]
    pub max_output_tokens: u32,
    pub temperature: f32,
}

impl GenerateContentRequest {
    pub fn single_text(text: String, max_output_tokens: u32, temperature: f32) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part { text }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens,
                temperature,
            },
        }
    }
}

type Extractor = fn(&Value) -> Option<&str>;

fn candidate_parts(v: &Value) -> Option<&str> {
    v.pointer("/candidates/0/content/parts/0/text")?.as_str()
}

fn candidate_content_text(v: &Value) -> Option<&str> {
    v.pointer("/candidates/0/content/text")?.as_str()
}

fn candidate_output(v: &Value) -> Option<&str> {
    v.pointer("/candidates/0/output")?.as_str()
}

fn candidate_text(v: &Value) -> Option<&str> {
    v.pointer("/candidates/0/text")?.as_str()
}

fn top_level_text(v: &Value) -> Option<&str> {
    v.get("text")?.as_str()
}

/// Response shapes seen from the API, tried in order
const EXTRACTORS: &[Extractor] = &[
    candidate_parts,
    candidate_content_text,
    candidate_output,
    candidate_text,
    top_level_text,
];

/// First non-blank text found by the extractors
pub fn extract_text(response: &Value) -> Option<&str> {
    EXTRACTORS
        .iter()
        .filter_map(|extract| extract(response))
        .find(|text| !text.trim().is_empty())
}
