//! Generation Client: hosted text generation, prompt in, raw text out.
//!
//! Two providers: Gemini `generateContent` (the default) and any OpenAI-compatible
//! chat-completions endpoint such as OpenRouter. Output is returned untouched; cleaning and
//! decoding belong to the agent.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{ConfigError, GenerationConfig, GenerationProvider};

pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const GEMINI_DEFAULT_MODEL: &str = "gemini-1.5-pro";
pub const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const OPENROUTER_DEFAULT_MODEL: &str = "meta-llama/llama-3.3-70b-instruct";

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("generation request: {0}")]
    Request(#[from] reqwest::Error),
    #[error("generation service {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("generation response parse: {0}")]
    Decode(String),
    #[error("generation service returned no text")]
    Empty,
}

#[async_trait::async_trait]
pub trait GenerationClient: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Build the configured provider. Fails when no API key is configured or the HTTP client
/// cannot be built.
pub fn client_from_config(
    config: &GenerationConfig,
    timeout: Option<Duration>,
) -> Result<Arc<dyn GenerationClient>, ConfigError> {
    let api_key = config.api_key()?.to_string();
    let client = crate::http::client(timeout)?;
    let client: Arc<dyn GenerationClient> = match config.provider {
        GenerationProvider::Gemini => Arc::new(GeminiClient {
            api_key,
            model: config
                .model
                .clone()
                .unwrap_or_else(|| GEMINI_DEFAULT_MODEL.to_string()),
            base_url: config
                .url
                .clone()
                .unwrap_or_else(|| GEMINI_API_BASE.to_string()),
            client,
        }),
        GenerationProvider::OpenRouter => Arc::new(OpenRouterClient {
            api_key,
            model: config
                .model
                .clone()
                .unwrap_or_else(|| OPENROUTER_DEFAULT_MODEL.to_string()),
            url: config.url.clone().unwrap_or_else(|| OPENROUTER_URL.to_string()),
            client,
        }),
    };
    tracing::info!(provider = ?config.provider, "[agent] generation client ready");
    Ok(client)
}

// ---------------------------------------------------------------------------
// Gemini
// ---------------------------------------------------------------------------

pub struct GeminiClient {
    api_key: String,
    model: String,
    base_url: String,
    client: Client,
}

#[derive(Serialize)]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    role: &'static str,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

impl GeminiClient {
    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

/// Concatenate the text parts of the first candidate.
fn gemini_text(body: &Value) -> Option<String> {
    let parts = body
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[async_trait::async_trait]
impl GenerationClient for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let body = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user",
                parts: vec![GeminiPart { text: prompt }],
            }],
        };
        let res = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = res.status();
        let text = res.text().await?;
        if !status.is_success() {
            return Err(GenerationError::Upstream {
                status: status.as_u16(),
                body: text,
            });
        }
        let parsed: Value =
            serde_json::from_str(&text).map_err(|e| GenerationError::Decode(e.to_string()))?;
        gemini_text(&parsed).ok_or(GenerationError::Empty)
    }
}

// ---------------------------------------------------------------------------
// OpenRouter (OpenAI-compatible chat completions)
// ---------------------------------------------------------------------------

pub struct OpenRouterClient {
    api_key: String,
    model: String,
    url: String,
    client: Client,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Option<Vec<ChatChoice>>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatReply>,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

#[async_trait::async_trait]
impl GenerationClient for OpenRouterClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: Some(0.0),
        };
        let res = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .header("X-Title", "leadrelay-agent")
            .json(&body)
            .send()
            .await?;

        let status = res.status();
        let text = res.text().await?;
        if !status.is_success() {
            return Err(GenerationError::Upstream {
                status: status.as_u16(),
                body: text,
            });
        }
        let parsed: ChatResponse =
            serde_json::from_str(&text).map_err(|e| GenerationError::Decode(e.to_string()))?;
        parsed
            .choices
            .and_then(|c| c.into_iter().next())
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(GenerationError::Empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn gemini_text_joins_parts() {
        let body = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "```json\n{" }, { "text": "}\n```" }] }
            }]
        });
        assert_eq!(gemini_text(&body).as_deref(), Some("```json\n{}\n```"));
    }

    #[test]
    fn gemini_text_missing_candidates() {
        assert_eq!(gemini_text(&json!({ "candidates": [] })), None);
        assert_eq!(gemini_text(&json!({ "promptFeedback": {} })), None);
    }

    #[test]
    fn gemini_endpoint_format() {
        let client = GeminiClient {
            api_key: "k".into(),
            model: "gemini-1.5-pro".into(),
            base_url: "https://example.test/v1beta/".into(),
            client: Client::new(),
        };
        assert_eq!(
            client.endpoint(),
            "https://example.test/v1beta/models/gemini-1.5-pro:generateContent"
        );
    }

    #[test]
    fn missing_key_is_a_config_error() {
        let config = GenerationConfig {
            provider: GenerationProvider::OpenRouter,
            api_key: None,
            url: None,
            model: None,
        };
        assert!(client_from_config(&config, None).is_err());
    }
}
