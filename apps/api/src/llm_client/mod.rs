//! LLM clients: the single point of entry for all provider calls.
//!
//! ARCHITECTURAL RULE: no other module may talk to a provider API directly.
//! The retry/fallback engine drives these clients through the [`ModelInvoker`]
//! trait, so the error taxonomy here must stay intact end to end: the engine
//! decides what is retryable based on the exact variant it receives.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

pub mod prompts;

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("rate limited (status {status}): {message}")]
    RateLimited { status: u16, message: String },

    #[error("permission or region error (status {status}): {message}")]
    Permission { status: u16, message: String },

    #[error("provider error (status {status}): {message}")]
    Api { status: u16, message: String },
}

/// Maps an HTTP error status onto the closed error taxonomy.
///
/// 429 is rate limiting; 401/403 cover bad credentials and unsupported
/// regions; everything else is a generic provider error the caller may retry.
fn classify_status(status: u16, message: String) -> LlmError {
    match status {
        429 => LlmError::RateLimited { status, message },
        401 | 403 => LlmError::Permission { status, message },
        _ => LlmError::Api { status, message },
    }
}

/// Pulls a human-readable message out of a provider error body, falling back
/// to the raw body when it is not the usual `{"error": {"message": ...}}`.
fn error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorEnvelope {
        error: ErrorBody,
    }
    #[derive(Deserialize)]
    struct ErrorBody {
        message: String,
    }
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string())
}

/// Provider-agnostic invocation seam. One call, one model, raw text back.
///
/// Implementations must surface provider errors through [`LlmError`] unchanged
/// so the engine can tell rate limiting from permission failures. An empty
/// string is a valid (soft-failure) result, not an error.
#[async_trait]
pub trait ModelInvoker: Send + Sync {
    async fn invoke(&self, prompt: &str, model: &str) -> Result<String, LlmError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Response-shape adapters
// ────────────────────────────────────────────────────────────────────────────

type ShapeAdapter = fn(&Value) -> Option<String>;

/// Known OpenAI-style response shapes, probed in order. The first adapter
/// whose required fields are present wins; when none match, the response is
/// treated as empty text and the engine handles it as a soft failure.
const OPENAI_SHAPES: &[(&str, ShapeAdapter)] = &[
    ("chat", chat_shape),
    ("completion", completion_shape),
    ("plain", plain_shape),
];

fn chat_shape(body: &Value) -> Option<String> {
    body.get("choices")?
        .get(0)?
        .get("message")?
        .get("content")?
        .as_str()
        .map(str::to_string)
}

fn completion_shape(body: &Value) -> Option<String> {
    body.get("choices")?
        .get(0)?
        .get("text")?
        .as_str()
        .map(str::to_string)
}

fn plain_shape(body: &Value) -> Option<String> {
    body.get("text")?.as_str().map(str::to_string)
}

pub(crate) fn extract_openai_text(body: &Value) -> String {
    for (name, adapter) in OPENAI_SHAPES {
        if let Some(text) = adapter(body) {
            debug!(shape = name, "matched response shape");
            return text;
        }
    }
    String::new()
}

// ────────────────────────────────────────────────────────────────────────────
// OpenAI client (primary provider)
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    max_tokens: u32,
    temperature: f32,
}

impl OpenAiClient {
    pub fn new(api_key: String, timeout_secs: u64, max_tokens: u32, temperature: f32) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(timeout_secs))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
            max_tokens,
            temperature,
        }
    }
}

#[async_trait]
impl ModelInvoker for OpenAiClient {
    async fn invoke(&self, prompt: &str, model: &str) -> Result<String, LlmError> {
        let request_body = ChatRequest {
            model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(OPENAI_API_URL)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        // Read raw bytes and decode lossily: a provider emitting invalid
        // UTF-8 must not take down the pipeline.
        let bytes = response.bytes().await?;
        let body_text = String::from_utf8_lossy(&bytes).into_owned();

        if !status.is_success() {
            return Err(classify_status(status.as_u16(), error_message(&body_text)));
        }

        let body: Value = match serde_json::from_str(&body_text) {
            Ok(v) => v,
            // Undecodable success body: soft failure, the engine retries.
            Err(_) => return Ok(String::new()),
        };

        Ok(extract_openai_text(&body))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Gemini client (secondary provider)
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
}

impl GeminiClient {
    pub fn new(api_key: String, timeout_secs: u64) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(timeout_secs))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
        }
    }
}

fn gemini_shape(body: &Value) -> Option<String> {
    body.get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .get(0)?
        .get("text")?
        .as_str()
        .map(str::to_string)
}

#[async_trait]
impl ModelInvoker for GeminiClient {
    async fn invoke(&self, prompt: &str, model: &str) -> Result<String, LlmError> {
        let url = format!(
            "{GEMINI_API_BASE}/{model}:generateContent?key={}",
            self.api_key
        );
        let request_body = serde_json::json!({
            "contents": [{"parts": [{"text": prompt}]}]
        });

        let response = self.client.post(&url).json(&request_body).send().await?;

        let status = response.status();
        let bytes = response.bytes().await?;
        let body_text = String::from_utf8_lossy(&bytes).into_owned();

        if !status.is_success() {
            return Err(classify_status(status.as_u16(), error_message(&body_text)));
        }

        let body: Value = match serde_json::from_str(&body_text) {
            Ok(v) => v,
            Err(_) => return Ok(String::new()),
        };

        // A safety-blocked response carries no candidate text; report empty.
        Ok(gemini_shape(&body).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chat_shape_is_preferred() {
        let body = json!({
            "choices": [{"message": {"content": "from chat"}, "text": "from legacy"}]
        });
        assert_eq!(extract_openai_text(&body), "from chat");
    }

    #[test]
    fn test_legacy_completion_shape() {
        let body = json!({"choices": [{"text": "legacy text"}]});
        assert_eq!(extract_openai_text(&body), "legacy text");
    }

    #[test]
    fn test_plain_text_shape() {
        let body = json!({"text": "plain"});
        assert_eq!(extract_openai_text(&body), "plain");
    }

    #[test]
    fn test_unknown_shape_yields_empty_text() {
        assert_eq!(extract_openai_text(&json!({})), "");
        assert_eq!(extract_openai_text(&json!({"choices": []})), "");
        assert_eq!(
            extract_openai_text(&json!({"choices": [{"message": {}}]})),
            ""
        );
    }

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            classify_status(429, "slow down".into()),
            LlmError::RateLimited { .. }
        ));
        assert!(matches!(
            classify_status(401, "bad key".into()),
            LlmError::Permission { .. }
        ));
        assert!(matches!(
            classify_status(403, "unsupported region".into()),
            LlmError::Permission { .. }
        ));
        assert!(matches!(
            classify_status(500, "boom".into()),
            LlmError::Api { status: 500, .. }
        ));
    }

    #[test]
    fn test_error_message_unwraps_envelope() {
        let body = r#"{"error": {"message": "model overloaded"}}"#;
        assert_eq!(error_message(body), "model overloaded");
        assert_eq!(error_message("not json"), "not json");
    }

    #[test]
    fn test_gemini_shape() {
        let body = json!({
            "candidates": [{"content": {"parts": [{"text": "gemini says"}]}}]
        });
        assert_eq!(gemini_shape(&body), Some("gemini says".to_string()));

        let blocked = json!({"promptFeedback": {"blockReason": "SAFETY"}});
        assert_eq!(gemini_shape(&blocked), None);
    }
}
