use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Only DATABASE_URL is required; every model/provider knob has a default so
/// the service can boot in stub mode with nothing but a database.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_fallback_model: String,
    pub openai_max_tokens: u32,
    pub openai_temperature: f32,
    pub google_api_key: Option<String>,
    pub gemini_model: String,
    pub llm_max_attempts: u32,
    pub llm_backoff_base_ms: u64,
    pub llm_request_timeout_secs: u64,
    pub llm_use_stub: bool,
    pub template_path: Option<String>,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            openai_api_key: optional_env("OPENAI_API_KEY"),
            openai_model: std::env::var("OPENAI_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            openai_fallback_model: std::env::var("OPENAI_FALLBACK_MODEL")
                .unwrap_or_else(|_| "gpt-3.5-turbo".to_string()),
            openai_max_tokens: parse_env("OPENAI_MAX_TOKENS", 1024)?,
            openai_temperature: parse_env("OPENAI_TEMPERATURE", 0.3)?,
            google_api_key: optional_env("GOOGLE_API_KEY"),
            gemini_model: std::env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| "gemini-1.5-flash".to_string()),
            llm_max_attempts: parse_env("LLM_MAX_ATTEMPTS", 3)?,
            llm_backoff_base_ms: parse_env("LLM_BACKOFF_BASE_MS", 1000)?,
            llm_request_timeout_secs: parse_env("LLM_REQUEST_TIMEOUT_SECS", 30)?,
            llm_use_stub: std::env::var("LLM_USE_STUB")
                .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            template_path: optional_env("TEMPLATE_PATH"),
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Unset or empty variables both read as absent.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value")),
        Err(_) => Ok(default),
    }
}
