//! Retry/fallback engine driving the LLM clients.
//!
//! Layered recovery per call: prompt cache → primary model attempts with
//! exponential backoff and jitter → a single fallback-model call on rate
//! limiting → the secondary provider → deterministic fallback content. No
//! terminal state raises; the caller always gets text plus the identifier of
//! whatever actually produced it.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

use crate::generation::cache::PromptCache;
use crate::llm_client::prompts::{build_sections_prompt, build_suggestions_prompt};
use crate::llm_client::{LlmError, ModelInvoker};
use crate::models::proposal::{ProposalInput, Tone};

/// Model identifier reported when stub mode bypassed the network.
pub const STUB_MODEL: &str = "stub";
/// Model identifier reported when every provider path failed.
pub const FALLBACK_MODEL: &str = "deterministic-fallback";

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub model: String,
    pub fallback_model: String,
    pub secondary_model: String,
    pub max_attempts: u32,
    pub backoff_base: Duration,
    pub use_stub: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            fallback_model: "gpt-3.5-turbo".to_string(),
            secondary_model: "gemini-1.5-flash".to_string(),
            max_attempts: 3,
            backoff_base: Duration::from_millis(1000),
            use_stub: false,
        }
    }
}

/// Text plus the identifier of the model (or fallback path) that produced it.
#[derive(Debug, Clone)]
pub struct GeneratedText {
    pub text: String,
    pub model: String,
}

pub struct TextEngine {
    primary: Arc<dyn ModelInvoker>,
    secondary: Option<Arc<dyn ModelInvoker>>,
    settings: EngineSettings,
    cache: PromptCache,
}

impl TextEngine {
    pub fn new(
        primary: Arc<dyn ModelInvoker>,
        secondary: Option<Arc<dyn ModelInvoker>>,
        settings: EngineSettings,
        cache_capacity: usize,
    ) -> Self {
        Self {
            primary,
            secondary,
            settings,
            cache: PromptCache::new(cache_capacity),
        }
    }

    /// Generates raw sections text for a proposal brief. Never fails: the
    /// terminal degraded state is a deterministic JSON payload.
    pub async fn generate_text(&self, brief: &ProposalInput, tone: Tone) -> GeneratedText {
        if self.settings.use_stub {
            return GeneratedText {
                text: stub_sections_payload(&brief.client_company_name),
                model: STUB_MODEL.to_string(),
            };
        }
        let prompt = build_sections_prompt(brief, tone);
        match self.run(&prompt, tone.as_str()).await {
            Some(generated) => generated,
            None => GeneratedText {
                text: stub_sections_payload(&brief.client_company_name),
                model: FALLBACK_MODEL.to_string(),
            },
        }
    }

    /// Generates raw suggestions text. `None` means every provider path
    /// failed (or stub mode is on) and the caller should use its own
    /// deterministic defaults.
    pub async fn generate_suggestions_text(&self, brief: &ProposalInput) -> Option<GeneratedText> {
        if self.settings.use_stub {
            return None;
        }
        let prompt = build_suggestions_prompt(brief);
        self.run(&prompt, brief.tone.as_str()).await
    }

    /// The recovery state machine. Returns `None` only after the cache, the
    /// attempt loop, the rate-limit fallback model, and the secondary
    /// provider have all failed to produce non-empty text.
    async fn run(&self, prompt: &str, tone_label: &str) -> Option<GeneratedText> {
        let key = PromptCache::key(prompt, tone_label, &self.settings.model);
        if let Some(text) = self.cache.get(key) {
            debug!("prompt cache hit");
            return Some(GeneratedText {
                text,
                model: self.settings.model.clone(),
            });
        }

        let max_attempts = self.settings.max_attempts.max(1);
        'attempts: for attempt in 1..=max_attempts {
            if attempt > 1 {
                let backoff = self.settings.backoff_base * 2u32.pow(attempt - 2);
                let jitter = backoff.mul_f64(rand::thread_rng().gen_range(0.0..0.5));
                debug!(attempt, backoff_ms = backoff.as_millis() as u64, "backing off");
                tokio::time::sleep(backoff + jitter).await;
            }

            match self.primary.invoke(prompt, &self.settings.model).await {
                Ok(text) if !text.trim().is_empty() => {
                    self.cache.put(key, text.clone());
                    return Some(GeneratedText {
                        text,
                        model: self.settings.model.clone(),
                    });
                }
                Ok(_) => {
                    warn!(attempt, model = %self.settings.model, "model returned empty text");
                }
                Err(LlmError::RateLimited { status, message }) => {
                    // Retrying the same model against a rate limit wastes
                    // quota; try the cheaper model exactly once, then stop.
                    warn!(status, %message, "rate limited; trying fallback model once");
                    match self
                        .primary
                        .invoke(prompt, &self.settings.fallback_model)
                        .await
                    {
                        Ok(text) if !text.trim().is_empty() => {
                            return Some(GeneratedText {
                                text,
                                model: self.settings.fallback_model.clone(),
                            });
                        }
                        Ok(_) => warn!("fallback model returned empty text"),
                        Err(e) => warn!("fallback model failed: {e}"),
                    }
                    break 'attempts;
                }
                Err(LlmError::Permission { status, message }) => {
                    warn!(status, %message, "permission/region error; abandoning attempts");
                    break 'attempts;
                }
                Err(e) => {
                    warn!(attempt, "provider error: {e}");
                }
            }
        }

        if let Some(secondary) = &self.secondary {
            match secondary.invoke(prompt, &self.settings.secondary_model).await {
                Ok(text) if !text.trim().is_empty() => {
                    return Some(GeneratedText {
                        text,
                        model: self.settings.secondary_model.clone(),
                    });
                }
                Ok(_) => warn!("secondary provider returned empty text"),
                Err(e) => warn!("secondary provider failed: {e}"),
            }
        }

        None
    }
}

/// Deterministic sections payload used for stub mode and total outage.
/// Kept as JSON text so it flows through the same parse path as live output.
pub fn stub_sections_payload(client_name: &str) -> String {
    let client = if client_name.trim().is_empty() {
        "the client"
    } else {
        client_name
    };
    serde_json::json!({
        "executive_summary_text": format!(
            "Fallback executive summary for {client}: this proposal outlines a pragmatic plan \
             to deliver the requested scope with clear milestones and transparent costs."
        ),
        "project_mission_text": "Project mission: deliver measurable value and reliable software.",
        "solution_concept_text": "Proposed solution: modular services and integration layers tailored to the client's environment.",
        "project_methodology_text": "We will follow an Agile approach with two-week sprints and continuous demos.",
        "financial_justification_text": "Investment is justified by projected revenue uplift and operational savings.",
        "payment_terms_text": "Standard payment: 50% upfront, 50% upon final delivery.",
        "development_note": "Development estimate includes senior and mid-level engineering resources.",
        "licenses_note": "Licenses include required 3rd-party SaaS and hosting costs.",
        "support_note": "Includes 3 months of post-launch support.",
        "components": [],
        "milestones": []
    })
    .to_string()
}
