//! Section generation: composes the engine, the extractor, and the
//! normalizer into one call that always returns a complete sections mapping.

use serde_json::{Map, Value};
use tracing::warn;

use crate::generation::engine::TextEngine;
use crate::generation::extract::extract_json_blob;
use crate::generation::normalize::normalize_sections;
use crate::models::proposal::{ProposalInput, Tone};

/// The fixed section fields every proposal document expects.
pub const EXPECTED_KEYS: [&str; 9] = [
    "executive_summary_text",
    "project_mission_text",
    "solution_concept_text",
    "project_methodology_text",
    "financial_justification_text",
    "payment_terms_text",
    "development_note",
    "licenses_note",
    "support_note",
];

/// Unparsable raw text shorter than this is discarded; anything longer is
/// kept as the executive summary so useful prose is not thrown away.
const RAW_TEXT_MIN_LEN: usize = 50;
/// Cap on how much raw prose is carried into the executive summary.
const RAW_TEXT_MAX_LEN: usize = 4000;

/// Generates the sections mapping for a proposal brief.
///
/// Never fails and never returns a partial result: either the model's JSON is
/// recovered, parsed, and normalized, or a deterministic fallback mapping is
/// returned. Callers that need to know whether real AI content was used
/// should inspect the returned model identifier.
pub async fn generate_sections(
    engine: &TextEngine,
    brief: &ProposalInput,
    tone: Tone,
) -> (Map<String, Value>, String) {
    let generated = engine.generate_text(brief, tone).await;

    if let Some(parsed) = parse_sections(&generated.text) {
        // Returned as-is after normalization: fields the model omitted are
        // NOT backfilled from defaults (the renderer resolves missing
        // placeholders to empty strings).
        return (normalize_sections(parsed), generated.model);
    }

    warn!("model output was not parsable JSON; using deterministic sections");
    let mut sections = fallback_sections(&brief.client_company_name);
    let trimmed = generated.text.trim();
    if trimmed.chars().count() > RAW_TEXT_MIN_LEN {
        // The model produced real prose, just not JSON. Keep it.
        let capped: String = trimmed.chars().take(RAW_TEXT_MAX_LEN).collect();
        sections.insert("executive_summary_text".to_string(), Value::String(capped));
    }
    (sections, generated.model)
}

/// Two-stage parse: extract the first balanced JSON span, then fall back to a
/// direct parse of the whole trimmed text when it is already a bare object.
/// Arrays are rejected at this stage; the contract requires a keyed mapping.
fn parse_sections(raw: &str) -> Option<Map<String, Value>> {
    if let Some(blob) = extract_json_blob(raw) {
        if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(blob) {
            return Some(map);
        }
    }

    let trimmed = raw.trim();
    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(trimmed) {
            return Some(map);
        }
    }

    None
}

/// Deterministic, complete sections mapping personalized with the client
/// name. Used when nothing parsable came back from any provider.
pub fn fallback_sections(client_name: &str) -> Map<String, Value> {
    let client = if client_name.trim().is_empty() {
        "the client"
    } else {
        client_name
    };

    let mut sections = Map::new();
    let texts: [(&str, String); 9] = [
        (
            "executive_summary_text",
            format!("This proposal for {client} outlines a plan to deliver the project goals within the agreed scope."),
        ),
        (
            "project_mission_text",
            "Project mission: deliver measurable value and reliable software.".to_string(),
        ),
        (
            "solution_concept_text",
            "Proposed solution: modular services and integration layers tailored to the client's environment.".to_string(),
        ),
        (
            "project_methodology_text",
            "We will follow an Agile approach with two-week sprints and continuous demos.".to_string(),
        ),
        (
            "financial_justification_text",
            "Investment is justified by projected revenue uplift and operational savings.".to_string(),
        ),
        (
            "payment_terms_text",
            "Standard payment: 50% upfront, 50% upon final delivery.".to_string(),
        ),
        (
            "development_note",
            "Development estimate includes senior and mid-level engineering resources.".to_string(),
        ),
        (
            "licenses_note",
            "Licenses include required 3rd-party SaaS and hosting costs.".to_string(),
        ),
        (
            "support_note",
            "Includes 3 months of post-launch support.".to_string(),
        ),
    ];
    for (key, text) in texts {
        sections.insert(key.to_string(), Value::String(text));
    }
    sections.insert("components".to_string(), Value::Array(Vec::new()));
    sections.insert("milestones".to_string(), Value::Array(Vec::new()));
    sections
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::engine::{EngineSettings, FALLBACK_MODEL};
    use crate::llm_client::{LlmError, ModelInvoker};
    use async_trait::async_trait;
    use std::sync::Arc;

    /// Invoker that always returns the same text.
    struct FixedInvoker(String);

    #[async_trait]
    impl ModelInvoker for FixedInvoker {
        async fn invoke(&self, _prompt: &str, _model: &str) -> Result<String, LlmError> {
            Ok(self.0.clone())
        }
    }

    /// Invoker that always fails with a permission error (cheapest total-failure path).
    struct FailingInvoker;

    #[async_trait]
    impl ModelInvoker for FailingInvoker {
        async fn invoke(&self, _prompt: &str, _model: &str) -> Result<String, LlmError> {
            Err(LlmError::Permission {
                status: 403,
                message: "no".into(),
            })
        }
    }

    fn engine_returning(text: &str) -> TextEngine {
        TextEngine::new(
            Arc::new(FixedInvoker(text.to_string())),
            None,
            EngineSettings::default(),
            8,
        )
    }

    fn sample_brief() -> ProposalInput {
        ProposalInput {
            client_company_name: "ClientCo".into(),
            provider_company_name: "ProvCo".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_fenced_json_is_recovered() {
        let engine = engine_returning("Sure! ```json\n{\"executive_summary_text\":\"X\"}\n```");
        let (sections, model) = generate_sections(&engine, &sample_brief(), Tone::Formal).await;
        assert_eq!(sections["executive_summary_text"], "X");
        assert_eq!(model, "gpt-4o-mini");
    }

    #[tokio::test]
    async fn test_bare_object_parses_directly() {
        let engine = engine_returning(r#"{"payment_terms_text": "Net 30"}"#);
        let (sections, _) = generate_sections(&engine, &sample_brief(), Tone::Formal).await;
        assert_eq!(sections["payment_terms_text"], "Net 30");
        // no backfill of missing fields
        assert!(!sections.contains_key("executive_summary_text"));
    }

    #[tokio::test]
    async fn test_array_output_is_rejected() {
        let engine = engine_returning(r#"[{"executive_summary_text": "X"}]"#);
        let (sections, _) = generate_sections(&engine, &sample_brief(), Tone::Formal).await;
        // falls back to the deterministic mapping, not the array contents
        assert!(sections["executive_summary_text"]
            .as_str()
            .unwrap()
            .contains("ClientCo"));
    }

    #[tokio::test]
    async fn test_long_unparsable_text_becomes_the_executive_summary() {
        let raw = "  This is eighty characters of perfectly good prose that is simply not JSON at all.  ";
        let engine = engine_returning(raw);
        let (sections, _) = generate_sections(&engine, &sample_brief(), Tone::Formal).await;

        assert_eq!(sections["executive_summary_text"], raw.trim());
        // every other field keeps its deterministic fallback value
        let fallback = fallback_sections("ClientCo");
        for key in EXPECTED_KEYS {
            if key != "executive_summary_text" {
                assert_eq!(sections[key], fallback[key], "field {key} diverged");
            }
        }
    }

    #[tokio::test]
    async fn test_short_unparsable_text_is_discarded() {
        let engine = engine_returning("nope");
        let (sections, _) = generate_sections(&engine, &sample_brief(), Tone::Formal).await;
        assert_eq!(
            sections["executive_summary_text"],
            fallback_sections("ClientCo")["executive_summary_text"]
        );
    }

    #[tokio::test]
    async fn test_total_provider_failure_still_yields_complete_sections() {
        let engine = TextEngine::new(
            Arc::new(FailingInvoker),
            None,
            EngineSettings::default(),
            8,
        );
        let (sections, model) = generate_sections(&engine, &sample_brief(), Tone::Formal).await;

        // the engine's deterministic payload is itself parseable JSON
        assert_eq!(model, FALLBACK_MODEL);
        for key in EXPECTED_KEYS {
            assert!(sections.contains_key(key), "missing {key}");
        }
        assert!(sections["executive_summary_text"]
            .as_str()
            .unwrap()
            .contains("ClientCo"));
    }

    #[tokio::test]
    async fn test_structured_fields_survive_end_to_end() {
        let engine = engine_returning(
            r#"{"executive_summary_text": "S", "components": [{"name": "API"}], "milestones": [{"title": "MVP", "duration_weeks": 4}]}"#,
        );
        let (sections, _) = generate_sections(&engine, &sample_brief(), Tone::Formal).await;
        assert!(sections["components"].is_array());
        assert_eq!(sections["milestones"][0]["title"], "MVP");
    }

    #[test]
    fn test_fallback_sections_handles_empty_client_name() {
        let sections = fallback_sections("   ");
        assert!(sections["executive_summary_text"]
            .as_str()
            .unwrap()
            .contains("the client"));
    }
}
