//! Proposal input model: the caller-supplied brief that drives generation.
//!
//! Validation mirrors the API contract: names are required, free-text fields
//! are length-capped, `technologies` accepts either a list or a comma string,
//! and `tone` normalizes case-insensitively to a closed enumeration.

use chrono::NaiveDate;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

/// Desired writing tone for the generated sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Tone {
    #[default]
    Formal,
    Marketing,
    Technical,
    Friendly,
}

impl Tone {
    /// Case-insensitive parse accepting a few common synonyms.
    pub fn parse(raw: &str) -> Option<Tone> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "formal" | "professional" | "neutral" => Some(Tone::Formal),
            "marketing" | "persuasive" => Some(Tone::Marketing),
            "technical" => Some(Tone::Technical),
            "friendly" | "casual" | "conversational" => Some(Tone::Friendly),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Formal => "Formal",
            Tone::Marketing => "Marketing",
            Tone::Technical => "Technical",
            Tone::Friendly => "Friendly",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Deliverable {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub acceptance_criteria: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Phase {
    pub duration_weeks: u32,
    pub tasks: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Financials {
    pub development_cost: Option<f64>,
    pub licenses_cost: Option<f64>,
    pub support_cost: Option<f64>,
}

/// The proposal brief. Immutable once handed to the pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProposalInput {
    #[serde(default)]
    pub proposal_title: String,
    #[serde(default)]
    pub proposal_date: Option<NaiveDate>,
    #[serde(default)]
    pub valid_until_date: Option<NaiveDate>,

    pub client_company_name: String,
    pub provider_company_name: String,
    #[serde(default)]
    pub project_goal: String,
    #[serde(default)]
    pub scope: String,
    #[serde(default, deserialize_with = "deserialize_technologies")]
    pub technologies: Vec<String>,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,

    #[serde(default, deserialize_with = "deserialize_tone")]
    pub tone: Tone,

    #[serde(default)]
    pub deliverables: Vec<Deliverable>,
    #[serde(default)]
    pub phases: Vec<Phase>,
    #[serde(default)]
    pub financials: Option<Financials>,

    #[serde(default)]
    pub client_signature_name: String,
    #[serde(default)]
    pub client_signature_date: Option<NaiveDate>,
    #[serde(default)]
    pub provider_signature_name: String,
    #[serde(default)]
    pub provider_signature_date: Option<NaiveDate>,
}

impl ProposalInput {
    /// Field-level validation applied after deserialization.
    pub fn validate(&self) -> Result<(), String> {
        check_len("client_company_name", &self.client_company_name, 2, 200)?;
        check_len("provider_company_name", &self.provider_company_name, 2, 200)?;
        if self.project_goal.len() > 1500 {
            return Err("project_goal must be at most 1500 characters".into());
        }
        if self.scope.len() > 4000 {
            return Err("scope must be at most 4000 characters".into());
        }
        for d in &self.deliverables {
            check_len("deliverable title", &d.title, 3, 200)?;
            check_len("deliverable description", &d.description, 10, 2000)?;
        }
        for p in &self.phases {
            if !(1..=52).contains(&p.duration_weeks) {
                return Err("phase duration_weeks must be between 1 and 52".into());
            }
            check_len("phase tasks", &p.tasks, 3, 3000)?;
        }
        if let Some(fin) = &self.financials {
            for (name, cost) in [
                ("development_cost", fin.development_cost),
                ("licenses_cost", fin.licenses_cost),
                ("support_cost", fin.support_cost),
            ] {
                if cost.is_some_and(|c| c < 0.0) {
                    return Err(format!("{name} must be non-negative"));
                }
            }
        }
        Ok(())
    }
}

fn check_len(field: &str, value: &str, min: usize, max: usize) -> Result<(), String> {
    let len = value.trim().chars().count();
    if len < min || len > max {
        return Err(format!(
            "{field} must be between {min} and {max} characters (got {len})"
        ));
    }
    Ok(())
}

fn deserialize_tone<'de, D>(deserializer: D) -> Result<Tone, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw {
        None => Ok(Tone::default()),
        Some(s) if s.trim().is_empty() => Ok(Tone::default()),
        Some(s) => Tone::parse(&s).ok_or_else(|| {
            de::Error::custom(format!(
                "tone must be one of Formal|Marketing|Technical|Friendly (got {s:?})"
            ))
        }),
    }
}

/// Accepts a JSON list of strings or a comma-separated string.
fn deserialize_technologies<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        List(Vec<String>),
        Text(String),
    }

    let raw = Option::<Raw>::deserialize(deserializer)?;
    let items = match raw {
        None => Vec::new(),
        Some(Raw::List(list)) => list,
        Some(Raw::Text(text)) => text.split(',').map(str::to_string).collect(),
    };
    Ok(items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn minimal_payload() -> serde_json::Value {
        json!({
            "client_company_name": "ClientCo",
            "provider_company_name": "ProvCo"
        })
    }

    #[test]
    fn test_minimal_payload_deserializes_with_defaults() {
        let brief: ProposalInput = serde_json::from_value(minimal_payload()).unwrap();
        assert_eq!(brief.tone, Tone::Formal);
        assert!(brief.technologies.is_empty());
        assert!(brief.deadline.is_none());
        assert!(brief.validate().is_ok());
    }

    #[test]
    fn test_tone_parse_is_case_insensitive_with_synonyms() {
        assert_eq!(Tone::parse("MARKETING"), Some(Tone::Marketing));
        assert_eq!(Tone::parse("  technical "), Some(Tone::Technical));
        assert_eq!(Tone::parse("casual"), Some(Tone::Friendly));
        assert_eq!(Tone::parse("professional"), Some(Tone::Formal));
        assert_eq!(Tone::parse("sarcastic"), None);
    }

    #[test]
    fn test_unknown_tone_is_rejected_at_deserialization() {
        let mut payload = minimal_payload();
        payload["tone"] = json!("sarcastic");
        assert!(serde_json::from_value::<ProposalInput>(payload).is_err());
    }

    #[test]
    fn test_empty_tone_defaults_to_formal() {
        let mut payload = minimal_payload();
        payload["tone"] = json!("  ");
        let brief: ProposalInput = serde_json::from_value(payload).unwrap();
        assert_eq!(brief.tone, Tone::Formal);
    }

    #[test]
    fn test_technologies_accepts_list_and_comma_string() {
        let mut payload = minimal_payload();
        payload["technologies"] = json!(["Rust", " Postgres ", ""]);
        let brief: ProposalInput = serde_json::from_value(payload.clone()).unwrap();
        assert_eq!(brief.technologies, vec!["Rust", "Postgres"]);

        payload["technologies"] = json!("Rust, Postgres,, Docker ");
        let brief: ProposalInput = serde_json::from_value(payload).unwrap();
        assert_eq!(brief.technologies, vec!["Rust", "Postgres", "Docker"]);
    }

    #[test]
    fn test_validation_rejects_short_client_name() {
        let brief = ProposalInput {
            client_company_name: "C".into(),
            provider_company_name: "ProvCo".into(),
            ..Default::default()
        };
        assert!(brief.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_out_of_range_phase() {
        let brief = ProposalInput {
            client_company_name: "ClientCo".into(),
            provider_company_name: "ProvCo".into(),
            phases: vec![Phase {
                duration_weeks: 0,
                tasks: "Kickoff and discovery".into(),
            }],
            ..Default::default()
        };
        assert!(brief.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_negative_cost() {
        let brief = ProposalInput {
            client_company_name: "ClientCo".into(),
            provider_company_name: "ProvCo".into(),
            financials: Some(Financials {
                development_cost: Some(-1.0),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(brief.validate().is_err());
    }
}
