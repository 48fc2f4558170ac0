//! Deliverable/phase suggestions: a lighter sibling of the sections
//! pipeline. The model proposes a delivery plan for the brief; deterministic
//! defaults cover every failure mode.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::generation::engine::TextEngine;
use crate::generation::extract::extract_json_blob;
use crate::models::proposal::ProposalInput;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestedDeliverable {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestedPhase {
    pub phase_name: String,
    #[serde(default)]
    pub duration_weeks: u32,
    #[serde(default)]
    pub tasks: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Suggestions {
    #[serde(default)]
    pub suggested_deliverables: Vec<SuggestedDeliverable>,
    #[serde(default)]
    pub suggested_phases: Vec<SuggestedPhase>,
}

impl Suggestions {
    fn is_empty(&self) -> bool {
        self.suggested_deliverables.is_empty() && self.suggested_phases.is_empty()
    }
}

/// Generates suggestions for a brief. Never fails; an unusable model response
/// degrades to the deterministic default plan.
pub async fn generate_suggestions(engine: &TextEngine, brief: &ProposalInput) -> Suggestions {
    if let Some(generated) = engine.generate_suggestions_text(brief).await {
        if let Some(parsed) = parse_suggestions(&generated.text) {
            if !parsed.is_empty() {
                return parsed;
            }
        }
        warn!("suggestions output was not usable JSON; using defaults");
    }
    default_suggestions(brief)
}

fn parse_suggestions(raw: &str) -> Option<Suggestions> {
    if let Some(blob) = extract_json_blob(raw) {
        if let Ok(parsed) = serde_json::from_str::<Suggestions>(blob) {
            return Some(parsed);
        }
    }
    serde_json::from_str::<Suggestions>(raw.trim()).ok()
}

/// The default delivery plan, lightly adapted to the brief.
pub fn default_suggestions(brief: &ProposalInput) -> Suggestions {
    let stack = if brief.technologies.is_empty() {
        "the agreed technology stack".to_string()
    } else {
        brief.technologies.join(", ")
    };

    Suggestions {
        suggested_deliverables: vec![
            SuggestedDeliverable {
                title: "Requirements & Analysis".to_string(),
                description: "Detailed requirements document and target architecture.".to_string(),
            },
            SuggestedDeliverable {
                title: "Implementation".to_string(),
                description: format!("Working software built on {stack}."),
            },
            SuggestedDeliverable {
                title: "Testing & Handover".to_string(),
                description: "Test reports, deployment runbook, and knowledge transfer.".to_string(),
            },
        ],
        suggested_phases: vec![
            SuggestedPhase {
                phase_name: "Discovery".to_string(),
                duration_weeks: 2,
                tasks: "Stakeholder interviews, requirements capture, backlog grooming.".to_string(),
            },
            SuggestedPhase {
                phase_name: "Delivery".to_string(),
                duration_weeks: 8,
                tasks: "Iterative implementation in two-week sprints with demos.".to_string(),
            },
            SuggestedPhase {
                phase_name: "Stabilization".to_string(),
                duration_weeks: 2,
                tasks: "Hardening, performance passes, acceptance testing, handover.".to_string(),
            },
        ],
    }
}
