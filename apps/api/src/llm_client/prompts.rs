//! Prompt construction for proposal generation and suggestions.
//!
//! Prompts instruct the model to answer with a single JSON object; everything
//! downstream (extraction, normalization) assumes the model will ignore that
//! instruction some of the time.

use crate::models::proposal::{ProposalInput, Tone};

/// Tone instruction appended to every sections prompt.
pub fn tone_instruction(tone: Tone) -> &'static str {
    match tone {
        Tone::Formal => "Use a formal, professional tone.",
        Tone::Marketing => "Use a persuasive, benefit-focused marketing tone.",
        Tone::Technical => "Use a precise, detailed technical tone.",
        Tone::Friendly => "Use a friendly, conversational tone.",
    }
}

/// Builds the sections-generation prompt from the proposal brief.
pub fn build_sections_prompt(brief: &ProposalInput, tone: Tone) -> String {
    let technologies = brief.technologies.join(", ");
    let deadline = brief
        .deadline
        .map(|d| d.to_string())
        .unwrap_or_default();

    format!(
        r#"You are a professional proposal writer. Given structured input, produce a JSON object only,
with exactly these keys:
- executive_summary_text
- project_mission_text
- solution_concept_text
- project_methodology_text
- financial_justification_text
- payment_terms_text
- development_note
- licenses_note
- support_note
- components (array of {{"name": ..., "description": ...}} objects describing the solution components)
- milestones (array of {{"title": ..., "duration_weeks": ...}} objects describing the delivery timeline)

Input:
- client_name: "{client}"
- provider_name: "{provider}"
- project_goal: "{goal}"
- scope: "{scope}"
- technologies: "{technologies}"
- deadline: "{deadline}"
- tone: "{tone}"

Instruction:
{instruction}
Do NOT include any text outside the JSON object."#,
        client = brief.client_company_name,
        provider = brief.provider_company_name,
        goal = brief.project_goal,
        scope = brief.scope,
        technologies = technologies,
        deadline = deadline,
        tone = tone.as_str(),
        instruction = tone_instruction(tone),
    )
}

/// Builds the deliverable/phase suggestions prompt from the proposal brief.
pub fn build_suggestions_prompt(brief: &ProposalInput) -> String {
    let technologies = brief.technologies.join(", ");

    format!(
        r#"You are a delivery planner. Given a project brief, suggest concrete deliverables and phases.
Produce a JSON object only, with exactly these keys:
- suggested_deliverables (array of {{"title": ..., "description": ...}} objects, at most 4)
- suggested_phases (array of {{"phase_name": ..., "duration_weeks": ..., "tasks": ...}} objects, at most 3)

Input:
- client_name: "{client}"
- project_goal: "{goal}"
- scope: "{scope}"
- technologies: "{technologies}"

Do NOT include any text outside the JSON object."#,
        client = brief.client_company_name,
        goal = brief.project_goal,
        scope = brief.scope,
        technologies = technologies,
    )
}
