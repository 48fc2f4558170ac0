//! Document engine: renders a proposal document from a UTF-8 text template.
//!
//! Templates carry `{{placeholder}}` markers. Rendering substitutes every
//! known placeholder, expands the deliverables/timeline lists into rows, and
//! resolves unknown placeholders to empty strings so a sparse sections
//! mapping still produces a complete document.

use std::collections::HashMap;

use bytes::Bytes;
use chrono::{NaiveDate, Utc};
use serde_json::{Map, Value};
use tracing::warn;

use crate::models::proposal::ProposalInput;

/// Context fields rendered as currency amounts.
const CURRENCY_FIELDS: &[&str] = &[
    "development_cost",
    "licenses_cost",
    "support_cost",
    "total_investment_cost",
];

/// Built-in template used when TEMPLATE_PATH is not configured.
pub const DEFAULT_TEMPLATE: &str = r#"# Proposal for {{client_company_name}}

Prepared by {{provider_company_name}} on {{current_date}}.
Expected completion: {{expected_completion_date}}

## Executive Summary
{{executive_summary_text}}

## Mission
{{project_mission_text}}

## Solution Concept
{{solution_concept_text}}

## Methodology
{{project_methodology_text}}

## Deliverables
{{deliverables_rows}}

## Timeline
{{timeline_rows}}

## Investment
Development: {{development_cost}}
Licenses: {{licenses_cost}}
Support: {{support_cost}}
Total: {{total_investment_cost}}

{{financial_justification_text}}

## Payment Terms
{{payment_terms_text}}

## Notes
{{development_note}}
{{licenses_note}}
{{support_note}}

## Signatures
Client: {{client_signature_name}} ({{client_signature_date}})
Provider: {{provider_signature_name}} ({{provider_signature_date}})
"#;

/// Renders the template against a context mapping and returns the document
/// bytes. Never fails: unresolved placeholders render as empty strings.
pub fn render(template: &str, context: &Map<String, Value>) -> Bytes {
    let mut mapping: HashMap<String, String> = HashMap::with_capacity(context.len() + 2);
    for (key, value) in context {
        let text = if CURRENCY_FIELDS.contains(&key.as_str()) {
            format_currency(value)
        } else {
            value_to_text(value)
        };
        mapping.insert(key.clone(), text);
    }

    mapping.insert(
        "deliverables_rows".to_string(),
        deliverable_rows(context.get("deliverables_list")),
    );
    mapping.insert(
        "timeline_rows".to_string(),
        timeline_rows(context.get("phases_list")),
    );

    Bytes::from(substitute(template, &mapping))
}

/// Loads the template file, falling back to the built-in template when the
/// path is unset or unreadable.
pub fn load_template(path: Option<&str>) -> String {
    match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => contents,
            Err(e) => {
                warn!("could not read template at {p}: {e}; using built-in template");
                DEFAULT_TEMPLATE.to_string()
            }
        },
        None => DEFAULT_TEMPLATE.to_string(),
    }
}

/// Replaces every `{{word}}` marker from the mapping; unknown markers become
/// empty. Anything that is not a well-formed marker is copied through.
fn substitute(template: &str, mapping: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find("{{") {
        out.push_str(&rest[..open]);
        let after = &rest[open + 2..];
        match after.find("}}") {
            Some(close)
                if after[..close]
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_')
                    && close > 0 =>
            {
                if let Some(value) = mapping.get(&after[..close]) {
                    out.push_str(value);
                }
                rest = &after[close + 2..];
            }
            _ => {
                out.push_str("{{");
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => serde_json::to_string(other).unwrap_or_else(|_| other.to_string()),
    }
}

/// Currency formatting: two decimals with thousands separators. Anything that
/// is not a number falls back to its plain text form.
fn format_currency(value: &Value) -> String {
    let number = match value {
        Value::Null => return String::new(),
        Value::Number(n) => n.as_f64(),
        Value::String(s) if s.trim().is_empty() => return String::new(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match number {
        Some(x) => group_thousands(x),
        None => value_to_text(value),
    }
}

fn group_thousands(x: f64) -> String {
    let formatted = format!("{x:.2}");
    let (int_part, frac) = formatted
        .split_once('.')
        .unwrap_or((formatted.as_str(), "00"));
    let (sign, digits) = match int_part.strip_prefix('-') {
        Some(d) => ("-", d),
        None => ("", int_part),
    };
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    format!("{sign}{grouped}.{frac}")
}

fn deliverable_rows(list: Option<&Value>) -> String {
    let Some(Value::Array(items)) = list else {
        return String::new();
    };
    items
        .iter()
        .map(|d| {
            format!(
                "- {}: {} (acceptance: {})",
                d["title"].as_str().unwrap_or_default(),
                d["description"].as_str().unwrap_or_default(),
                d["acceptance"].as_str().unwrap_or_default(),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn timeline_rows(list: Option<&Value>) -> String {
    let Some(Value::Array(items)) = list else {
        return String::new();
    };
    items
        .iter()
        .map(|p| {
            format!(
                "- {} ({}): {}",
                p["phase_name"].as_str().unwrap_or_default(),
                p["duration"].as_str().unwrap_or_default(),
                p["tasks"].as_str().unwrap_or_default(),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Sanitizes AI-produced prose before it reaches a document: drops script
/// tags, resolves `{{name}}`/`[name]` placeholders from the context, and
/// collapses whitespace runs.
pub fn sanitize_ai_text(text: &str, context: &Map<String, Value>) -> String {
    let mut cleaned = strip_script_blocks(text);
    for (key, value) in context {
        let replacement = value_to_text(value);
        cleaned = cleaned.replace(&format!("{{{{{key}}}}}"), &replacement);
        cleaned = cleaned.replace(&format!("[{key}]"), &replacement);
    }
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn strip_script_blocks(text: &str) -> String {
    // ASCII lowercasing keeps byte offsets aligned with the original text.
    let lower = text.to_ascii_lowercase();
    let mut out = String::with_capacity(text.len());
    let mut pos = 0;
    while let Some(found) = lower[pos..].find("<script") {
        let start = pos + found;
        out.push_str(&text[pos..start]);
        match lower[start..].find("</script>") {
            Some(end) => pos = start + end + "</script>".len(),
            // unterminated script tag: drop the tail
            None => return out,
        }
    }
    out.push_str(&text[pos..]);
    out
}

/// Builds the full template context from the brief and the sections mapping,
/// including the fixed deliverable/phase placeholder slots the original
/// templates expect.
pub fn build_context(brief: &ProposalInput, sections: &Map<String, Value>) -> Map<String, Value> {
    let mut context = Map::new();

    context.insert(
        "current_date".to_string(),
        Value::String(Utc::now().date_naive().format("%d %B %Y").to_string()),
    );
    context.insert(
        "proposal_title".to_string(),
        Value::String(brief.proposal_title.clone()),
    );
    context.insert(
        "client_company_name".to_string(),
        Value::String(brief.client_company_name.clone()),
    );
    context.insert(
        "provider_company_name".to_string(),
        Value::String(brief.provider_company_name.clone()),
    );
    context.insert(
        "expected_completion_date".to_string(),
        Value::String(format_date(brief.deadline)),
    );

    let fin = brief.financials.clone().unwrap_or_default();
    let dev = fin.development_cost.unwrap_or(0.0);
    let lic = fin.licenses_cost.unwrap_or(0.0);
    let sup = fin.support_cost.unwrap_or(0.0);
    for (key, amount) in [
        ("development_cost", dev),
        ("licenses_cost", lic),
        ("support_cost", sup),
        ("total_investment_cost", dev + lic + sup),
    ] {
        if let Some(n) = serde_json::Number::from_f64(amount) {
            context.insert(key.to_string(), Value::Number(n));
        }
    }

    for (key, value) in sections {
        context.insert(key.clone(), value.clone());
    }

    context.insert(
        "client_signature_name".to_string(),
        Value::String(brief.client_signature_name.clone()),
    );
    context.insert(
        "client_signature_date".to_string(),
        Value::String(format_date(brief.client_signature_date)),
    );
    context.insert(
        "provider_signature_name".to_string(),
        Value::String(brief.provider_signature_name.clone()),
    );
    context.insert(
        "provider_signature_date".to_string(),
        Value::String(format_date(brief.provider_signature_date)),
    );

    // Fixed numbered slots: four deliverables, three phases.
    let mut deliverables_list = Vec::new();
    for idx in 0..4 {
        let (title, description, acceptance) = match brief.deliverables.get(idx) {
            Some(d) => (
                d.title.clone(),
                d.description.clone(),
                d.acceptance_criteria.clone(),
            ),
            None => (String::new(), String::new(), String::new()),
        };
        if brief.deliverables.get(idx).is_some() {
            deliverables_list.push(serde_json::json!({
                "title": title,
                "description": description,
                "acceptance": acceptance,
            }));
        }
        let n = idx + 1;
        context.insert(format!("deliverable_{n}_title"), Value::String(title));
        context.insert(
            format!("deliverable_{n}_description"),
            Value::String(description),
        );
        context.insert(
            format!("deliverable_{n}_acceptance"),
            Value::String(acceptance),
        );
    }
    context.insert(
        "deliverables_list".to_string(),
        Value::Array(deliverables_list),
    );

    let mut phases_list = Vec::new();
    for idx in 0..3 {
        let n = idx + 1;
        let (duration, tasks) = match brief.phases.get(idx) {
            Some(p) => (format!("{} weeks", p.duration_weeks), p.tasks.clone()),
            None => (String::new(), String::new()),
        };
        if brief.phases.get(idx).is_some() {
            phases_list.push(serde_json::json!({
                "phase_name": format!("Phase {n}"),
                "duration": duration,
                "tasks": tasks,
            }));
        }
        context.insert(format!("phase_{n}_tasks"), Value::String(tasks));
        context.insert(format!("phase_{n}_duration"), Value::String(duration));
    }
    context.insert("phases_list".to_string(), Value::Array(phases_list));

    context
}

fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%d %B %Y").to_string())
        .unwrap_or_default()
}

/// Filename-safe rendition of the client name for the download header.
pub fn safe_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '_' || *c == '-')
        .collect();
    let cleaned = cleaned.trim().replace(' ', "_");
    if cleaned.is_empty() {
        "proposal".to_string()
    } else {
        cleaned
    }
}
