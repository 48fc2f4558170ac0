use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::db;
use crate::errors::AppError;
use crate::generation::sections::{generate_sections, EXPECTED_KEYS};
use crate::generation::suggestions::{generate_suggestions, Suggestions};
use crate::models::proposal::ProposalInput;
use crate::models::version::ProposalVersionRow;
use crate::render;
use crate::state::AppState;

/// POST /api/v1/proposals/generate
///
/// Generates the AI sections for the brief, renders the proposal document,
/// stores the version, and returns the document as a downloadable attachment.
pub async fn handle_generate_proposal(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<Response, AppError> {
    let brief: ProposalInput = serde_json::from_value(payload.clone())
        .map_err(|e| AppError::Validation(e.to_string()))?;
    brief.validate().map_err(AppError::Validation)?;

    let (sections, used_model) = generate_sections(&state.engine, &brief, brief.tone).await;
    info!(model = %used_model, client = %brief.client_company_name, "sections generated");

    let mut context = render::build_context(&brief, &sections);

    // AI prose is sanitized against the final context so leftover
    // placeholders resolve to real values instead of leaking into documents.
    let sanitized: Vec<(String, String)> = EXPECTED_KEYS
        .iter()
        .filter_map(|key| {
            context
                .get(*key)
                .and_then(Value::as_str)
                .map(|text| ((*key).to_string(), render::sanitize_ai_text(text, &context)))
        })
        .collect();
    for (key, text) in sanitized {
        context.insert(key, Value::String(text));
    }

    let document = render::render(&state.template, &context);

    let version_id = db::save_version(
        &state.db,
        &payload,
        &Value::Object(sections),
        &used_model,
        None,
    )
    .await?;

    let filename = format!(
        "proposal_{}.md",
        render::safe_filename(&brief.client_company_name)
    );
    let headers = [
        (header::CONTENT_TYPE, "text/markdown; charset=utf-8".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        ),
        (
            header::HeaderName::from_static("x-proposal-version"),
            version_id.to_string(),
        ),
        (
            header::HeaderName::from_static("x-used-model"),
            used_model,
        ),
    ];
    Ok((headers, document).into_response())
}

/// GET /api/v1/proposals/:id
pub async fn handle_get_version(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProposalVersionRow>, AppError> {
    match db::get_version(&state.db, id).await? {
        Some(row) => Ok(Json(row)),
        None => Err(AppError::NotFound(format!("proposal version {id}"))),
    }
}

/// POST /api/v1/proposals/suggestions
///
/// Suggestions accept partial briefs, so the input is parsed but not put
/// through full validation.
pub async fn handle_suggestions(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<Json<Suggestions>, AppError> {
    let brief: ProposalInput =
        serde_json::from_value(payload).map_err(|e| AppError::Validation(e.to_string()))?;
    Ok(Json(generate_suggestions(&state.engine, &brief).await))
}
