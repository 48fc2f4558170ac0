use anyhow::Result;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::models::version::ProposalVersionRow;

/// Creates and returns a PostgreSQL connection pool.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    info!("PostgreSQL connection pool established");
    Ok(pool)
}

/// Ensures the proposal_versions table exists.
pub async fn init_schema(pool: &PgPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS proposal_versions (
            id UUID PRIMARY KEY,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            payload JSONB NOT NULL,
            ai_sections JSONB NOT NULL,
            used_model VARCHAR(200),
            note VARCHAR(500)
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Persists one generated proposal version and returns its id.
pub async fn save_version(
    pool: &PgPool,
    payload: &Value,
    ai_sections: &Value,
    used_model: &str,
    note: Option<&str>,
) -> Result<Uuid, sqlx::Error> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO proposal_versions (id, payload, ai_sections, used_model, note)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(id)
    .bind(payload)
    .bind(ai_sections)
    .bind(used_model)
    .bind(note)
    .execute(pool)
    .await?;
    Ok(id)
}

/// Fetches a stored proposal version by id.
pub async fn get_version(
    pool: &PgPool,
    id: Uuid,
) -> Result<Option<ProposalVersionRow>, sqlx::Error> {
    sqlx::query_as::<_, ProposalVersionRow>(
        r#"
        SELECT id, created_at, payload, ai_sections, used_model, note
        FROM proposal_versions
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}
