use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// One stored generation: the input payload, the sections produced for it,
/// and the model identifier that actually produced them.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProposalVersionRow {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub payload: Value,
    pub ai_sections: Value,
    pub used_model: Option<String>,
    pub note: Option<String>,
}
