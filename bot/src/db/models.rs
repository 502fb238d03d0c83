use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored scope → Minecraft server assignment.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ServerAssignmentRow {
    pub scope_id: i64,
    pub parent_id: Option<i64>,
    pub assigned_by: i64,
    pub scope_type: i64,
    pub server_kind: i64,
    pub server_address: String,
}

/// Parameters for inserting or overwriting a server assignment.
pub struct UpsertAssignmentParams<'a> {
    pub scope_id: i64,
    pub parent_id: Option<i64>,
    pub assigned_by: i64,
    pub scope_type: i64,
    pub server_kind: i64,
    pub server_address: &'a str,
}

/// The last known player head for a player UUID.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AvatarRecordRow {
    pub unique_id: String,
    /// Hex-encoded SHA-256 of the image bytes the current asset was built from.
    pub content_hash: String,
    pub last_validated_at: DateTime<Utc>,
}
