use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::db::models::AvatarRecordRow;

/// Get the stored avatar record for a player UUID.
pub async fn get_record(
    pool: &SqlitePool,
    unique_id: &str,
) -> Result<Option<AvatarRecordRow>, sqlx::Error> {
    sqlx::query_as::<_, AvatarRecordRow>(
        "SELECT unique_id, content_hash, last_validated_at \
         FROM avatar_records WHERE unique_id = ?",
    )
    .bind(unique_id)
    .fetch_optional(pool)
    .await
}

/// Insert or replace the hash and validation time for a player.
pub async fn upsert_record(
    pool: &SqlitePool,
    unique_id: &str,
    content_hash: &str,
    validated_at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO avatar_records (unique_id, content_hash, last_validated_at) \
         VALUES (?, ?, ?) \
         ON CONFLICT (unique_id) DO UPDATE SET \
         content_hash = excluded.content_hash, \
         last_validated_at = excluded.last_validated_at",
    )
    .bind(unique_id)
    .bind(content_hash)
    .bind(validated_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Advance only the validation timestamp. Returns false if no record exists.
pub async fn touch_validated_at(
    pool: &SqlitePool,
    unique_id: &str,
    validated_at: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE avatar_records SET last_validated_at = ? WHERE unique_id = ?")
        .bind(validated_at)
        .bind(unique_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
