use sqlx::SqlitePool;

use crate::db::models::{ServerAssignmentRow, UpsertAssignmentParams};

/// Look up the assignment stored at exactly this key.
///
/// A missing parent is matched with `IS NULL` rather than by binding a null,
/// so a parentless key never equals a key that carries a parent.
pub async fn get_assignment(
    pool: &SqlitePool,
    scope_id: i64,
    scope_type: i64,
    parent_id: Option<i64>,
) -> Result<Option<ServerAssignmentRow>, sqlx::Error> {
    match parent_id {
        Some(parent_id) => {
            sqlx::query_as::<_, ServerAssignmentRow>(
                "SELECT scope_id, parent_id, assigned_by, scope_type, server_kind, server_address \
                 FROM server_assignments \
                 WHERE scope_id = ? AND scope_type = ? AND parent_id = ?",
            )
            .bind(scope_id)
            .bind(scope_type)
            .bind(parent_id)
            .fetch_optional(pool)
            .await
        }
        None => {
            sqlx::query_as::<_, ServerAssignmentRow>(
                "SELECT scope_id, parent_id, assigned_by, scope_type, server_kind, server_address \
                 FROM server_assignments \
                 WHERE scope_id = ? AND scope_type = ? AND parent_id IS NULL",
            )
            .bind(scope_id)
            .bind(scope_type)
            .fetch_optional(pool)
            .await
        }
    }
}

/// Check whether an assignment exists at exactly this key.
pub async fn assignment_exists(
    pool: &SqlitePool,
    scope_id: i64,
    scope_type: i64,
    parent_id: Option<i64>,
) -> Result<bool, sqlx::Error> {
    let exists: bool = match parent_id {
        Some(parent_id) => {
            sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM server_assignments \
                 WHERE scope_id = ? AND scope_type = ? AND parent_id = ?)",
            )
            .bind(scope_id)
            .bind(scope_type)
            .bind(parent_id)
            .fetch_one(pool)
            .await?
        }
        None => {
            sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM server_assignments \
                 WHERE scope_id = ? AND scope_type = ? AND parent_id IS NULL)",
            )
            .bind(scope_id)
            .bind(scope_type)
            .fetch_one(pool)
            .await?
        }
    };
    Ok(exists)
}

/// Insert an assignment, overwriting every other column when one already
/// exists for the same (scope_id, scope_type).
pub async fn upsert_assignment(
    pool: &SqlitePool,
    params: &UpsertAssignmentParams<'_>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO server_assignments \
         (scope_id, parent_id, assigned_by, scope_type, server_kind, server_address) \
         VALUES (?, ?, ?, ?, ?, ?) \
         ON CONFLICT (scope_id, scope_type) DO UPDATE SET \
         parent_id = excluded.parent_id, \
         assigned_by = excluded.assigned_by, \
         server_kind = excluded.server_kind, \
         server_address = excluded.server_address",
    )
    .bind(params.scope_id)
    .bind(params.parent_id)
    .bind(params.assigned_by)
    .bind(params.scope_type)
    .bind(params.server_kind)
    .bind(params.server_address)
    .execute(pool)
    .await?;
    Ok(())
}
