use sqlx::SqlitePool;
use tracing::{debug, info};

use super::errors::CacheError;
use super::scope::{
    ConversationContext, ScopeKey, ScopeParent, ScopeType, id_from_db, id_to_db, resolve,
};
use crate::db::models::{ServerAssignmentRow, UpsertAssignmentParams};
use crate::db::queries::server_assignments;

/// How the bot reaches the assigned Minecraft server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerKind {
    /// Status pings against `host[:port]`.
    DirectAddress,
    Rcon,
}

impl ServerKind {
    pub fn db_code(self) -> i64 {
        match self {
            ServerKind::DirectAddress => 1,
            ServerKind::Rcon => 2,
        }
    }

    pub fn from_db_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(ServerKind::DirectAddress),
            2 => Some(ServerKind::Rcon),
            _ => None,
        }
    }
}

/// A server watched from one scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAssignment {
    pub scope: ScopeKey,
    pub server_address: String,
    pub server_kind: ServerKind,
    /// User id of whoever made the (latest) assignment.
    pub assigned_by: u64,
}

impl TryFrom<ServerAssignmentRow> for ServerAssignment {
    type Error = CacheError;

    fn try_from(row: ServerAssignmentRow) -> Result<Self, Self::Error> {
        let scope_type = ScopeType::from_db_code(row.scope_type).ok_or_else(|| {
            CacheError::Invariant(format!("unknown scope type code {}", row.scope_type))
        })?;
        let server_kind = ServerKind::from_db_code(row.server_kind).ok_or_else(|| {
            CacheError::Invariant(format!("unknown server kind code {}", row.server_kind))
        })?;
        let parent = match row.parent_id {
            Some(id) => ScopeParent::Channel(id_from_db(id)),
            None => ScopeParent::None,
        };

        Ok(Self {
            scope: ScopeKey {
                scope_id: id_from_db(row.scope_id),
                scope_type,
                parent,
            },
            server_address: row.server_address,
            server_kind,
            assigned_by: id_from_db(row.assigned_by),
        })
    }
}

/// Resolves which server applies to a conversation and persists assignments.
///
/// Holds no interactive state: reassignment confirmation is driven by the
/// command layer through [`ServerAssignmentCache::is_any_assigned`].
#[derive(Clone)]
pub struct ServerAssignmentCache {
    db: SqlitePool,
}

impl ServerAssignmentCache {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// The most specific assignment that applies to `context`, if any.
    pub async fn get(
        &self,
        context: &ConversationContext,
    ) -> Result<Option<ServerAssignment>, CacheError> {
        for key in resolve(context) {
            let row = server_assignments::get_assignment(
                &self.db,
                id_to_db(key.scope_id),
                key.scope_type.db_code(),
                key.parent.id().map(id_to_db),
            )
            .await?;

            if let Some(row) = row {
                debug!(
                    scope_id = key.scope_id,
                    scope_type = ?key.scope_type,
                    "resolved server assignment"
                );
                return ServerAssignment::try_from(row).map(Some);
            }
        }
        Ok(None)
    }

    /// Like [`get`](Self::get), but a missing assignment is an error.
    pub async fn fetch(
        &self,
        context: &ConversationContext,
    ) -> Result<ServerAssignment, CacheError> {
        self.get(context).await?.ok_or_else(|| {
            CacheError::NotFound("I'm not set to watch any servers here.".to_string())
        })
    }

    /// Whether this exact key already holds an assignment. Does not walk the
    /// hierarchy.
    pub async fn is_any_assigned(
        &self,
        scope_id: u64,
        scope_type: ScopeType,
        parent: ScopeParent,
    ) -> Result<bool, CacheError> {
        let exists = server_assignments::assignment_exists(
            &self.db,
            id_to_db(scope_id),
            scope_type.db_code(),
            parent.id().map(id_to_db),
        )
        .await?;
        Ok(exists)
    }

    /// Insert or overwrite the assignment for `assignment.scope`.
    pub async fn assign_or_update(&self, assignment: &ServerAssignment) -> Result<(), CacheError> {
        server_assignments::upsert_assignment(
            &self.db,
            &UpsertAssignmentParams {
                scope_id: id_to_db(assignment.scope.scope_id),
                parent_id: assignment.scope.parent.id().map(id_to_db),
                assigned_by: id_to_db(assignment.assigned_by),
                scope_type: assignment.scope.scope_type.db_code(),
                server_kind: assignment.server_kind.db_code(),
                server_address: &assignment.server_address,
            },
        )
        .await?;

        info!(
            scope_id = assignment.scope.scope_id,
            scope_type = ?assignment.scope.scope_type,
            server = %assignment.server_address,
            assigned_by = assignment.assigned_by,
            "server assigned"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::pool::{create_pool, run_migrations};

    async fn setup_cache() -> (ServerAssignmentCache, SqlitePool) {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        (ServerAssignmentCache::new(pool.clone()), pool)
    }

    fn assignment(scope: ScopeKey, address: &str) -> ServerAssignment {
        ServerAssignment {
            scope,
            server_address: address.to_string(),
            server_kind: ServerKind::DirectAddress,
            assigned_by: 1,
        }
    }

    fn channel_in_guild(channel_id: u64, guild_id: u64) -> ConversationContext {
        ConversationContext::GuildChannel {
            guild_id: Some(guild_id),
            channel_id,
        }
    }

    #[tokio::test]
    async fn test_get_unassigned_returns_none() {
        let (cache, _) = setup_cache().await;
        let found = cache.get(&channel_in_guild(55, 100)).await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_fetch_unassigned_is_not_found() {
        let (cache, _) = setup_cache().await;
        let err = cache
            .fetch(&ConversationContext::Private { channel_id: 3 })
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_get_returns_assignment_through_guild() {
        let (cache, _) = setup_cache().await;
        let a = assignment(ScopeKey::guild(100), "mc.example.com");
        cache.assign_or_update(&a).await.unwrap();

        let found = cache.get(&channel_in_guild(55, 100)).await.unwrap();
        assert_eq!(found, Some(a));
    }

    #[tokio::test]
    async fn test_channel_assignment_beats_guild() {
        let (cache, _) = setup_cache().await;
        cache
            .assign_or_update(&assignment(ScopeKey::guild(100), "mc.example.com"))
            .await
            .unwrap();
        cache
            .assign_or_update(&assignment(ScopeKey::channel(55), "pvp.example.com"))
            .await
            .unwrap();

        let found = cache.fetch(&channel_in_guild(55, 100)).await.unwrap();
        assert_eq!(found.server_address, "pvp.example.com");
        assert_eq!(found.scope.scope_type, ScopeType::Channel);
    }

    #[tokio::test]
    async fn test_thread_assignment_beats_parent_channel() {
        let (cache, _) = setup_cache().await;
        cache
            .assign_or_update(&assignment(ScopeKey::channel(55), "pvp.example.com"))
            .await
            .unwrap();
        cache
            .assign_or_update(&assignment(ScopeKey::thread(9, 55), "event.example.com"))
            .await
            .unwrap();

        let in_thread = ConversationContext::Thread {
            guild_id: Some(100),
            thread_id: 9,
            parent_channel_id: 55,
        };
        let other_thread = ConversationContext::Thread {
            guild_id: Some(100),
            thread_id: 10,
            parent_channel_id: 55,
        };
        assert_eq!(
            cache.fetch(&in_thread).await.unwrap().server_address,
            "event.example.com"
        );
        assert_eq!(
            cache.fetch(&other_thread).await.unwrap().server_address,
            "pvp.example.com"
        );
    }

    #[tokio::test]
    async fn test_direct_message_does_not_see_guild_assignments() {
        let (cache, _) = setup_cache().await;
        cache
            .assign_or_update(&assignment(ScopeKey::channel(5), "mc.example.com"))
            .await
            .unwrap();

        // Same numeric id, different scope type.
        let found = cache
            .get(&ConversationContext::Private { channel_id: 5 })
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_assign_or_update_is_idempotent() {
        let (cache, pool) = setup_cache().await;
        let a = assignment(ScopeKey::channel(55), "mc.example.com");
        cache.assign_or_update(&a).await.unwrap();
        cache.assign_or_update(&a).await.unwrap();

        let rows: Vec<ServerAssignmentRow> =
            sqlx::query_as("SELECT * FROM server_assignments")
                .fetch_all(&pool)
                .await
                .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(ServerAssignment::try_from(rows[0].clone()).unwrap(), a);
    }

    #[tokio::test]
    async fn test_reassignment_overwrites_every_field() {
        let (cache, _) = setup_cache().await;
        cache
            .assign_or_update(&assignment(ScopeKey::guild(100), "mc.example.com"))
            .await
            .unwrap();
        let replacement = ServerAssignment {
            scope: ScopeKey::guild(100),
            server_address: "rcon.example.com:25575".to_string(),
            server_kind: ServerKind::Rcon,
            assigned_by: 2,
        };
        cache.assign_or_update(&replacement).await.unwrap();

        let found = cache.fetch(&channel_in_guild(1, 100)).await.unwrap();
        assert_eq!(found, replacement);
    }

    #[tokio::test]
    async fn test_is_any_assigned_checks_exact_key_only() {
        let (cache, _) = setup_cache().await;
        cache
            .assign_or_update(&assignment(ScopeKey::guild(100), "mc.example.com"))
            .await
            .unwrap();

        assert!(
            cache
                .is_any_assigned(100, ScopeType::Guild, ScopeParent::None)
                .await
                .unwrap()
        );
        // The channel itself inherits the guild server but holds no assignment.
        assert!(
            !cache
                .is_any_assigned(55, ScopeType::Channel, ScopeParent::None)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_large_platform_ids_round_trip() {
        let (cache, _) = setup_cache().await;
        let guild_id = 1_300_000_000_000_000_000u64 * 10;
        let a = assignment(ScopeKey::guild(guild_id), "mc.example.com");
        cache.assign_or_update(&a).await.unwrap();

        let found = cache.fetch(&channel_in_guild(1, guild_id)).await.unwrap();
        assert_eq!(found.scope.scope_id, guild_id);
    }

    #[test]
    fn test_row_with_unknown_scope_code_is_rejected() {
        let row = ServerAssignmentRow {
            scope_id: 1,
            parent_id: None,
            assigned_by: 1,
            scope_type: 99,
            server_kind: 1,
            server_address: "mc.example.com".into(),
        };
        let err = ServerAssignment::try_from(row).unwrap_err();
        assert!(matches!(err, CacheError::Invariant(_)));
    }
}
