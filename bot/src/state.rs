use std::sync::Arc;

use sqlx::SqlitePool;

use crate::engine::avatar_cache::AvatarCache;
use crate::engine::server_cache::ServerAssignmentCache;

/// Shared state handed to every command handler.
pub struct BotState {
    pub servers: ServerAssignmentCache,
    pub avatars: Arc<AvatarCache>,
    pub db: SqlitePool,
}
