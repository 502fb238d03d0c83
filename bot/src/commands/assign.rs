use async_trait::async_trait;

use crate::engine::errors::CacheError;
use crate::engine::scope::{ConversationContext, ScopeKey, ScopeType, resolve};
use crate::engine::server_cache::{ServerAssignment, ServerAssignmentCache, ServerKind};

/// Asks the invoking user a yes/no question and waits for the answer.
#[async_trait]
pub trait Confirmer: Send + Sync {
    async fn confirm(&self, prompt: &str) -> bool;
}

/// How a scope is referred to in replies.
pub fn scope_phrase(scope_type: ScopeType) -> &'static str {
    match scope_type {
        ScopeType::DirectMessage | ScopeType::Channel => "this channel",
        ScopeType::Thread => "this thread",
        ScopeType::Guild => "this server",
    }
}

/// Scopes a user may assign a server to from this context, broadest first,
/// in the order they are offered.
pub fn assignable_scopes(context: &ConversationContext) -> Vec<ScopeType> {
    let mut scopes: Vec<ScopeType> = resolve(context).iter().map(|k| k.scope_type).collect();
    scopes.reverse();
    scopes
}

/// The key an assignment of `scope_type` made from `context` is stored under.
pub fn scope_key_for(context: &ConversationContext, scope_type: ScopeType) -> Option<ScopeKey> {
    resolve(context)
        .into_iter()
        .find(|k| k.scope_type == scope_type)
}

/// Result of an assign command, with the reply to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignOutcome {
    Assigned(String),
    Reassigned(String),
    Aborted(String),
}

impl AssignOutcome {
    pub fn message(&self) -> &str {
        match self {
            AssignOutcome::Assigned(m)
            | AssignOutcome::Reassigned(m)
            | AssignOutcome::Aborted(m) => m,
        }
    }
}

/// Assign `server_address` to `scope`, asking before replacing an existing
/// assignment at the same key. A declined confirmation leaves the store as is.
pub async fn assign_server(
    cache: &ServerAssignmentCache,
    scope: ScopeKey,
    server_address: &str,
    server_kind: ServerKind,
    assigned_by: u64,
    confirmer: &dyn Confirmer,
) -> Result<AssignOutcome, CacheError> {
    let phrase = scope_phrase(scope.scope_type);
    let assignment = ServerAssignment {
        scope,
        server_address: server_address.to_string(),
        server_kind,
        assigned_by,
    };

    let already_assigned = cache
        .is_any_assigned(scope.scope_id, scope.scope_type, scope.parent)
        .await?;

    if !already_assigned {
        cache.assign_or_update(&assignment).await?;
        return Ok(AssignOutcome::Assigned(format!(
            "Assigned **`{server_address}`** to {phrase}."
        )));
    }

    let prompt = format!(
        "There seems to be a server assigned to {phrase} already, do you want to overwrite it?"
    );
    if !confirmer.confirm(&prompt).await {
        return Ok(AssignOutcome::Aborted("Aborted.".to_string()));
    }

    cache.assign_or_update(&assignment).await?;
    Ok(AssignOutcome::Reassigned(format!(
        "I've updated the assigned server in {phrase} to **`{server_address}`**."
    )))
}

/// Precondition for the server commands: the server that applies here.
pub async fn require_assignment(
    cache: &ServerAssignmentCache,
    context: &ConversationContext,
) -> Result<ServerAssignment, CacheError> {
    cache.fetch(context).await
}
