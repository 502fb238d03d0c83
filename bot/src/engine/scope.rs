/// The kinds of conversational context that can hold a server assignment.
///
/// Variants are declared most specific first, so the derived ordering is the
/// resolution precedence: `DirectMessage < Thread < Channel < Guild`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScopeType {
    /// A direct message or group DM.
    DirectMessage,
    Thread,
    Channel,
    Guild,
}

impl ScopeType {
    /// Code stored in `server_assignments.scope_type`.
    pub fn db_code(self) -> i64 {
        match self {
            ScopeType::DirectMessage => 1,
            ScopeType::Guild => 2,
            ScopeType::Channel => 3,
            ScopeType::Thread => 4,
        }
    }

    pub fn from_db_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(ScopeType::DirectMessage),
            2 => Some(ScopeType::Guild),
            3 => Some(ScopeType::Channel),
            4 => Some(ScopeType::Thread),
            _ => None,
        }
    }
}

/// Whether a scope key names an enclosing channel.
///
/// `None` is its own state and never compares equal to any concrete parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeParent {
    None,
    Channel(u64),
}

impl ScopeParent {
    pub fn id(self) -> Option<u64> {
        match self {
            ScopeParent::None => None,
            ScopeParent::Channel(id) => Some(id),
        }
    }
}

/// Identifies one scope that can hold at most one assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeKey {
    pub scope_id: u64,
    pub scope_type: ScopeType,
    /// Only set for threads, naming the parent channel.
    pub parent: ScopeParent,
}

impl ScopeKey {
    pub fn direct_message(channel_id: u64) -> Self {
        Self {
            scope_id: channel_id,
            scope_type: ScopeType::DirectMessage,
            parent: ScopeParent::None,
        }
    }

    pub fn thread(thread_id: u64, parent_channel_id: u64) -> Self {
        Self {
            scope_id: thread_id,
            scope_type: ScopeType::Thread,
            parent: ScopeParent::Channel(parent_channel_id),
        }
    }

    pub fn channel(channel_id: u64) -> Self {
        Self {
            scope_id: channel_id,
            scope_type: ScopeType::Channel,
            parent: ScopeParent::None,
        }
    }

    pub fn guild(guild_id: u64) -> Self {
        Self {
            scope_id: guild_id,
            scope_type: ScopeType::Guild,
            parent: ScopeParent::None,
        }
    }
}

/// Where a command was invoked, built once at the platform-event boundary.
///
/// `guild_id` is `None` when the bot is user-installed and the guild is not
/// visible to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationContext {
    /// A direct message or group DM.
    Private { channel_id: u64 },
    GuildChannel {
        guild_id: Option<u64>,
        channel_id: u64,
    },
    Thread {
        guild_id: Option<u64>,
        thread_id: u64,
        parent_channel_id: u64,
    },
}

type Extractor = fn(&ConversationContext) -> Option<(u64, ScopeParent)>;

fn direct_message_scope(ctx: &ConversationContext) -> Option<(u64, ScopeParent)> {
    match *ctx {
        ConversationContext::Private { channel_id } => Some((channel_id, ScopeParent::None)),
        _ => None,
    }
}

fn thread_scope(ctx: &ConversationContext) -> Option<(u64, ScopeParent)> {
    match *ctx {
        ConversationContext::Thread {
            thread_id,
            parent_channel_id,
            ..
        } => Some((thread_id, ScopeParent::Channel(parent_channel_id))),
        _ => None,
    }
}

/// A thread falls back to its parent channel, never to itself as a channel.
fn channel_scope(ctx: &ConversationContext) -> Option<(u64, ScopeParent)> {
    match *ctx {
        ConversationContext::GuildChannel { channel_id, .. } => {
            Some((channel_id, ScopeParent::None))
        }
        ConversationContext::Thread {
            parent_channel_id, ..
        } => Some((parent_channel_id, ScopeParent::None)),
        ConversationContext::Private { .. } => None,
    }
}

fn guild_scope(ctx: &ConversationContext) -> Option<(u64, ScopeParent)> {
    match *ctx {
        ConversationContext::GuildChannel { guild_id, .. }
        | ConversationContext::Thread { guild_id, .. } => {
            guild_id.map(|id| (id, ScopeParent::None))
        }
        ConversationContext::Private { .. } => None,
    }
}

/// Resolution table, most specific first. Each extractor is evaluated
/// independently; an entry applies iff its extractor recognizes the context.
const HIERARCHY: [(ScopeType, Extractor); 4] = [
    (ScopeType::DirectMessage, direct_message_scope),
    (ScopeType::Thread, thread_scope),
    (ScopeType::Channel, channel_scope),
    (ScopeType::Guild, guild_scope),
];

/// Candidate scope keys for a context, most specific first.
pub fn resolve(context: &ConversationContext) -> Vec<ScopeKey> {
    HIERARCHY
        .iter()
        .filter_map(|(scope_type, extract)| {
            extract(context).map(|(scope_id, parent)| ScopeKey {
                scope_id,
                scope_type: *scope_type,
                parent,
            })
        })
        .collect()
}

/// Platform ids are unsigned 64-bit; SQLite stores them in a signed INTEGER.
/// The cast is bit-preserving in both directions.
pub(crate) fn id_to_db(id: u64) -> i64 {
    id as i64
}

pub(crate) fn id_from_db(id: i64) -> u64 {
    id as u64
}
