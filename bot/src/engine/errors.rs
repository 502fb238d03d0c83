/// Failure talking to a remote collaborator (avatar source, emoji API, webhook).
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("{url} responded with {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Errors raised by the server-assignment and avatar caches.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Nothing cached or assigned; safe to show to the user as is.
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The cache contradicted itself (e.g. a lookup missed right after a
    /// successful create). Not recoverable by the user.
    #[error("cache invariant violated: {0}")]
    Invariant(String),
    #[error("database error: {0}")]
    Store(#[from] sqlx::Error),
}

impl CacheError {
    /// Text suitable for replying to the user who ran the command.
    pub fn user_message(&self) -> String {
        match self {
            CacheError::NotFound(message) => message.clone(),
            _ => "Something went wrong on my end, please try again later.".to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CacheError::NotFound(_))
    }
}
