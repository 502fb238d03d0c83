pub mod crafthead;
pub mod emoji_api;

/// User-Agent sent with every outbound request.
pub const USER_AGENT: &str = concat!("EstellaBot/", env!("CARGO_PKG_VERSION"));
