use std::sync::Arc;

use crate::engine::avatar_cache::{AvatarCache, GetOptions, PlayerIdentity};
use crate::engine::errors::CacheError;

/// Name servers report for players who hide themselves from status pings.
pub const ANONYMOUS_PLAYER: &str = "Anonymous Player";

const ANONYMOUS_FOOTNOTE: &str = "\n-# Can't see your name or others? \
     [`Learn More`](<https://minecraft.wiki/w/Java_Edition_21w44a#General>)";

/// Reply for the player list command.
///
/// Each visible player is shown with their head, creating it on first sight
/// and revalidating it in the background afterwards.
pub async fn format_player_list(
    avatars: &Arc<AvatarCache>,
    online: u32,
    max: u32,
    sample: &[PlayerIdentity],
) -> Result<String, CacheError> {
    if sample.is_empty() {
        return Ok("I don't see anyone online at the moment.".to_string());
    }

    let options = GetOptions {
        create: true,
        revalidate: true,
    };

    let mut shown = Vec::new();
    for player in sample.iter().filter(|p| p.display_name != ANONYMOUS_PLAYER) {
        let head = avatars.get(player, options).await?;
        shown.push(format!("{head} **{}**", player.display_name));
    }

    let anonymous = sample.len() - shown.len();
    let noun = if anonymous > 1 { "players" } else { "player" };

    let players = if shown.is_empty() {
        format!("{anonymous} {noun}")
    } else if anonymous > 0 {
        format!("{} and {anonymous} more {noun}", shown.join(", "))
    } else {
        shown.join(", ")
    };

    let mut reply = format!("**{online}**/**{max}** online: {players}.");
    if anonymous > 0 {
        reply.push_str(ANONYMOUS_FOOTNOTE);
    }
    Ok(reply)
}
