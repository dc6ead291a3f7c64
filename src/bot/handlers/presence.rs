//! Presence tracking: any message in a managed chat refreshes the author's
//! membership there.

use crate::bot::{actor_of, messenger::to_db_id};
use crate::core::context::AppContext;
use crate::core::membership;
use poise::serenity_prelude as serenity;

/// Records the author of a guild message as present in its channel.
pub async fn handle_message(message: &serenity::Message, app: &AppContext) {
    if message.author.bot || message.guild_id.is_none() {
        return;
    }
    let actor = actor_of(&message.author);
    if let Err(e) =
        membership::record_presence(app, to_db_id(message.channel_id.get()), &actor).await
    {
        tracing::warn!("Could not record presence of {}: {e}", actor.external_id);
    }
}
