//! Discord implementation of [`Messenger`].
//!
//! Panels become a message body, at most five rows of buttons and an
//! optional embed carrying the image. Users are reached through their DM
//! channel.

use crate::core::panel::{MessageRef, Messenger, Panel, Recipient};
use crate::errors::{Error, Result};
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use serenity::{
    ButtonStyle, ChannelId, CreateActionRow, CreateButton, CreateEmbed, CreateMessage, EditMessage,
    Http, MessageId, UserId,
};
use std::sync::Arc;

const MAX_CONTENT: usize = 2000;
const MAX_LABEL: usize = 80;
const MAX_ROWS: usize = 5;
const MAX_BUTTONS: usize = 5;

/// Converts a Discord snowflake to the integer stored in the database.
#[must_use]
pub fn to_db_id(id: u64) -> i64 {
    i64::try_from(id).unwrap_or(i64::MAX)
}

fn snowflake(id: i64) -> Result<u64> {
    u64::try_from(id)
        .ok()
        .filter(|v| *v != 0)
        .ok_or_else(|| Error::Messenger {
            message: format!("{id} is not a Discord id"),
        })
}

fn channel(id: i64) -> Result<ChannelId> {
    snowflake(id).map(ChannelId::new)
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(max.saturating_sub(1)).collect();
        cut.push('…');
        cut
    }
}

/// Builds the button rows of a panel.
pub fn components(panel: &Panel) -> Vec<CreateActionRow> {
    panel
        .buttons
        .iter()
        .take(MAX_ROWS)
        .map(|row| {
            let buttons = row
                .iter()
                .take(MAX_BUTTONS)
                .map(|button| {
                    CreateButton::new(button.intent.to_string())
                        .label(truncate(&button.label, MAX_LABEL))
                        .style(ButtonStyle::Primary)
                })
                .collect();
            CreateActionRow::Buttons(buttons)
        })
        .collect()
}

fn embeds(panel: &Panel) -> Vec<CreateEmbed> {
    panel
        .image_url
        .iter()
        .map(|url| CreateEmbed::new().image(url))
        .collect()
}

fn transport(e: &serenity::Error) -> Error {
    Error::Messenger {
        message: e.to_string(),
    }
}

/// Sends and edits panels over the Discord HTTP API.
#[derive(Clone)]
pub struct DiscordMessenger {
    http: Arc<Http>,
}

impl DiscordMessenger {
    /// Creates a messenger from an authenticated HTTP client.
    #[must_use]
    pub const fn new(http: Arc<Http>) -> Self {
        Self { http }
    }

    async fn resolve(&self, to: Recipient) -> Result<ChannelId> {
        match to {
            Recipient::Channel(id) => channel(id),
            Recipient::User(id) => {
                let dm = UserId::new(snowflake(id)?)
                    .create_dm_channel(self.http.as_ref())
                    .await
                    .map_err(|e| transport(&e))?;
                Ok(dm.id)
            }
        }
    }
}

impl std::fmt::Debug for DiscordMessenger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordMessenger").finish_non_exhaustive()
    }
}

#[async_trait]
impl Messenger for DiscordMessenger {
    async fn send_panel(&self, to: Recipient, panel: &Panel) -> Result<MessageRef> {
        let channel_id = self.resolve(to).await?;
        let message = CreateMessage::new()
            .content(truncate(&panel.text, MAX_CONTENT))
            .components(components(panel))
            .embeds(embeds(panel));
        let sent = channel_id
            .send_message(self.http.as_ref(), message)
            .await
            .map_err(|e| transport(&e))?;
        Ok(MessageRef {
            channel_id: to_db_id(sent.channel_id.get()),
            message_id: to_db_id(sent.id.get()),
        })
    }

    async fn edit_panel(&self, at: MessageRef, panel: &Panel) -> Result<()> {
        let edit = EditMessage::new()
            .content(truncate(&panel.text, MAX_CONTENT))
            .components(components(panel))
            .embeds(embeds(panel));
        channel(at.channel_id)?
            .edit_message(self.http.as_ref(), MessageId::new(snowflake(at.message_id)?), edit)
            .await
            .map_err(|e| transport(&e))?;
        Ok(())
    }

    async fn delete_message(&self, at: MessageRef) -> Result<()> {
        channel(at.channel_id)?
            .delete_message(self.http.as_ref(), MessageId::new(snowflake(at.message_id)?))
            .await
            .map_err(|e| transport(&e))
    }

    async fn is_member(&self, channel_id: i64, user_id: i64) -> Result<bool> {
        let Ok(found) = channel(channel_id)?.to_channel(self.http.as_ref()).await else {
            return Ok(false);
        };
        let Some(guild_channel) = found.guild() else {
            return Ok(false);
        };
        Ok(guild_channel
            .guild_id
            .member(self.http.as_ref(), UserId::new(snowflake(user_id)?))
            .await
            .is_ok())
    }

    async fn chat_title(&self, channel_id: i64) -> Result<String> {
        let found = channel(channel_id)?
            .to_channel(self.http.as_ref())
            .await
            .map_err(|e| transport(&e))?;
        Ok(match found.guild() {
            Some(guild_channel) => format!("#{}", guild_channel.name),
            None => "Direct messages".to_string(),
        })
    }
}
