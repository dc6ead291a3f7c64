//! Discord interaction handlers
//!
//! This module provides handlers for Discord interactions such as autocomplete,
//! button clicks, and the messages used to track chat presence.

/// Autocomplete handlers for command parameters
pub mod autocomplete;
/// Button presses routed to the core
pub mod interaction;
/// Presence tracking from chat messages
pub mod presence;

use crate::bot::BotData;
use crate::errors::{Error, Result};
use poise::serenity_prelude as serenity;

/// Framework event hook: dispatches the events the bot cares about.
pub async fn handle_event(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, BotData, Error>,
    data: &BotData,
) -> Result<()> {
    match event {
        serenity::FullEvent::InteractionCreate {
            interaction: serenity::Interaction::Component(component),
        } => interaction::handle_component(ctx, component, &data.app).await,
        serenity::FullEvent::Message { new_message } => {
            presence::handle_message(new_message, &data.app).await;
            Ok(())
        }
        _ => Ok(()),
    }
}
