//! General Discord commands - ping and help.
//! This module contains simple commands that don't require database operations.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::BotData,
        errors::{Error, Result},
    };

    /// Responds with "Pong!" to test bot connectivity.
    #[poise::command(slash_command, prefix_command)]
    pub async fn ping(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        ctx.say("Pong!").await?;
        Ok(())
    }

    /// Displays help information about available commands.
    #[poise::command(slash_command, prefix_command)]
    pub async fn help(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "**GiftBuddy Help**\n\
        I collect money for birthday gifts in your groups.\n\n\
        **Everyone**\n\
        • `/start` - Opens your menu in direct messages.\n\
        • `/phone <number>` - Saves your phone number.\n\
        • `/birthday <date>` - Saves your birthday (YYYY-MM-DD or DD.MM.YYYY).\n\n\
        **Chat admins**\n\
        • `/card <chat> <number>` - Sets the card that receives contributions.\n\
        • `/change_admin <chat> <phone>` - Hands a chat over to another member.\n\
        • `/amount <event> <amount>` - Changes the amount asked per person.\n\
        • `/create_event <chat> <name> <date> [phone]` - Collects for someone without the bot.\n\n\
        **Super admins**\n\
        • `/add_chat <channel> <card>` - Registers a channel as a managed chat.\n\
        • `/schedule <task> <HH:MM> [days]` - Changes when the daily checks run.\n\n\
        **Utility**\n\
        • `/ping` - Checks if the bot is responsive.\n\
        • `/help` - Shows this help message.";

        ctx.say(help_text).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
