//! Admin commands - chat registration, cards, hand-over, events and schedules.
//!
//! Permission checks live in the core functions; the commands only parse
//! arguments and report the result.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, actor_of, handlers::autocomplete, messenger::to_db_id},
        core::{chat, profile, profile::ensure_user, role::effective_role, scheduler},
        errors::{Error, Result},
    };
    use poise::serenity_prelude as serenity;

    /// Registers a channel as a managed chat (super admins only).
    #[poise::command(slash_command, guild_only)]
    pub async fn add_chat(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Channel where the group gathers"] channel: serenity::GuildChannel,
        #[description = "Card number receiving contributions"] card: String,
    ) -> Result<()> {
        let app = &ctx.data().app;
        let caller = ensure_user(&app.db, &actor_of(ctx.author())).await?;
        let chat = chat::register_chat(app, &caller, to_db_id(channel.id.get()), &card).await?;
        ctx.say(format!(
            "✅ <#{}> is now managed as chat {} (card {})",
            channel.id, chat.id, chat.card_number
        ))
        .await?;
        Ok(())
    }

    /// Sets the card that receives contributions for a chat.
    #[poise::command(slash_command, prefix_command)]
    pub async fn card(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Chat to update"]
        #[autocomplete = "autocomplete::autocomplete_chat_id"]
        chat_id: i64,
        #[description = "16-digit card number"] number: String,
    ) -> Result<()> {
        let app = &ctx.data().app;
        let caller = ensure_user(&app.db, &actor_of(ctx.author())).await?;
        let chat = chat::set_card(app, &caller, chat_id, &number).await?;
        ctx.say(format!("✅ Card of chat {} set to {}", chat.id, chat.card_number))
            .await?;
        Ok(())
    }

    /// Hands a chat over to another member, found by phone number.
    #[poise::command(slash_command, prefix_command)]
    pub async fn change_admin(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Chat to hand over"]
        #[autocomplete = "autocomplete::autocomplete_chat_id"]
        chat_id: i64,
        #[description = "Phone number of the new admin"] phone: String,
    ) -> Result<()> {
        let app = &ctx.data().app;
        let caller = ensure_user(&app.db, &actor_of(ctx.author())).await?;
        let heir = chat::change_admin(app, &caller, chat_id, &phone).await?;
        ctx.say(format!("✅ {} is now the admin of chat {chat_id}", heir.first_name))
            .await?;
        Ok(())
    }

    /// Changes the amount asked from each participant of an event.
    #[poise::command(slash_command, prefix_command)]
    pub async fn amount(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Event id, shown on the event panel"] event_id: i64,
        #[description = "Amount per participant"] amount: i64,
    ) -> Result<()> {
        let app = &ctx.data().app;
        let caller = ensure_user(&app.db, &actor_of(ctx.author())).await?;
        let event = chat::set_amount(app, &caller, event_id, amount).await?;
        ctx.say(format!("✅ {} now asks {} per person", event.label, event.amount))
            .await?;
        Ok(())
    }

    /// Opens a collection for someone who does not use the bot.
    #[poise::command(slash_command, prefix_command)]
    pub async fn create_event(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Chat collecting the money"]
        #[autocomplete = "autocomplete::autocomplete_chat_id"]
        chat_id: i64,
        #[description = "Name of the person celebrating"] name: String,
        #[description = "Celebration date, YYYY-MM-DD or DD.MM.YYYY"] date: String,
        #[description = "Their phone number, if known"] phone: Option<String>,
    ) -> Result<()> {
        let app = &ctx.data().app;
        let caller = ensure_user(&app.db, &actor_of(ctx.author())).await?;
        let date_event = profile::parse_birthday(&date)?;
        let event =
            chat::create_event(app, &caller, chat_id, &name, date_event, phone.as_deref()).await?;
        ctx.say(format!(
            "🎁 Event {} opened: {} on {}",
            event.id,
            event.label,
            event.date_event.format("%d.%m.%Y")
        ))
        .await?;
        Ok(())
    }

    /// Changes when a daily task runs (super admins only).
    #[poise::command(slash_command, prefix_command)]
    pub async fn schedule(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Task to reschedule"]
        #[autocomplete = "autocomplete::autocomplete_task_title"]
        task: String,
        #[description = "Time of day, HH:MM"] time: String,
        #[description = "Days ahead to look for birthdays"] lookahead: Option<u32>,
    ) -> Result<()> {
        let app = &ctx.data().app;
        let caller = ensure_user(&app.db, &actor_of(ctx.author())).await?;
        if !effective_role(&caller, app.operator_id()).is_super() {
            return Err(Error::invalid("Only super admins can change schedules"));
        }
        let row = scheduler::upsert_trigger(&app.db, &task, &time, lookahead).await?;
        ctx.say(format!(
            "⏰ {} now runs at {}",
            row.title,
            row.trigger_time.unwrap_or_default()
        ))
        .await?;
        Ok(())
    }
}

pub use inner::*;
