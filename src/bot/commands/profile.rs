//! Profile commands - `/start`, `/phone` and `/birthday`.
//!
//! These are open to every user. Each one registers the caller on first use.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, actor_of},
        core::{
            membership, menu,
            panel::Recipient,
            profile::{self, ensure_user},
        },
        errors::{Error, Result},
    };
    use poise::CreateReply;

    /// Opens your menu in direct messages.
    ///
    /// Also checks every managed chat for you, so the groups you are in show
    /// up in birthday collections right away.
    #[poise::command(slash_command, prefix_command)]
    pub async fn start(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let app = &ctx.data().app;
        let actor = actor_of(ctx.author());
        let user = ensure_user(&app.db, &actor).await?;
        ctx.defer_ephemeral().await?;

        let chats = membership::sync_user_chats(app, &user).await;
        tracing::info!("User {} opened the menu, found in {chats} chat(s)", user.id);

        let panel = menu::main_menu(&user, app.operator_id());
        app.messenger
            .send_panel(Recipient::User(user.external_id), &panel)
            .await?;

        let mut reply = format!("📬 Your menu is waiting in direct messages. Chats found: {chats}.");
        if user.birthday.is_none() {
            reply.push_str("\n🎂 Tell me your birthday with `/birthday`.");
        }
        if user.phone_number.is_none() {
            reply.push_str("\n📱 Share your phone number with `/phone`.");
        }
        ctx.send(CreateReply::default().content(reply).ephemeral(true))
            .await?;
        Ok(())
    }

    /// Saves your phone number so admins can find you.
    #[poise::command(slash_command, prefix_command)]
    pub async fn phone(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Phone number with country code"] number: String,
    ) -> Result<()> {
        let app = &ctx.data().app;
        let user = profile::set_phone(&app.db, &actor_of(ctx.author()), &number).await?;
        ctx.send(
            CreateReply::default()
                .content(format!(
                    "✅ Phone number saved: {}",
                    user.phone_number.unwrap_or_default()
                ))
                .ephemeral(true),
        )
        .await?;
        Ok(())
    }

    /// Saves your birthday.
    #[poise::command(slash_command, prefix_command)]
    pub async fn birthday(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Your birthday, YYYY-MM-DD or DD.MM.YYYY"] date: String,
    ) -> Result<()> {
        let app = &ctx.data().app;
        let user = profile::set_birthday(&app.db, &actor_of(ctx.author()), &date).await?;
        let saved = user
            .birthday
            .map(|d| d.format("%d.%m.%Y").to_string())
            .unwrap_or_default();
        ctx.send(
            CreateReply::default()
                .content(format!("🎂 Birthday saved: {saved}"))
                .ephemeral(true),
        )
        .await?;
        Ok(())
    }
}

pub use inner::*;
