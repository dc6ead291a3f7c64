//! Autocomplete handlers for Discord slash command parameters.

use crate::{
    bot::BotData,
    core::{
        role::effective_role,
        scheduler::{CHECK_BIRTHDAY, CHECK_REPORT},
        store,
    },
    entities::chat,
    errors::Error,
};
use poise::serenity_prelude as serenity;
use sea_orm::{ColumnTrait, Condition};

/// Suggests the scheduler task titles.
#[must_use]
pub async fn autocomplete_task_title(
    _ctx: poise::Context<'_, BotData, Error>,
    partial: &str,
) -> Vec<String> {
    let partial_lower = partial.to_lowercase();
    [CHECK_BIRTHDAY, CHECK_REPORT]
        .iter()
        .filter(|title| title.contains(&partial_lower))
        .map(|&title| title.to_string())
        .collect()
}

/// Suggests the chats the caller manages. Super admins see every chat.
pub async fn autocomplete_chat_id(
    ctx: poise::Context<'_, BotData, Error>,
    partial: &str,
) -> Vec<serenity::AutocompleteChoice> {
    let app = &ctx.data().app;
    let external_id = crate::bot::messenger::to_db_id(ctx.author().id.get());
    let Some(caller) = store::get_user_by_external(&app.db, external_id).await else {
        return Vec::new();
    };

    let mut condition = Condition::all();
    if !effective_role(&caller, app.operator_id()).is_super() {
        condition = condition.add(chat::Column::OwnerId.eq(caller.id));
    }
    let chats: Vec<chat::Model> = store::get_many(&app.db, condition).await;

    chats
        .into_iter()
        .filter(|c| c.id.to_string().starts_with(partial))
        .take(25) // Discord autocomplete limit
        .map(|c| {
            let card_tail = c
                .card_number
                .get(c.card_number.len().saturating_sub(4)..)
                .unwrap_or_default();
            serenity::AutocompleteChoice::new(format!("Chat {} (card …{card_tail})", c.id), c.id)
        })
        .collect()
}
