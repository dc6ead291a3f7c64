//! Chat management - Registering groups and the admin commands behind them.
//!
//! Every function re-checks that the caller may manage the chat. Failures
//! are returned as [`Error::InvalidInput`] with a message fit for the user.

use super::context::AppContext;
use super::intent::{AdminCommand, Scope};
use super::panel::{Button, Panel, Recipient};
use super::profile::find_by_phone;
use super::role::{Role, effective_role};
use super::store::{self, NewEvent};
use crate::entities::{chat, event, user};
use crate::errors::{Error, Result};
use chrono::NaiveDate;
use sea_orm::Set;

/// Normalises a 16-digit card number to groups of four.
pub fn normalize_card(raw: &str) -> Result<String> {
    let digits: String = raw.chars().filter(|c| !matches!(c, ' ' | '-')).collect();
    if digits.len() != 16 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(Error::invalid("A card number must have 16 digits"));
    }
    let groups: Vec<&str> = (0..4).map(|i| &digits[i * 4..i * 4 + 4]).collect();
    Ok(groups.join(" "))
}

/// Loads a chat the caller may manage.
pub async fn managed_chat(app: &AppContext, caller: &user::Model, chat_id: i64) -> Result<chat::Model> {
    let chat: chat::Model = store::get_by_id(&app.db, chat_id)
        .await
        .ok_or(Error::NotFound { entity: "chat", id: chat_id })?;
    if effective_role(caller, app.operator_id()).is_super() || chat.owner_id == caller.id {
        Ok(chat)
    } else {
        Err(Error::invalid("You do not manage this chat"))
    }
}

/// Registers a channel as a managed chat owned by `caller` (super admins only).
pub async fn register_chat(
    app: &AppContext,
    caller: &user::Model,
    channel_id: i64,
    card: &str,
) -> Result<chat::Model> {
    if !effective_role(caller, app.operator_id()).is_super() {
        return Err(Error::invalid("Only super admins can add chats"));
    }
    let card_number = normalize_card(card)?;
    if store::get_chat_by_external(&app.db, channel_id).await.is_some() {
        return Err(Error::invalid("This chat is already registered"));
    }
    if !app.messenger.is_member(channel_id, caller.external_id).await? {
        return Err(Error::invalid("You or the bot cannot access this chat"));
    }

    let id = store::create(
        &app.db,
        chat::ActiveModel {
            external_id: Set(channel_id),
            owner_id: Set(caller.id),
            card_number: Set(card_number),
            status: Set(true),
            created_at: Set(chrono::Local::now().naive_local()),
            ..Default::default()
        },
    )
    .await
    .ok_or_else(|| Error::persistence("create(chat)"))?;
    tracing::info!("Chat {id} (channel {channel_id}) registered by user {}", caller.id);
    store::get_by_id(&app.db, id)
        .await
        .ok_or_else(|| Error::persistence("get(chat)"))
}

/// Changes the payment card of a chat.
pub async fn set_card(
    app: &AppContext,
    caller: &user::Model,
    chat_id: i64,
    card: &str,
) -> Result<chat::Model> {
    let mut chat = managed_chat(app, caller, chat_id).await?;
    chat.card_number = normalize_card(card)?;
    store::update(&app.db, chat)
        .await
        .ok_or_else(|| Error::persistence("update(chat)"))
}

/// Hands a chat over to the registered user with `phone`.
///
/// Both the caller and the new admin must currently be in the chat. The new
/// admin is promoted and told about it by direct message.
pub async fn change_admin(
    app: &AppContext,
    caller: &user::Model,
    chat_id: i64,
    phone: &str,
) -> Result<user::Model> {
    let mut chat = managed_chat(app, caller, chat_id).await?;
    if !app.messenger.is_member(chat.external_id, caller.external_id).await? {
        return Err(Error::invalid("You or the bot cannot access this chat"));
    }
    let Some(mut new_admin) = find_by_phone(&app.db, phone).await? else {
        return Err(Error::invalid("No registered user has this phone number"));
    };
    if !app.messenger.is_member(chat.external_id, new_admin.external_id).await? {
        return Err(Error::invalid("No user with this phone number is in the chat"));
    }

    if Role::parse(&new_admin.role) == Role::None {
        new_admin.role = Role::Admin.as_str().to_string();
        new_admin = store::update(&app.db, new_admin)
            .await
            .ok_or_else(|| Error::persistence("update(user)"))?;
    }
    chat.owner_id = new_admin.id;
    let chat = store::update(&app.db, chat)
        .await
        .ok_or_else(|| Error::persistence("update(chat)"))?;
    tracing::info!("Chat {} handed over to user {}", chat.id, new_admin.id);

    let welcome = Panel::text(format!(
        "🎉 Congratulations, {}! You are now the admin of chat {}.\n\
         Set your card with `/card {} <16 digits>` to receive contributions.",
        new_admin.first_name, chat.id, chat.id
    ))
    .button(Button::token(
        "👥 My groups",
        Scope::Admin.wrap(AdminCommand::MyGroups { page: 1 }),
    ));
    if let Err(e) = app
        .messenger
        .send_panel(Recipient::User(new_admin.external_id), &welcome)
        .await
    {
        tracing::warn!("Could not notify new admin {}: {e}", new_admin.id);
    }
    Ok(new_admin)
}

async fn managed_event(app: &AppContext, caller: &user::Model, event_id: i64) -> Result<event::Model> {
    let event: event::Model = store::get_by_id(&app.db, event_id)
        .await
        .ok_or(Error::NotFound { entity: "event", id: event_id })?;
    managed_chat(app, caller, event.chat_id).await?;
    Ok(event)
}

/// Overrides the amount asked per participant for an event.
pub async fn set_amount(
    app: &AppContext,
    caller: &user::Model,
    event_id: i64,
    amount: i64,
) -> Result<event::Model> {
    if amount <= 0 {
        return Err(Error::invalid("The amount must be greater than zero"));
    }
    let mut event = managed_event(app, caller, event_id).await?;
    event.amount = amount;
    store::update(&app.db, event)
        .await
        .ok_or_else(|| Error::persistence("update(event)"))
}

/// Opens an event for someone who may not use the bot.
///
/// If `phone` belongs to a registered user the event is linked to them.
pub async fn create_event(
    app: &AppContext,
    caller: &user::Model,
    chat_id: i64,
    name: &str,
    date_event: NaiveDate,
    phone: Option<&str>,
) -> Result<event::Model> {
    let chat = managed_chat(app, caller, chat_id).await?;
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::invalid("The name cannot be empty"));
    }

    let (label, subject) = match phone {
        Some(raw) => {
            let subject = find_by_phone(&app.db, raw).await?;
            let phone = super::profile::normalize_phone(raw)?;
            (format!("{name} {phone}"), subject)
        }
        None => (name.to_string(), None),
    };

    store::ensure_event(
        &app.db,
        NewEvent {
            user_id: subject.map(|u| u.id),
            chat_id: chat.id,
            label,
            date_event,
            amount: app.config.collection.default_amount,
        },
    )
    .await
    .ok_or_else(|| Error::persistence("create(event)"))
}
