//! Membership detection and participation toggles.

use super::context::AppContext;
use super::profile::{Actor, ensure_user};
use super::store;
use crate::entities::{chat, membership, user};
use crate::errors::Result;
use sea_orm::{ColumnTrait, Condition, DatabaseConnection, Set};

/// Creates the membership for the pair or refreshes its last-seen time.
pub async fn touch(db: &DatabaseConnection, chat_id: i64, user_id: i64) -> Option<membership::Model> {
    let now = chrono::Local::now().naive_local();
    if let Some(mut existing) = store::get_membership(db, chat_id, user_id).await {
        existing.updated_at = now;
        return store::update(db, existing).await;
    }

    let created = store::create(
        db,
        membership::ActiveModel {
            chat_id: Set(chat_id),
            user_id: Set(user_id),
            status: Set(true),
            updated_at: Set(now),
            ..Default::default()
        },
    )
    .await;
    if created.is_some() {
        tracing::info!("User {user_id} joined chat {chat_id}");
    }
    store::get_membership(db, chat_id, user_id).await
}

/// Records that `actor` was seen in the channel, if it is a managed chat.
pub async fn record_presence(
    app: &AppContext,
    channel_id: i64,
    actor: &Actor,
) -> Result<Option<membership::Model>> {
    let Some(chat) = store::get_chat_by_external(&app.db, channel_id).await else {
        return Ok(None);
    };
    let user = ensure_user(&app.db, actor).await?;
    Ok(touch(&app.db, chat.id, user.id).await)
}

/// Checks every active chat for `user` and refreshes the memberships found.
///
/// Returns the number of chats the user is in.
pub async fn sync_user_chats(app: &AppContext, user: &user::Model) -> usize {
    let chats: Vec<chat::Model> = store::get_many(
        &app.db,
        Condition::all().add(chat::Column::Status.eq(true)),
    )
    .await;

    let mut found = 0;
    for chat in chats {
        match app.messenger.is_member(chat.external_id, user.external_id).await {
            Ok(true) => {
                if touch(&app.db, chat.id, user.id).await.is_some() {
                    found += 1;
                }
            }
            Ok(false) => {}
            Err(e) => tracing::warn!("Membership check in chat {} failed: {e}", chat.id),
        }
    }
    found
}

/// Flips the participation flag.
pub async fn toggle(db: &DatabaseConnection, membership_id: i64) -> Option<membership::Model> {
    let mut member: membership::Model = store::get_by_id(db, membership_id).await?;
    member.status = !member.status;
    store::update(db, member).await
}
