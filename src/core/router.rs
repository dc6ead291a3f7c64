//! Token router - Turns a button press into an action.
//!
//! The actor is re-read from the database on every press and privileged
//! intents re-check the current role, so a button rendered for an admin
//! stops working the moment that admin is demoted. Plain admins may only
//! act on chats they own; super admins and the operator act on any chat.

use super::context::AppContext;
use super::intent::{AdminCommand, ChatAction, Intent, Scope, SuperCommand, UserCommand};
use super::membership;
use super::menu;
use super::panel::{MessageRef, Panel, Recipient, present};
use super::profile::{Actor, ensure_user};
use super::role::{EffectiveRole, effective_role};
use super::store;
use crate::entities::{chat, contribution_report, event, membership as membership_entity, user};
use crate::errors::Result;

/// What the platform layer should answer to the interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Not a router token; nothing happened
    Ignored,
    /// Handled; acknowledge silently
    Acknowledged,
    /// Show a short notice to the actor only
    Alert(String),
}

const ACCESS_DENIED: &str = "⛔ You do not have access to this menu anymore.";
const GONE: &str = "This item no longer exists.";

/// Handles one button press carrying `token`, pressed on message `origin`.
pub async fn route(
    app: &AppContext,
    actor: &Actor,
    origin: MessageRef,
    token: &str,
) -> Result<Outcome> {
    let Ok(intent) = token.parse::<Intent>() else {
        tracing::debug!("Ignoring token {token:?}");
        return Ok(Outcome::Ignored);
    };
    let user = ensure_user(&app.db, actor).await?;
    let role = effective_role(&user, app.operator_id());
    tracing::debug!("User {} ({role:?}) pressed {intent}", user.id);

    match intent {
        Intent::Dismiss => {
            discard(app, origin).await;
            Ok(Outcome::Acknowledged)
        }
        Intent::Home => {
            discard(app, origin).await;
            let panel = menu::main_menu(&user, app.operator_id());
            app.messenger
                .send_panel(Recipient::Channel(origin.channel_id), &panel)
                .await?;
            Ok(Outcome::Acknowledged)
        }
        Intent::Back => show(app, origin, &menu::main_menu(&user, app.operator_id())).await,
        Intent::User(command) => user_command(app, &user, origin, command).await,
        Intent::Admin(command) => {
            if !role.is_admin() {
                return deny(app, origin).await;
            }
            admin_command(app, &user, role, origin, command, Scope::Admin).await
        }
        Intent::Super(command) => {
            if !role.is_super() {
                return deny(app, origin).await;
            }
            match command {
                SuperCommand::ManageChats { page } => {
                    show(app, origin, &menu::manage_chats(app, page).await?).await
                }
                SuperCommand::AddChat => show(app, origin, &menu::add_chat_help()).await,
                SuperCommand::Act(command) => {
                    admin_command(app, &user, role, origin, command, Scope::Super).await
                }
            }
        }
    }
}

async fn user_command(
    app: &AppContext,
    user: &user::Model,
    origin: MessageRef,
    command: UserCommand,
) -> Result<Outcome> {
    let panel = match command {
        UserCommand::ChangeBirthday => menu::change_birthday(user),
        UserCommand::Calendar { page } => menu::calendar(app, user, page).await?,
        UserCommand::MyContributions => menu::my_contributions(app, user).await?,
    };
    show(app, origin, &panel).await
}

/// Chat-scoped command after the role gate passed.
async fn admin_command(
    app: &AppContext,
    user: &user::Model,
    role: EffectiveRole,
    origin: MessageRef,
    command: AdminCommand,
    scope: Scope,
) -> Result<Outcome> {
    let panel = match command {
        AdminCommand::MyGroups { page } => menu::my_groups(app, user, page).await?,
        AdminCommand::ChatSettings { chat_id } => {
            let Some(chat) = chat_in_reach(app, user, role, chat_id).await else {
                return deny(app, origin).await;
            };
            menu::chat_settings(app, &chat, scope).await?
        }
        AdminCommand::ChatAction {
            action,
            chat_id,
            page,
        } => {
            let Some(chat) = chat_in_reach(app, user, role, chat_id).await else {
                return deny(app, origin).await;
            };
            menu::chat_action(app, &chat, action, page, scope).await?
        }
        AdminCommand::EventPanel { event_id } => {
            let Some(event) = get::<event::Model>(app, event_id).await else {
                return Ok(Outcome::Alert(GONE.to_string()));
            };
            if chat_in_reach(app, user, role, event.chat_id).await.is_none() {
                return deny(app, origin).await;
            }
            menu::event_panel(app, &event, scope).await?
        }
        AdminCommand::EventAmount { event_id } => {
            let Some(event) = get::<event::Model>(app, event_id).await else {
                return Ok(Outcome::Alert(GONE.to_string()));
            };
            if chat_in_reach(app, user, role, event.chat_id).await.is_none() {
                return deny(app, origin).await;
            }
            menu::event_amount_help(&event, scope)
        }
        AdminCommand::ToggleEvent { event_id } => {
            let Some(mut event) = get::<event::Model>(app, event_id).await else {
                return Ok(Outcome::Alert(GONE.to_string()));
            };
            if chat_in_reach(app, user, role, event.chat_id).await.is_none() {
                return deny(app, origin).await;
            }
            event.status = !event.status;
            let Some(event) = store::update(&app.db, event).await else {
                return Ok(Outcome::Alert(SAVE_FAILED.to_string()));
            };
            tracing::info!("Event {} is now {}", event.id, if event.status { "open" } else { "closed" });
            menu::event_panel(app, &event, scope).await?
        }
        AdminCommand::ToggleMembership {
            membership_id,
            page,
        } => {
            let Some(member) = get::<membership_entity::Model>(app, membership_id).await else {
                return Ok(Outcome::Alert(GONE.to_string()));
            };
            let Some(chat) = chat_in_reach(app, user, role, member.chat_id).await else {
                return deny(app, origin).await;
            };
            if membership::toggle(&app.db, member.id).await.is_none() {
                return Ok(Outcome::Alert(SAVE_FAILED.to_string()));
            }
            menu::chat_action(app, &chat, ChatAction::Members, page, scope).await?
        }
        AdminCommand::TogglePaid { report_id, page } => {
            let Some(mut report) = get::<contribution_report::Model>(app, report_id).await else {
                return Ok(Outcome::Alert(GONE.to_string()));
            };
            let Some(chat) = chat_in_reach(app, user, role, report.chat_id).await else {
                return deny(app, origin).await;
            };
            report.status = !report.status;
            if store::update(&app.db, report).await.is_none() {
                return Ok(Outcome::Alert(SAVE_FAILED.to_string()));
            }
            menu::chat_action(app, &chat, ChatAction::Report, page, scope).await?
        }
    };
    show(app, origin, &panel).await
}

const SAVE_FAILED: &str = "Could not save the change, please try again.";

async fn get<M>(app: &AppContext, id: i64) -> Option<M>
where
    M: store::Record,
    M::Entity: sea_orm::EntityTrait<Model = M>,
{
    store::get_by_id(&app.db, id).await
}

/// The chat, if it exists and the actor may manage it.
async fn chat_in_reach(
    app: &AppContext,
    user: &user::Model,
    role: EffectiveRole,
    chat_id: i64,
) -> Option<chat::Model> {
    let chat: chat::Model = store::get_by_id(&app.db, chat_id).await?;
    if role.is_super() || chat.owner_id == user.id {
        Some(chat)
    } else {
        tracing::warn!("User {} tried to manage chat {chat_id} they do not own", user.id);
        None
    }
}

async fn show(app: &AppContext, origin: MessageRef, panel: &Panel) -> Result<Outcome> {
    present(app.messenger.as_ref(), origin, panel).await?;
    Ok(Outcome::Acknowledged)
}

async fn deny(app: &AppContext, origin: MessageRef) -> Result<Outcome> {
    discard(app, origin).await;
    Ok(Outcome::Alert(ACCESS_DENIED.to_string()))
}

async fn discard(app: &AppContext, origin: MessageRef) {
    if let Err(e) = app.messenger.delete_message(origin).await {
        tracing::debug!("Could not delete message {}: {e}", origin.message_id);
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::store::{NewEvent, ensure_event, ensure_report};
    use crate::test_utils::{
        MessengerCall, RecordingMessenger, ScriptedAi, TEST_OPERATOR_ID, create_test_admin,
        create_test_chat, create_test_user, date, setup_test_db, test_context,
    };
    use std::sync::Arc;

    fn origin() -> MessageRef {
        MessageRef {
            channel_id: 77,
            message_id: 700,
        }
    }

    fn actor_for(user: &user::Model) -> Actor {
        Actor {
            external_id: user.external_id,
            first_name: user.first_name.clone(),
            username: user.username.clone(),
        }
    }

    #[tokio::test]
    async fn test_dismiss_deletes_origin() -> Result<()> {
        let db = setup_test_db().await?;
        let messenger = Arc::new(RecordingMessenger::new());
        let app = test_context(db, Arc::clone(&messenger), Arc::new(ScriptedAi::failing()));
        let actor = Actor {
            external_id: 5,
            first_name: "Ann".to_string(),
            username: None,
        };

        let outcome = route(&app, &actor, origin(), "0:x").await?;
        assert_eq!(outcome, Outcome::Acknowledged);
        assert_eq!(messenger.calls(), vec![MessengerCall::Delete { at: origin() }]);
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_token_is_silently_ignored() -> Result<()> {
        let db = setup_test_db().await?;
        let messenger = Arc::new(RecordingMessenger::new());
        let app = test_context(db, Arc::clone(&messenger), Arc::new(ScriptedAi::failing()));
        let actor = Actor {
            external_id: 5,
            first_name: "Ann".to_string(),
            username: None,
        };

        for token in ["hello", "0:admin:nope", "0:super:list:x"] {
            assert_eq!(route(&app, &actor, origin(), token).await?, Outcome::Ignored);
        }
        assert!(messenger.calls().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_home_sends_fresh_menu() -> Result<()> {
        let db = setup_test_db().await?;
        let messenger = Arc::new(RecordingMessenger::new());
        let app = test_context(db, Arc::clone(&messenger), Arc::new(ScriptedAi::failing()));
        let actor = Actor {
            external_id: 5,
            first_name: "Ann".to_string(),
            username: None,
        };

        route(&app, &actor, origin(), "0:m").await?;
        assert_eq!(messenger.deleted(), vec![origin()]);
        let sent = messenger.sent_to(Recipient::Channel(77));
        assert_eq!(sent.len(), 1);
        assert!(sent[0].text.starts_with("👋 Hello, Ann!"));
        Ok(())
    }

    #[tokio::test]
    async fn test_demoted_admin_cannot_use_old_buttons() -> Result<()> {
        let db = setup_test_db().await?;
        let messenger = Arc::new(RecordingMessenger::new());
        let admin = create_test_admin(&db, 1, "Admin").await?;
        let chat = create_test_chat(&db, 100, admin.id).await?;

        let mut demoted = admin.clone();
        demoted.role = "none".to_string();
        store::update(&db, demoted).await.unwrap();

        let app = test_context(db, Arc::clone(&messenger), Arc::new(ScriptedAi::failing()));
        let token = Intent::Admin(AdminCommand::ChatSettings { chat_id: chat.id }).to_string();
        let outcome = route(&app, &actor_for(&admin), origin(), &token).await?;

        assert_eq!(outcome, Outcome::Alert(ACCESS_DENIED.to_string()));
        assert_eq!(messenger.deleted(), vec![origin()]);
        assert!(messenger.edits().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_operator_passes_every_gate() -> Result<()> {
        let db = setup_test_db().await?;
        let messenger = Arc::new(RecordingMessenger::new());
        let owner = create_test_admin(&db, 1, "Owner").await?;
        let operator = create_test_user(&db, TEST_OPERATOR_ID, "Operator").await?;
        let chat = create_test_chat(&db, 100, owner.id).await?;
        let app = test_context(db, Arc::clone(&messenger), Arc::new(ScriptedAi::failing()));

        for intent in [
            Intent::Admin(AdminCommand::ChatSettings { chat_id: chat.id }),
            Intent::Super(SuperCommand::ManageChats { page: 1 }),
            Intent::Super(SuperCommand::Act(AdminCommand::ChatSettings { chat_id: chat.id })),
        ] {
            let outcome = route(&app, &actor_for(&operator), origin(), &intent.to_string()).await?;
            assert_eq!(outcome, Outcome::Acknowledged, "{intent}");
        }
        assert_eq!(messenger.edits().len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_admin_cannot_open_foreign_chat() -> Result<()> {
        let db = setup_test_db().await?;
        let messenger = Arc::new(RecordingMessenger::new());
        let owner = create_test_admin(&db, 1, "Owner").await?;
        let other = create_test_admin(&db, 2, "Other").await?;
        let chat = create_test_chat(&db, 100, owner.id).await?;
        let app = test_context(db, Arc::clone(&messenger), Arc::new(ScriptedAi::failing()));

        let token = Intent::Admin(AdminCommand::ChatSettings { chat_id: chat.id }).to_string();
        let outcome = route(&app, &actor_for(&other), origin(), &token).await?;
        assert!(matches!(outcome, Outcome::Alert(_)));

        let own = route(&app, &actor_for(&owner), origin(), &token).await?;
        assert_eq!(own, Outcome::Acknowledged);
        Ok(())
    }

    #[tokio::test]
    async fn test_toggle_paid_flips_and_rerenders() -> Result<()> {
        let db = setup_test_db().await?;
        let messenger = Arc::new(RecordingMessenger::new());
        let owner = create_test_admin(&db, 1, "Owner").await?;
        let payer = create_test_user(&db, 2, "Bob").await?;
        let chat = create_test_chat(&db, 100, owner.id).await?;
        let event = ensure_event(
            &db,
            NewEvent {
                user_id: Some(owner.id),
                chat_id: chat.id,
                label: "Owner".to_string(),
                date_event: date(2026, 3, 15),
                amount: 500,
            },
        )
        .await
        .unwrap();
        let report = ensure_report(&db, payer.id, chat.id, event.id).await.unwrap();
        let app = test_context(db, Arc::clone(&messenger), Arc::new(ScriptedAi::failing()));

        let token = Intent::Admin(AdminCommand::TogglePaid {
            report_id: report.id,
            page: 0,
        })
        .to_string();
        route(&app, &actor_for(&owner), origin(), &token).await?;

        let stored: contribution_report::Model = store::get_by_id(&app.db, report.id).await.unwrap();
        assert!(stored.status);
        assert!(messenger.edits()[0].text.contains("1/1 paid"));
        Ok(())
    }

    #[tokio::test]
    async fn test_toggle_event_closes_and_reopens() -> Result<()> {
        let db = setup_test_db().await?;
        let messenger = Arc::new(RecordingMessenger::new());
        let owner = create_test_admin(&db, 1, "Owner").await?;
        let chat = create_test_chat(&db, 100, owner.id).await?;
        let event = ensure_event(
            &db,
            NewEvent {
                user_id: None,
                chat_id: chat.id,
                label: "Guest +380501112233".to_string(),
                date_event: date(2026, 6, 1),
                amount: 300,
            },
        )
        .await
        .unwrap();
        let app = test_context(db, Arc::clone(&messenger), Arc::new(ScriptedAi::failing()));
        let token = Intent::Admin(AdminCommand::ToggleEvent { event_id: event.id }).to_string();

        route(&app, &actor_for(&owner), origin(), &token).await?;
        let closed: event::Model = store::get_by_id(&app.db, event.id).await.unwrap();
        assert!(!closed.status);

        route(&app, &actor_for(&owner), origin(), &token).await?;
        let reopened: event::Model = store::get_by_id(&app.db, event.id).await.unwrap();
        assert!(reopened.status);
        Ok(())
    }
}
