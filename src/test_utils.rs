//! Shared test utilities for `GiftBuddy`.
//!
//! This module provides an in-memory database, collaborator doubles and
//! factories for test entities with sensible defaults.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use crate::{
    ai::ContentGenerator,
    config::settings::AppConfig,
    core::context::AppContext,
    core::panel::{MessageRef, Messenger, Panel, Recipient},
    entities::{chat, membership, user},
    errors::{Error, Result},
};
use async_trait::async_trait;
use chrono::NaiveDate;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

/// Operator id used by [`test_context`].
pub const TEST_OPERATOR_ID: i64 = 4242;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all database tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Routes `tracing` output to the test harness. Safe to call repeatedly.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Builds a context around the doubles with the default settings and
/// [`TEST_OPERATOR_ID`] as operator.
pub fn test_context(
    db: DatabaseConnection,
    messenger: Arc<RecordingMessenger>,
    ai: Arc<ScriptedAi>,
) -> AppContext {
    let mut config = AppConfig::default();
    config.bot.operator_id = TEST_OPERATOR_ID;
    AppContext::new(db, messenger, ai, config)
}

/// One call made on a [`RecordingMessenger`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessengerCall {
    /// `send_panel`
    Send {
        /// Destination
        to: Recipient,
        /// Content
        panel: Panel,
    },
    /// `edit_panel`
    Edit {
        /// Edited message
        at: MessageRef,
        /// New content
        panel: Panel,
    },
    /// `delete_message`
    Delete {
        /// Deleted message
        at: MessageRef,
    },
}

/// Messenger double that records every call.
///
/// Everyone is a member of every channel unless [`Self::set_member`] says
/// otherwise.
#[derive(Debug, Default)]
pub struct RecordingMessenger {
    calls: Mutex<Vec<MessengerCall>>,
    next_id: AtomicI64,
    fail_edits: AtomicBool,
    fail_titles: AtomicBool,
    failing_recipients: Mutex<HashSet<Recipient>>,
    membership: Mutex<HashMap<(i64, i64), bool>>,
}

impl RecordingMessenger {
    /// Fresh double with no recorded calls.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call so far, in order.
    pub fn calls(&self) -> Vec<MessengerCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Panels sent to `to`.
    pub fn sent_to(&self, to: Recipient) -> Vec<Panel> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                MessengerCall::Send { to: dest, panel } if dest == to => Some(panel),
                _ => None,
            })
            .collect()
    }

    /// Every sent panel with its destination.
    pub fn sent(&self) -> Vec<(Recipient, Panel)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                MessengerCall::Send { to, panel } => Some((to, panel)),
                _ => None,
            })
            .collect()
    }

    /// Panels written by successful edits.
    pub fn edits(&self) -> Vec<Panel> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                MessengerCall::Edit { panel, .. } => Some(panel),
                _ => None,
            })
            .collect()
    }

    /// Deleted messages.
    pub fn deleted(&self) -> Vec<MessageRef> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                MessengerCall::Delete { at } => Some(at),
                _ => None,
            })
            .collect()
    }

    /// Makes every edit fail.
    pub fn fail_edits(&self, fail: bool) {
        self.fail_edits.store(fail, Ordering::SeqCst);
    }

    /// Makes title lookups fail.
    pub fn fail_titles(&self, fail: bool) {
        self.fail_titles.store(fail, Ordering::SeqCst);
    }

    /// Makes sends to `to` fail.
    pub fn fail_sends_to(&self, to: Recipient) {
        self.failing_recipients.lock().unwrap().insert(to);
    }

    /// Overrides whether `user_id` can see `channel_id`.
    pub fn set_member(&self, channel_id: i64, user_id: i64, member: bool) {
        self.membership
            .lock()
            .unwrap()
            .insert((channel_id, user_id), member);
    }

    fn record(&self, call: MessengerCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_panel(&self, to: Recipient, panel: &Panel) -> Result<MessageRef> {
        if self.failing_recipients.lock().unwrap().contains(&to) {
            return Err(Error::Messenger {
                message: format!("cannot reach {to:?}"),
            });
        }
        self.record(MessengerCall::Send {
            to,
            panel: panel.clone(),
        });
        let channel_id = match to {
            Recipient::User(id) | Recipient::Channel(id) => id,
        };
        Ok(MessageRef {
            channel_id,
            message_id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
        })
    }

    async fn edit_panel(&self, at: MessageRef, panel: &Panel) -> Result<()> {
        if self.fail_edits.load(Ordering::SeqCst) {
            return Err(Error::Messenger {
                message: "message is not modified".to_string(),
            });
        }
        self.record(MessengerCall::Edit {
            at,
            panel: panel.clone(),
        });
        Ok(())
    }

    async fn delete_message(&self, at: MessageRef) -> Result<()> {
        self.record(MessengerCall::Delete { at });
        Ok(())
    }

    async fn is_member(&self, channel_id: i64, user_id: i64) -> Result<bool> {
        Ok(self
            .membership
            .lock()
            .unwrap()
            .get(&(channel_id, user_id))
            .copied()
            .unwrap_or(true))
    }

    async fn chat_title(&self, channel_id: i64) -> Result<String> {
        if self.fail_titles.load(Ordering::SeqCst) {
            return Err(Error::Messenger {
                message: "unknown channel".to_string(),
            });
        }
        Ok(format!("Group {channel_id}"))
    }
}

/// AI double returning fixed answers, or failing when none is set.
#[derive(Debug, Default)]
pub struct ScriptedAi {
    /// Text answer
    pub text: Option<String>,
    /// Image URL answer
    pub image: Option<String>,
}

impl ScriptedAi {
    /// Double that always fails, exercising the fallbacks.
    pub fn failing() -> Self {
        Self::default()
    }

    /// Double that answers every prompt.
    pub fn answering(text: &str, image: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            image: Some(image.to_string()),
        }
    }
}

#[async_trait]
impl ContentGenerator for ScriptedAi {
    async fn generate_text(&self, _prompt: &str) -> Result<String> {
        self.text.clone().ok_or_else(|| Error::Ai {
            message: "scripted failure".to_string(),
        })
    }

    async fn generate_image(&self, _prompt: &str) -> Result<String> {
        self.image.clone().ok_or_else(|| Error::Ai {
            message: "scripted failure".to_string(),
        })
    }
}

/// Creates a user with sensible defaults.
///
/// # Defaults
/// * `role`: "none"
/// * `phone_number`: "+38050" followed by the external id
/// * `birthday`: None
pub async fn create_test_user(
    db: &DatabaseConnection,
    external_id: i64,
    first_name: &str,
) -> Result<user::Model> {
    user::ActiveModel {
        external_id: Set(external_id),
        first_name: Set(first_name.to_string()),
        username: Set(Some(first_name.to_lowercase())),
        phone_number: Set(Some(format!("+38050{external_id}"))),
        birthday: Set(None),
        role: Set("none".to_string()),
        created_at: Set(chrono::Local::now().naive_local()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Creates a user with a birthday.
pub async fn create_birthday_user(
    db: &DatabaseConnection,
    external_id: i64,
    first_name: &str,
    birthday: NaiveDate,
) -> Result<user::Model> {
    let user = create_test_user(db, external_id, first_name).await?;
    let mut active: user::ActiveModel = user.into();
    active.birthday = Set(Some(birthday));
    active.update(db).await.map_err(Into::into)
}

/// Creates an admin user.
pub async fn create_test_admin(
    db: &DatabaseConnection,
    external_id: i64,
    first_name: &str,
) -> Result<user::Model> {
    let user = create_test_user(db, external_id, first_name).await?;
    let mut active: user::ActiveModel = user.into();
    active.role = Set("admin".to_string());
    active.update(db).await.map_err(Into::into)
}

/// Creates an active chat owned by `owner_id`.
///
/// # Defaults
/// * `card_number`: "4000 0000 0000 0002"
/// * `status`: true
pub async fn create_test_chat(
    db: &DatabaseConnection,
    external_id: i64,
    owner_id: i64,
) -> Result<chat::Model> {
    chat::ActiveModel {
        external_id: Set(external_id),
        owner_id: Set(owner_id),
        card_number: Set("4000 0000 0000 0002".to_string()),
        status: Set(true),
        created_at: Set(chrono::Local::now().naive_local()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Adds `user_id` to `chat_id` as a participating member.
pub async fn add_member(
    db: &DatabaseConnection,
    chat_id: i64,
    user_id: i64,
) -> Result<membership::Model> {
    membership::ActiveModel {
        chat_id: Set(chat_id),
        user_id: Set(user_id),
        status: Set(true),
        updated_at: Set(chrono::Local::now().naive_local()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Calendar date shorthand.
pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}
