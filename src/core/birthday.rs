//! Birthday task engine - The daily job behind the `check_birthday` trigger.
//!
//! For every active chat and every participating member with a birthday the
//! engine computes how many days are left:
//! - today: greet the group and the person
//! - later: open (or reuse) the collection event, send the admin its panel
//!   and, inside the near-term window, ask every other participant for money
//!   unless their contribution is already marked paid
//!
//! Record resolution runs sequentially. Only the sends go to the fan-out
//! group. Every chat, member and recipient is fault-isolated.

use super::context::AppContext;
use super::fanout::{BatchReport, FanOut};
use super::intent::Scope;
use super::menu;
use super::notify;
use super::panel::Recipient;
use super::report;
use super::scheduler::DailyTasks;
use super::store::{self, NewEvent};
use crate::entities::{chat, membership, user};
use crate::errors::{Error, Result};
use async_trait::async_trait;
use chrono::{Datelike, Days, NaiveDate};
use sea_orm::{ColumnTrait, Condition};
use std::sync::Arc;

/// Days from `today` to the next occurrence of `birthday`, if within `lookahead`.
///
/// Only month and day are compared; 29 February matches in leap years only.
pub fn days_until_birthday(today: NaiveDate, birthday: NaiveDate, lookahead: u32) -> Option<u32> {
    (0..=lookahead).find(|&n| {
        today
            .checked_add_days(Days::new(u64::from(n)))
            .is_some_and(|day| day.month() == birthday.month() && day.day() == birthday.day())
    })
}

/// What one engine run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Active chats visited
    pub chats: usize,
    /// Birthday people greeted today
    pub greeted: usize,
    /// Contribution requests queued
    pub asked: usize,
    /// Chats or members skipped because of an error
    pub skipped: usize,
    /// Delivery outcome of the queued notifications
    pub delivery: BatchReport,
}

/// Runs the daily birthday check against the shared context.
#[derive(Debug, Clone)]
pub struct BirthdayEngine {
    app: AppContext,
}

type Participant = (membership::Model, user::Model);

impl BirthdayEngine {
    /// Creates an engine over `app`.
    pub const fn new(app: AppContext) -> Self {
        Self { app }
    }

    /// Runs the check for `today` with a horizon of `lookahead` days.
    pub async fn run(&self, today: NaiveDate, lookahead: u32) -> RunSummary {
        tracing::info!("Birthday check for {today} (lookahead {lookahead} days)");
        let chats: Vec<chat::Model> = store::get_many(
            &self.app.db,
            Condition::all().add(chat::Column::Status.eq(true)),
        )
        .await;

        let mut fanout = FanOut::from_settings(&self.app.config.fanout);
        let mut summary = RunSummary::default();
        for chat in &chats {
            summary.chats += 1;
            self.process_chat(chat, today, lookahead, &mut fanout, &mut summary)
                .await;
        }

        summary.delivery = fanout.finish().await;
        tracing::info!(
            "Birthday check done: {} chats, {} greeted, {} asked, {} skipped, {} sent, {} failed",
            summary.chats,
            summary.greeted,
            summary.asked,
            summary.skipped,
            summary.delivery.sent,
            summary.delivery.failed.len()
        );
        summary
    }

    async fn process_chat(
        &self,
        chat: &chat::Model,
        today: NaiveDate,
        lookahead: u32,
        fanout: &mut FanOut,
        summary: &mut RunSummary,
    ) {
        let participants: Vec<Participant> = store::get_memberships(&self.app.db, chat.id)
            .await
            .into_iter()
            .filter(|(member, _)| member.status)
            .collect();

        for (_, subject) in &participants {
            let Some(birthday) = subject.birthday else {
                continue;
            };
            let Some(offset) = days_until_birthday(today, birthday, lookahead) else {
                continue;
            };

            let result = if offset == 0 {
                self.greet(chat, subject, fanout);
                summary.greeted += 1;
                Ok(())
            } else {
                self.collect(chat, subject, &participants, today, offset, fanout, summary)
                    .await
            };
            if let Err(e) = result {
                tracing::error!("Birthday of user {} in chat {} skipped: {e}", subject.id, chat.id);
                summary.skipped += 1;
            }
        }
    }

    fn greet(&self, chat: &chat::Model, subject: &user::Model, fanout: &mut FanOut) {
        tracing::info!("User {} has a birthday today", subject.id);
        for to in [
            Recipient::Channel(chat.external_id),
            Recipient::User(subject.external_id),
        ] {
            let ai = Arc::clone(&self.app.ai);
            let messenger = Arc::clone(&self.app.messenger);
            let name = subject.first_name.clone();
            fanout.spawn(format!("greeting {name} -> {to:?}"), async move {
                let panel = notify::greeting_panel(ai.as_ref(), &name).await;
                messenger.send_panel(to, &panel).await.map(|_| ())
            });
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn collect(
        &self,
        chat: &chat::Model,
        subject: &user::Model,
        participants: &[Participant],
        today: NaiveDate,
        offset: u32,
        fanout: &mut FanOut,
        summary: &mut RunSummary,
    ) -> Result<()> {
        let date_event = today
            .checked_add_days(Days::new(u64::from(offset)))
            .ok_or_else(|| Error::invalid("birthday date out of range"))?;
        let label = match &subject.phone_number {
            Some(phone) => format!("{} {phone}", subject.first_name),
            None => subject.first_name.clone(),
        };
        let event = store::ensure_event(
            &self.app.db,
            NewEvent {
                user_id: Some(subject.id),
                chat_id: chat.id,
                label,
                date_event,
                amount: self.app.config.collection.default_amount,
            },
        )
        .await
        .ok_or_else(|| Error::persistence("ensure_event"))?;

        if !event.status {
            tracing::debug!("Event {} is closed, nothing to send", event.id);
            return Ok(());
        }

        let owner: user::Model = store::get_by_id(&self.app.db, chat.owner_id)
            .await
            .ok_or(Error::NotFound {
                entity: "user",
                id: chat.owner_id,
            })?;
        let panel = menu::event_panel(&self.app, &event, Scope::Admin).await?;
        let messenger = Arc::clone(&self.app.messenger);
        fanout.spawn(format!("event panel {} -> admin {}", event.id, owner.id), async move {
            messenger
                .send_panel(Recipient::User(owner.external_id), &panel)
                .await
                .map(|_| ())
        });

        if offset > self.app.config.collection.near_term_days {
            return Ok(());
        }

        for (_, recipient) in participants.iter().filter(|(_, u)| u.id != subject.id) {
            let Some(report) =
                store::ensure_report(&self.app.db, recipient.id, chat.id, event.id).await
            else {
                tracing::warn!("No report for user {} on event {}, not asking", recipient.id, event.id);
                summary.skipped += 1;
                continue;
            };
            if report.status {
                continue;
            }

            let ai = Arc::clone(&self.app.ai);
            let messenger = Arc::clone(&self.app.messenger);
            let (event, chat, to) = (event.clone(), chat.clone(), recipient.external_id);
            fanout.spawn(format!("ask user {} for event {}", recipient.id, event.id), async move {
                let panel = notify::ask_panel(ai.as_ref(), &event, &chat, offset).await;
                messenger.send_panel(Recipient::User(to), &panel).await.map(|_| ())
            });
            summary.asked += 1;
        }
        Ok(())
    }
}

#[async_trait]
impl DailyTasks for BirthdayEngine {
    async fn check_birthdays(&self, today: NaiveDate, lookahead: u32) {
        self.run(today, lookahead).await;
    }

    async fn check_reports(&self, today: NaiveDate) {
        report::daily_report(&self.app, today).await;
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::config::settings::AppConfig;
    use crate::entities::{contribution_report, event};
    use crate::test_utils::{
        RecordingMessenger, ScriptedAi, TEST_OPERATOR_ID, add_member, create_birthday_user,
        create_test_admin, create_test_chat, create_test_user, date, init_test_tracing,
        setup_test_db, test_context,
    };

    #[test]
    fn test_days_until_birthday() {
        let today = date(2026, 3, 10);
        assert_eq!(days_until_birthday(today, date(1990, 3, 15), 10), Some(5));
        assert_eq!(days_until_birthday(today, date(1990, 3, 10), 10), Some(0));
        assert_eq!(days_until_birthday(today, date(1990, 3, 21), 10), None);
        assert_eq!(days_until_birthday(today, date(1990, 3, 9), 10), None);
        // Across the new year
        assert_eq!(days_until_birthday(date(2026, 12, 28), date(1990, 1, 2), 10), Some(5));
        // Leap day only in leap years
        assert_eq!(days_until_birthday(date(2027, 2, 25), date(1992, 2, 29), 10), None);
        assert_eq!(days_until_birthday(date(2028, 2, 25), date(1992, 2, 29), 10), Some(4));
    }

    struct Fixture {
        app: AppContext,
        messenger: Arc<RecordingMessenger>,
        owner: user::Model,
        ann: user::Model,
        bob: user::Model,
        chat: chat::Model,
    }

    /// Owner runs chat 100; Ann (birthday 15.03) and Bob take part.
    async fn fixture() -> Result<Fixture> {
        init_test_tracing();
        let db = setup_test_db().await?;
        let owner = create_test_admin(&db, 1, "Owner").await?;
        let ann = create_birthday_user(&db, 2, "Ann", date(1990, 3, 15)).await?;
        let bob = create_test_user(&db, 3, "Bob").await?;
        let chat = create_test_chat(&db, 100, owner.id).await?;
        add_member(&db, chat.id, ann.id).await?;
        add_member(&db, chat.id, bob.id).await?;

        let messenger = Arc::new(RecordingMessenger::new());
        let app = test_context(db, Arc::clone(&messenger), Arc::new(ScriptedAi::failing()));
        Ok(Fixture {
            app,
            messenger,
            owner,
            ann,
            bob,
            chat,
        })
    }

    async fn events(app: &AppContext) -> Vec<event::Model> {
        store::get_many(&app.db, Condition::all()).await
    }

    async fn reports(app: &AppContext) -> Vec<contribution_report::Model> {
        store::get_many(&app.db, Condition::all()).await
    }

    #[tokio::test]
    async fn test_five_days_before_opens_event_and_asks_others() -> Result<()> {
        let f = fixture().await?;
        let engine = BirthdayEngine::new(f.app.clone());

        let summary = engine.run(date(2026, 3, 10), 10).await;

        let events = events(&f.app).await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].user_id, Some(f.ann.id));
        assert_eq!(events[0].chat_id, f.chat.id);
        assert_eq!(events[0].date_event, date(2026, 3, 15));
        assert_eq!(events[0].amount, 500);
        assert!(events[0].status);

        let reports = reports(&f.app).await;
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].user_id, f.bob.id);
        assert!(!reports[0].status);

        assert_eq!(f.messenger.sent_to(Recipient::User(f.bob.external_id)).len(), 1);
        assert!(f.messenger.sent_to(Recipient::User(f.ann.external_id)).is_empty());
        assert_eq!(f.messenger.sent_to(Recipient::User(f.owner.external_id)).len(), 1);
        assert_eq!(summary.asked, 1);
        assert_eq!(summary.delivery.sent, 2);
        assert!(summary.delivery.failed.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_manual_event_after_birthday_does_not_block_collection() -> Result<()> {
        let f = fixture().await?;
        store::ensure_event(
            &f.app.db,
            NewEvent {
                user_id: Some(f.ann.id),
                chat_id: f.chat.id,
                label: "Ann party".to_string(),
                date_event: date(2026, 4, 1),
                amount: 500,
            },
        )
        .await
        .unwrap();
        let engine = BirthdayEngine::new(f.app.clone());

        let summary = engine.run(date(2026, 3, 10), 10).await;

        assert_eq!(summary.skipped, 0);
        assert_eq!(summary.asked, 1);
        let events = events(&f.app).await;
        assert_eq!(events.len(), 2);
        assert!(events.iter().any(|e| e.date_event == date(2026, 3, 15)));
        assert_eq!(f.messenger.sent_to(Recipient::User(f.bob.external_id)).len(), 1);
        Ok(())
    }

    /// AI whose calls never return.
    struct StalledAi;

    #[async_trait]
    impl crate::ai::ContentGenerator for StalledAi {
        async fn generate_text(&self, _prompt: &str) -> Result<String> {
            std::future::pending().await
        }

        async fn generate_image(&self, _prompt: &str) -> Result<String> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_stalled_ai_does_not_hold_the_run() -> Result<()> {
        let f = fixture().await?;
        let mut config = AppConfig::default();
        config.bot.operator_id = TEST_OPERATOR_ID;
        config.fanout.job_timeout_secs = 1;
        let app = AppContext::new(
            f.app.db.clone(),
            f.messenger.clone(),
            Arc::new(StalledAi),
            config,
        );
        let engine = BirthdayEngine::new(app);

        let summary = tokio::time::timeout(
            std::time::Duration::from_secs(30),
            engine.run(date(2026, 3, 10), 10),
        )
        .await
        .expect("the run finishes even though the AI never answers");

        // The admin panel needs no AI; the request to Bob does
        assert_eq!(summary.delivery.sent, 1);
        assert_eq!(summary.delivery.failed.len(), 1);
        assert!(summary.delivery.failed[0].contains("Timed out"));
        Ok(())
    }

    #[tokio::test]
    async fn test_repeated_runs_create_nothing_new() -> Result<()> {
        let f = fixture().await?;
        let engine = BirthdayEngine::new(f.app.clone());

        engine.run(date(2026, 3, 10), 10).await;
        engine.run(date(2026, 3, 10), 10).await;
        engine.run(date(2026, 3, 12), 10).await;

        assert_eq!(events(&f.app).await.len(), 1);
        assert_eq!(reports(&f.app).await.len(), 1);
        // Pending contributors are reminded on every run
        assert_eq!(f.messenger.sent_to(Recipient::User(f.bob.external_id)).len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_paid_contributor_is_not_asked_again() -> Result<()> {
        let f = fixture().await?;
        let engine = BirthdayEngine::new(f.app.clone());
        engine.run(date(2026, 3, 10), 10).await;

        let mut report = reports(&f.app).await.remove(0);
        report.status = true;
        store::update(&f.app.db, report).await.unwrap();

        let summary = engine.run(date(2026, 3, 11), 10).await;
        assert_eq!(summary.asked, 0);
        assert_eq!(f.messenger.sent_to(Recipient::User(f.bob.external_id)).len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_outside_near_term_only_admin_is_notified() -> Result<()> {
        let f = fixture().await?;
        let engine = BirthdayEngine::new(f.app.clone());

        let summary = engine.run(date(2026, 3, 6), 10).await;
        assert_eq!(events(&f.app).await.len(), 1);
        assert!(reports(&f.app).await.is_empty());
        assert_eq!(summary.asked, 0);
        assert_eq!(f.messenger.sent_to(Recipient::User(f.owner.external_id)).len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_closed_event_sends_nothing() -> Result<()> {
        let f = fixture().await?;
        let engine = BirthdayEngine::new(f.app.clone());
        engine.run(date(2026, 3, 10), 10).await;

        let mut event = events(&f.app).await.remove(0);
        event.status = false;
        store::update(&f.app.db, event).await.unwrap();
        let before = f.messenger.sent().len();

        let summary = engine.run(date(2026, 3, 11), 10).await;
        assert_eq!(summary.delivery.sent, 0);
        assert_eq!(f.messenger.sent().len(), before);
        Ok(())
    }

    #[tokio::test]
    async fn test_birthday_today_greets_without_event() -> Result<()> {
        let f = fixture().await?;
        let engine = BirthdayEngine::new(f.app.clone());

        let summary = engine.run(date(2026, 3, 15), 10).await;
        assert_eq!(summary.greeted, 1);
        assert!(events(&f.app).await.is_empty());
        assert_eq!(f.messenger.sent_to(Recipient::Channel(100)).len(), 1);
        let dm = f.messenger.sent_to(Recipient::User(f.ann.external_id));
        assert_eq!(dm.len(), 1);
        assert!(dm[0].text.contains("Happy birthday, Ann!"));
        Ok(())
    }

    #[tokio::test]
    async fn test_inactive_membership_is_excluded() -> Result<()> {
        let f = fixture().await?;
        let mut bob_membership = store::get_membership(&f.app.db, f.chat.id, f.bob.id).await.unwrap();
        bob_membership.status = false;
        store::update(&f.app.db, bob_membership).await.unwrap();

        BirthdayEngine::new(f.app.clone()).run(date(2026, 3, 10), 10).await;
        assert!(reports(&f.app).await.is_empty());
        assert!(f.messenger.sent_to(Recipient::User(f.bob.external_id)).is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_delivery_does_not_stop_others() -> Result<()> {
        let f = fixture().await?;
        let carol = create_test_user(&f.app.db, 4, "Carol").await?;
        add_member(&f.app.db, f.chat.id, carol.id).await?;
        f.messenger.fail_sends_to(Recipient::User(f.bob.external_id));

        let summary = BirthdayEngine::new(f.app.clone()).run(date(2026, 3, 10), 10).await;
        assert_eq!(summary.asked, 2);
        assert_eq!(summary.delivery.failed.len(), 1);
        assert_eq!(f.messenger.sent_to(Recipient::User(carol.external_id)).len(), 1);
        assert_eq!(reports(&f.app).await.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_inactive_chat_is_skipped() -> Result<()> {
        let f = fixture().await?;
        let mut chat = f.chat.clone();
        chat.status = false;
        store::update(&f.app.db, chat).await.unwrap();

        let summary = BirthdayEngine::new(f.app.clone()).run(date(2026, 3, 10), 10).await;
        assert_eq!(summary.chats, 0);
        assert!(events(&f.app).await.is_empty());
        Ok(())
    }
}
