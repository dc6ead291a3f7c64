//! Contribution reports - Daily paid/pending summaries for admins.
//!
//! This module gathers the state of every open collection into structured
//! data and formats it for the daily `check_report` run.

use super::context::AppContext;
use super::fanout::{BatchReport, FanOut};
use super::intent::{AdminCommand, ChatAction, Scope};
use super::panel::{Button, Panel, Recipient};
use super::store;
use crate::entities::{chat, event, user};
use chrono::NaiveDate;
use sea_orm::{ColumnTrait, Condition, DatabaseConnection};
use std::sync::Arc;

/// Paid and pending contributors of one event.
#[derive(Debug, Clone)]
pub struct EventReport {
    /// The event being reported on
    pub event: event::Model,
    /// Names of participants marked paid
    pub paid: Vec<String>,
    /// Names of participants still pending
    pub pending: Vec<String>,
}

impl EventReport {
    /// Total money received so far.
    pub fn collected(&self) -> i64 {
        i64::try_from(self.paid.len()).unwrap_or(i64::MAX).saturating_mul(self.event.amount)
    }
}

/// Collects the report rows of `event`.
pub async fn build_event_report(db: &DatabaseConnection, event: event::Model) -> EventReport {
    let mut paid = Vec::new();
    let mut pending = Vec::new();
    for (report, user) in store::get_event_reports(db, event.id).await {
        if report.status {
            paid.push(user.first_name);
        } else {
            pending.push(user.first_name);
        }
    }
    EventReport {
        event,
        paid,
        pending,
    }
}

/// Generates a progress bar string for visual representation.
///
/// Creates a text-based progress bar like: `[████████░░] 8/10`
#[must_use]
pub fn format_progress_bar(done: usize, total: usize, bar_length: usize) -> String {
    let filled = if total == 0 {
        0
    } else {
        (done.min(total) * bar_length + total / 2) / total
    };
    let empty = bar_length.saturating_sub(filled);
    format!("[{}{}] {done}/{total}", "█".repeat(filled), "░".repeat(empty))
}

/// Formats the admin summary of one event.
pub fn format_event_report(report: &EventReport, today: NaiveDate) -> String {
    let total = report.paid.len() + report.pending.len();
    let days_left = (report.event.date_event - today).num_days();
    let mut text = format!(
        "📊 {} ({}, {})\n{}\n💰 {} collected",
        report.event.label,
        report.event.date_event.format("%d.%m"),
        match days_left {
            0 => "today".to_string(),
            d if d < 0 => format!("{} day(s) ago", -d),
            d => format!("in {d} day(s)"),
        },
        format_progress_bar(report.paid.len(), total, 10),
        report.collected()
    );
    if !report.pending.is_empty() {
        text.push_str("\n⏳ Pending: ");
        text.push_str(&report.pending.join(", "));
    }
    text
}

/// Sends every chat admin a summary of each open event in their chats.
pub async fn daily_report(app: &AppContext, today: NaiveDate) -> BatchReport {
    tracing::info!("Report check for {today}");
    let chats: Vec<chat::Model> = store::get_many(
        &app.db,
        Condition::all().add(chat::Column::Status.eq(true)),
    )
    .await;

    let mut fanout = FanOut::from_settings(&app.config.fanout);
    for chat in chats {
        let Some(owner) = store::get_by_id::<user::Model>(&app.db, chat.owner_id).await else {
            tracing::warn!("Chat {} has no admin record, skipping report", chat.id);
            continue;
        };
        let events: Vec<event::Model> = store::get_many(
            &app.db,
            Condition::all()
                .add(event::Column::ChatId.eq(chat.id))
                .add(event::Column::Status.eq(true)),
        )
        .await;

        for event in events {
            let event_id = event.id;
            let report = build_event_report(&app.db, event).await;
            let panel = Panel::text(format_event_report(&report, today)).row(vec![
                Button::token(
                    "📊 Report",
                    Scope::Admin.wrap(AdminCommand::ChatAction {
                        action: ChatAction::Report,
                        chat_id: chat.id,
                        page: 0,
                    }),
                ),
                Button::token("🎁 Event", Scope::Admin.wrap(AdminCommand::EventPanel { event_id })),
            ]);
            let messenger = Arc::clone(&app.messenger);
            let to = Recipient::User(owner.external_id);
            fanout.spawn(format!("report event {event_id} -> admin {}", owner.id), async move {
                messenger.send_panel(to, &panel).await.map(|_| ())
            });
        }
    }

    let delivery = fanout.finish().await;
    tracing::info!(
        "Report check done: {} sent, {} failed",
        delivery.sent,
        delivery.failed.len()
    );
    delivery
}
