//! Scheduler loop - Fires the daily jobs at their configured time of day.
//!
//! Each tick reads the two trigger rows (`check_birthday`, `check_report`),
//! compares the wall clock at minute precision and runs the matching job.
//! After a run the loop sleeps the cushion, otherwise the poll interval.
//! A job fires at most once per (date, trigger time); a missed minute is not
//! caught up. The loop ends when the shutdown flag flips to `true`.

use crate::config::settings::SchedulerSettings;
use crate::entities::scheduler_config;
use crate::errors::{Error, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use sea_orm::{ColumnTrait, Condition, DatabaseConnection, Set};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Title of the birthday trigger row.
pub const CHECK_BIRTHDAY: &str = "check_birthday";
/// Title of the report trigger row.
pub const CHECK_REPORT: &str = "check_report";

/// Source of wall-clock time.
pub trait Clock: Send + Sync {
    /// Current local date and time.
    fn now(&self) -> NaiveDateTime;
}

/// The process's local clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

/// Trigger settings in effect for one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Triggers {
    /// `HH:MM` of the birthday check
    pub birthday_time: String,
    /// `HH:MM` of the report check
    pub report_time: String,
    /// Days-to-birthday horizon
    pub lookahead: u32,
}

/// Provides the trigger settings.
#[async_trait]
pub trait TriggerSource: Send + Sync {
    /// Settings for the current tick.
    async fn triggers(&self) -> Triggers;
}

/// Reads triggers from the `scheduler_config` table, falling back to settings.
#[derive(Debug, Clone)]
pub struct StoredTriggers {
    db: DatabaseConnection,
    defaults: SchedulerSettings,
}

impl StoredTriggers {
    /// Creates a source over `db` with `defaults` for absent rows.
    pub const fn new(db: DatabaseConnection, defaults: SchedulerSettings) -> Self {
        Self { db, defaults }
    }
}

#[async_trait]
impl TriggerSource for StoredTriggers {
    async fn triggers(&self) -> Triggers {
        let rows: Vec<scheduler_config::Model> = super::store::get_many(
            &self.db,
            Condition::all().add(scheduler_config::Column::Title.is_in([CHECK_BIRTHDAY, CHECK_REPORT])),
        )
        .await;
        let row = |title: &str| rows.iter().find(|r| r.title == title);

        let birthday = row(CHECK_BIRTHDAY);
        let report = row(CHECK_REPORT);
        Triggers {
            birthday_time: time_or(
                birthday.and_then(|r| r.trigger_time.as_deref()),
                &self.defaults.birthday_time,
            ),
            report_time: time_or(
                report.and_then(|r| r.trigger_time.as_deref()),
                &self.defaults.report_time,
            ),
            lookahead: birthday
                .and_then(|r| r.lookahead)
                .and_then(|days| u32::try_from(days).ok())
                .unwrap_or(self.defaults.lookahead_days),
        }
    }
}

/// Normalises `HH:MM`, so "8:00" matches the clock's "08:00".
pub fn normalize_time(raw: &str) -> Result<String> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map(|t| t.format("%H:%M").to_string())
        .map_err(|_| Error::invalid(format!("'{raw}' is not a time, use HH:MM")))
}

fn time_or(stored: Option<&str>, default: &str) -> String {
    stored
        .and_then(|raw| match normalize_time(raw) {
            Ok(time) => Some(time),
            Err(e) => {
                tracing::warn!("Ignoring stored trigger time: {e}");
                None
            }
        })
        .unwrap_or_else(|| default.to_string())
}

/// Creates or updates a trigger row.
pub async fn upsert_trigger(
    db: &DatabaseConnection,
    title: &str,
    trigger_time: &str,
    lookahead: Option<u32>,
) -> Result<scheduler_config::Model> {
    if title != CHECK_BIRTHDAY && title != CHECK_REPORT {
        return Err(Error::invalid(format!(
            "Unknown schedule '{title}', expected {CHECK_BIRTHDAY} or {CHECK_REPORT}"
        )));
    }
    let trigger_time = normalize_time(trigger_time)?;
    let lookahead = lookahead.map(i64::from);

    let existing: Option<scheduler_config::Model> = super::store::get_many(
        db,
        Condition::all().add(scheduler_config::Column::Title.eq(title)),
    )
    .await
    .into_iter()
    .next();

    if let Some(mut row) = existing {
        row.trigger_time = Some(trigger_time);
        if lookahead.is_some() {
            row.lookahead = lookahead;
        }
        return super::store::update(db, row)
            .await
            .ok_or_else(|| Error::persistence("update(scheduler_config)"));
    }

    let id = super::store::create(
        db,
        scheduler_config::ActiveModel {
            title: Set(title.to_string()),
            trigger_time: Set(Some(trigger_time)),
            lookahead: Set(lookahead),
            ..Default::default()
        },
    )
    .await
    .ok_or_else(|| Error::persistence("create(scheduler_config)"))?;
    super::store::get_by_id(db, id)
        .await
        .ok_or_else(|| Error::persistence("get(scheduler_config)"))
}

/// The jobs run by the scheduler.
#[async_trait]
pub trait DailyTasks: Send + Sync {
    /// Birthday check for `today`.
    async fn check_birthdays(&self, today: NaiveDate, lookahead: u32);

    /// Report check for `today`.
    async fn check_reports(&self, today: NaiveDate);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum DailyJob {
    Birthdays,
    Reports,
}

/// Single sequential scheduler.
pub struct Scheduler {
    clock: Arc<dyn Clock>,
    triggers: Arc<dyn TriggerSource>,
    tasks: Arc<dyn DailyTasks>,
    poll_interval: Duration,
    cushion: Duration,
    last_fired: HashMap<DailyJob, (NaiveDate, String)>,
}

impl Scheduler {
    /// Creates a scheduler with the pacing from `settings`.
    pub fn new(
        clock: Arc<dyn Clock>,
        triggers: Arc<dyn TriggerSource>,
        tasks: Arc<dyn DailyTasks>,
        settings: &SchedulerSettings,
    ) -> Self {
        Self {
            clock,
            triggers,
            tasks,
            poll_interval: Duration::from_secs(settings.poll_interval_secs.max(1)),
            cushion: Duration::from_secs(settings.cushion_secs),
            last_fired: HashMap::new(),
        }
    }

    /// Starts the loop on its own task.
    pub fn spawn(self) -> SchedulerHandle {
        let (shutdown, rx) = watch::channel(false);
        SchedulerHandle {
            shutdown,
            task: tokio::spawn(self.run(rx)),
        }
    }

    /// Runs until `shutdown` becomes `true` or its sender is dropped.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!("Scheduler started");
        loop {
            if *shutdown.borrow() {
                break;
            }
            let pause = if self.tick().await {
                self.cushion
            } else {
                self.poll_interval
            };
            tokio::select! {
                () = tokio::time::sleep(pause) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::info!("Scheduler stopped");
    }

    /// Runs whatever is due now. Returns true if a job ran.
    pub async fn tick(&mut self) -> bool {
        let now = self.clock.now();
        let today = now.date();
        let minute = now.format("%H:%M").to_string();
        let triggers = self.triggers.triggers().await;

        let mut ran = false;
        if minute == triggers.birthday_time && self.claim(DailyJob::Birthdays, today, &minute) {
            self.tasks.check_birthdays(today, triggers.lookahead).await;
            ran = true;
        }
        if minute == triggers.report_time && self.claim(DailyJob::Reports, today, &minute) {
            self.tasks.check_reports(today).await;
            ran = true;
        }
        ran
    }

    fn claim(&mut self, job: DailyJob, today: NaiveDate, minute: &str) -> bool {
        let key = (today, minute.to_string());
        if self.last_fired.get(&job) == Some(&key) {
            return false;
        }
        tracing::info!("Running {job:?} for {today} {minute}");
        self.last_fired.insert(job, key);
        true
    }
}

/// A scheduler running on its own task.
#[derive(Debug)]
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Flips the shutdown flag and waits for the loop to end. A job that is
    /// already running finishes first.
    pub async fn stop(self) {
        if let Err(e) = self.shutdown.send(true) {
            tracing::warn!("Scheduler loop had already ended: {e}");
        }
        if let Err(e) = self.task.await {
            tracing::error!("Scheduler task failed: {e}");
        }
    }

    /// True once the loop has ended.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
