//! Bounded task group for notification fan-out.
//!
//! Jobs start as soon as they are spawned and run at most `max_concurrent`
//! at a time. A failing, panicking or stalled job is recorded and never
//! affects its siblings. Each job gets `job_timeout` once it holds a permit.
//! [`FanOut::finish`] drains the group into a [`BatchReport`].

use crate::config::settings::FanOutSettings;
use crate::errors::{Error, Result};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Outcome of a drained fan-out group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Jobs that completed successfully
    pub sent: usize,
    /// One entry per failed job: its label and the reason
    pub failed: Vec<String>,
}

/// Supervised group of notification jobs.
#[derive(Debug)]
pub struct FanOut {
    jobs: JoinSet<(String, Result<()>)>,
    permits: Arc<Semaphore>,
    job_timeout: Duration,
}

impl FanOut {
    /// Creates a group running at most `max_concurrent` jobs at once, each
    /// for at most `job_timeout`.
    pub fn new(max_concurrent: usize, job_timeout: Duration) -> Self {
        Self {
            jobs: JoinSet::new(),
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            job_timeout,
        }
    }

    /// Creates a group bounded by the `[fanout]` settings.
    pub fn from_settings(settings: &FanOutSettings) -> Self {
        Self::new(
            settings.max_concurrent,
            Duration::from_secs(settings.job_timeout_secs.max(1)),
        )
    }

    /// Starts a job.
    pub fn spawn<F>(&mut self, label: impl Into<String>, job: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let label = label.into();
        let permits = Arc::clone(&self.permits);
        let job_timeout = self.job_timeout;
        self.jobs.spawn(async move {
            let result = match permits.acquire_owned().await {
                Ok(_permit) => tokio::time::timeout(job_timeout, job)
                    .await
                    .unwrap_or(Err(Error::Timeout(job_timeout))),
                Err(e) => Err(Error::Messenger {
                    message: format!("fan-out closed: {e}"),
                }),
            };
            (label, result)
        });
    }

    /// Waits for every job and summarises the outcome.
    pub async fn finish(mut self) -> BatchReport {
        let mut report = BatchReport::default();
        while let Some(joined) = self.jobs.join_next().await {
            match joined {
                Ok((_, Ok(()))) => report.sent += 1,
                Ok((label, Err(e))) => {
                    tracing::warn!("Notification job {label} failed: {e}");
                    report.failed.push(format!("{label}: {e}"));
                }
                Err(e) => {
                    tracing::error!("Notification job crashed: {e}");
                    report.failed.push(format!("panicked: {e}"));
                }
            }
        }
        report
    }
}
