//! Cron-driven digest runs with single-flight protection.
//!
//! [`DigestJob`] is one full run: load targets, aggregate, compose, send,
//! record the outcome. It never returns an error; every failure path ends
//! in a [`RunOutcome`] written to the [`OutcomeLog`].
//!
//! [`SchedulerHandle`] owns the `tokio_cron_scheduler` instance. It is
//! created once at startup and registers jobs by identifier, replacing any
//! job previously registered under the same identifier.
//!
//! ```text
//! cron tick ─► DigestJob::trigger ─┬─► already Running? drop the tick
//!                                  └─► run_once ─► aggregate ─► compose ─► send
//!                                                  └─────────────► OutcomeLog
//! ```

use crate::digest::aggregate;
use crate::errors::SchedulerError;
use crate::models::{DigestResult, RunOutcome};
use crate::outputs::body::compose;
use crate::outputs::mailer::DigestSender;
use crate::outputs::outcomes::{OutcomeLog, RunRecord};
use crate::scrapers::fetch::PageFetcher;
use crate::scrapers::rules::{RuleEngine, StructuralRuleEngine};
use crate::scrapers::site::SiteExtractor;
use crate::targets::TargetRepository;
use chrono::Utc;
use futures::FutureExt;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// A unit of work the scheduler can fire.
pub trait ScheduledJob {
    /// Run unless a previous run is still going. `None` means the trigger
    /// was dropped.
    fn trigger(&self) -> impl Future<Output = Option<RunOutcome>> + Send;
}

/// Clears the running flag when the run ends, however it ends.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// The full scrape-and-email pipeline.
pub struct DigestJob<R, F, S, E = StructuralRuleEngine> {
    job_id: String,
    subject: String,
    concurrency: usize,
    repository: R,
    extractor: SiteExtractor<F, E>,
    sender: S,
    outcomes: Arc<OutcomeLog>,
    running: AtomicBool,
}

impl<R, F, S, E> DigestJob<R, F, S, E>
where
    R: TargetRepository + Sync,
    F: PageFetcher + Sync,
    E: RuleEngine + Sync,
    S: DigestSender + Sync,
{
    pub fn new(
        job_id: impl Into<String>,
        repository: R,
        extractor: SiteExtractor<F, E>,
        sender: S,
        outcomes: Arc<OutcomeLog>,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            subject: crate::config::DEFAULT_SUBJECT.to_string(),
            concurrency: 1,
            repository,
            extractor,
            sender,
            outcomes,
            running: AtomicBool::new(false),
        }
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    #[cfg(test)]
    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// One run, start to finish, regardless of other in-flight runs.
    #[instrument(level = "info", skip_all, fields(job_id = %self.job_id))]
    pub async fn run_once(&self) -> RunOutcome {
        let started_at = Utc::now();
        info!("Digest run starting");

        let records = match caught(self.repository.load()).await {
            Ok(Ok(records)) => records,
            Ok(Err(e)) => {
                let outcome = RunOutcome::fatal(format!("failed to load targets: {e}"));
                self.finish(started_at, &outcome, None).await;
                return outcome;
            }
            Err(reason) => {
                let outcome = RunOutcome::fatal(format!("loading targets aborted: {reason}"));
                self.finish(started_at, &outcome, None).await;
                return outcome;
            }
        };

        let digest = match caught(aggregate(&self.extractor, &records, self.concurrency)).await {
            Ok(digest) => digest,
            Err(reason) => {
                let outcome = RunOutcome::fatal(format!("aggregation aborted: {reason}"));
                self.finish(started_at, &outcome, None).await;
                return outcome;
            }
        };

        let delivered = caught(async {
            let body = compose(&digest);
            self.sender.send(&self.subject, &body).await
        })
        .await;
        let outcome = match delivered {
            Ok(Ok(())) => RunOutcome::delivered(&digest),
            Ok(Err(e)) => RunOutcome::fatal(format!("delivery failed: {e}")),
            Err(reason) => RunOutcome::fatal(format!("delivery aborted: {reason}")),
        };
        self.finish(started_at, &outcome, Some(&digest)).await;
        outcome
    }

    async fn finish(
        &self,
        started_at: chrono::DateTime<Utc>,
        outcome: &RunOutcome,
        digest: Option<&DigestResult>,
    ) {
        let record = RunRecord::new(&self.job_id, started_at, outcome, digest);
        self.outcomes.record(record).await;
    }
}

/// Run `fut`, turning a panic into its message.
async fn caught<T>(fut: impl Future<Output = T>) -> Result<T, String> {
    AssertUnwindSafe(fut).catch_unwind().await.map_err(|panic| {
        panic
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string())
    })
}

impl<R, F, S, E> ScheduledJob for DigestJob<R, F, S, E>
where
    R: TargetRepository + Sync,
    F: PageFetcher + Sync,
    E: RuleEngine + Sync,
    S: DigestSender + Sync,
{
    async fn trigger(&self) -> Option<RunOutcome> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!(job_id = %self.job_id, "Previous run still in progress; dropping trigger");
            return None;
        }
        let _guard = RunningGuard(&self.running);
        Some(self.run_once().await)
    }
}

/// Owns the cron scheduler for the life of the process.
pub struct SchedulerHandle {
    scheduler: JobScheduler,
    registered: HashMap<String, Uuid>,
}

impl SchedulerHandle {
    pub async fn new() -> Result<Self, SchedulerError> {
        Ok(Self {
            scheduler: JobScheduler::new().await?,
            registered: HashMap::new(),
        })
    }

    /// Register `job` under `job_id` on a six-field cron expression.
    ///
    /// A job already registered under `job_id` is removed first, so
    /// re-registering replaces rather than duplicates.
    #[instrument(level = "info", skip(self, job))]
    pub async fn register<J>(
        &mut self,
        job_id: &str,
        cron: &str,
        job: Arc<J>,
    ) -> Result<Uuid, SchedulerError>
    where
        J: ScheduledJob + Send + Sync + 'static,
    {
        if let Some(previous) = self.registered.remove(job_id) {
            self.scheduler.remove(&previous).await?;
            info!(%previous, "Replaced existing job registration");
        }

        let cron_job = Job::new_async(cron, move |_uuid, _lock| {
            let job = Arc::clone(&job);
            Box::pin(async move {
                // Outcomes are recorded by the job itself.
                let _ = job.trigger().await;
            })
        })?;
        let uuid = self.scheduler.add(cron_job).await?;
        self.registered.insert(job_id.to_string(), uuid);
        info!(%uuid, "Registered job");
        Ok(uuid)
    }

    pub fn registered_jobs(&self) -> Vec<&str> {
        self.registered.keys().map(String::as_str).collect()
    }

    pub async fn start(&self) -> Result<(), SchedulerError> {
        self.scheduler.start().await?;
        info!(jobs = self.registered.len(), "Scheduler started");
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<(), SchedulerError> {
        if let Err(e) = self.scheduler.shutdown().await {
            error!(error = %e, "Scheduler shutdown failed");
            return Err(e.into());
        }
        info!("Scheduler stopped");
        Ok(())
    }
}
