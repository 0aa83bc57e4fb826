//! # Site Digest
//!
//! A scheduled digest pipeline that visits a configured list of web pages,
//! extracts titles and links using rules learned from one sample of each,
//! and emails everything it found as a single plain-text digest.
//!
//! ## Features
//!
//! - Learns extraction rules from a single title sample and link sample per site
//! - Weekday cron schedule with at most one run in flight
//! - One failing site never aborts a run; it is counted and skipped
//! - Delivery over authenticated STARTTLS SMTP to a single recipient
//! - Append-only JSON-lines log of every run's outcome
//!
//! ## Usage
//!
//! ```sh
//! SMTP_PASSWORD=... site_digest -c config.yaml
//! ```
//!
//! ## Architecture
//!
//! The application follows a pipeline architecture, once per cron tick:
//! 1. **Loading**: Read target records from the targets file
//! 2. **Extraction**: For each site, learn title/link rules and pair their matches
//! 3. **Aggregation**: Concatenate pairs in target order, counting failed sites
//! 4. **Output**: Compose the digest body, send it, record the run outcome

use clap::Parser;
use std::error::Error;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod digest;
mod errors;
mod models;
mod outputs;
mod scheduler;
mod scrapers;
mod targets;
mod utils;

use cli::Cli;
use config::AppConfig;
use outputs::mailer::SmtpMailer;
use outputs::outcomes::OutcomeLog;
use scheduler::{DigestJob, SchedulerHandle};
use scrapers::fetch::HttpFetcher;
use scrapers::site::SiteExtractor;
use targets::YamlTargetRepository;
use utils::ensure_parent_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "site_digest starting up");

    // Parse CLI
    let args = Cli::parse();
    debug!(config = %args.config.display(), "Parsed CLI arguments");

    // ---- Load config ----
    let mut config = AppConfig::from_file(&args.config).await?;
    config.apply_cli(&args);
    config.validate()?;

    if !config.scheduler.enabled {
        warn!("Scheduler disabled in configuration; nothing to do");
        return Ok(());
    }

    // ---- Outcome log ----
    if let Some(path) = &config.outcome_log {
        ensure_parent_dir(path).await?;
    }
    let outcomes = Arc::new(OutcomeLog::new(config.outcome_log.clone()));

    // ---- Pipeline ----
    let fetcher = HttpFetcher::new(&config.fetch)?;
    let extractor = SiteExtractor::new(fetcher).strict_pairing(config.extraction.strict_pairing);
    let repository = YamlTargetRepository::new(config.targets_file.clone());
    let mailer = SmtpMailer::new(config.mail.clone());
    let job = DigestJob::new(
        config.scheduler.job_id.clone(),
        repository,
        extractor,
        mailer,
        Arc::clone(&outcomes),
    )
    .subject(config.mail.subject.clone())
    .concurrency(config.fetch.concurrency);

    // ---- Scheduler ----
    let cron = config.scheduler.cron_expression()?;
    let mut scheduler = SchedulerHandle::new().await?;
    scheduler
        .register(&config.scheduler.job_id, &cron, Arc::new(job))
        .await?;
    scheduler.start().await?;
    info!(
        jobs = ?scheduler.registered_jobs(),
        %cron,
        targets = %config.targets_file.display(),
        to = %config.mail.to,
        "Digest job scheduled (UTC); waiting for Ctrl-C"
    );

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested");
    scheduler.shutdown().await?;

    let runs = outcomes.history();
    info!(runs = runs.len(), "Execution complete");
    Ok(())
}
