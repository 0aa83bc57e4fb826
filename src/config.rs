//! YAML configuration for the digest service.
//!
//! Every field has a default except the mail credentials and recipient, so a
//! minimal file only needs a `mail` section. CLI flags and environment
//! variables (see [`crate::cli::Cli`]) override the file after loading.
//!
//! ```yaml
//! scheduler:
//!   enabled: true
//!   job_id: scrape_and_send_email
//!   day_of_week: mon-fri
//!   hour: 10
//!   minute: 0
//! targets_file: targets.yaml
//! fetch:
//!   timeout_secs: 30
//!   concurrency: 1
//! extraction:
//!   strict_pairing: false
//! mail:
//!   username: digest@example.com
//!   password: app-password
//!   to: reader@example.com
//! outcome_log: runs.jsonl
//! ```

use crate::cli::Cli;
use crate::errors::ConfigError;
use chrono::Weekday;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Default SMTP submission host.
pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";

/// Default SMTP submission port (STARTTLS).
pub const DEFAULT_SMTP_PORT: u16 = 587;

/// Default digest subject line.
pub const DEFAULT_SUBJECT: &str = "Scraped Daily News";

/// Default scheduler job identifier.
pub const DEFAULT_JOB_ID: &str = "scrape_and_send_email";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub scheduler: ScheduleConfig,
    pub targets_file: PathBuf,
    pub fetch: FetchConfig,
    pub extraction: ExtractionConfig,
    pub mail: MailConfig,
    pub outcome_log: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scheduler: ScheduleConfig::default(),
            targets_file: PathBuf::from("targets.yaml"),
            fetch: FetchConfig::default(),
            extraction: ExtractionConfig::default(),
            mail: MailConfig::default(),
            outcome_log: None,
        }
    }
}

/// When the digest job fires. Hour and minute are UTC.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Registers the job at startup when true.
    pub enabled: bool,
    pub job_id: String,
    /// Inclusive weekday range such as `mon-fri`, or a single day.
    pub day_of_week: String,
    pub hour: u32,
    pub minute: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            job_id: DEFAULT_JOB_ID.to_string(),
            day_of_week: "mon-fri".to_string(),
            hour: 10,
            minute: 0,
        }
    }
}

impl ScheduleConfig {
    /// Parse `day_of_week` into an inclusive `(first, last)` range.
    pub fn weekday_range(&self) -> Result<(Weekday, Weekday), ConfigError> {
        let parse = |s: &str| {
            s.trim().parse::<Weekday>().map_err(|_| {
                ConfigError::Invalid(format!("unknown weekday {s:?} in day_of_week"))
            })
        };
        match self.day_of_week.split_once('-') {
            Some((first, last)) => Ok((parse(first)?, parse(last)?)),
            None => {
                let day = parse(&self.day_of_week)?;
                Ok((day, day))
            }
        }
    }

    /// Six-field cron expression (`sec min hour dom month dow`).
    pub fn cron_expression(&self) -> Result<String, ConfigError> {
        let (first, last) = self.weekday_range()?;
        let days = if first == last {
            format!("{first}")
        } else {
            format!("{first}-{last}")
        };
        Ok(format!("0 {} {} * * {}", self.minute, self.hour, days))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Sites extracted at once. 1 keeps the run strictly sequential.
    pub concurrency: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: concat!("site_digest/", env!("CARGO_PKG_VERSION")).to_string(),
            concurrency: 1,
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Fail a site instead of truncating when title and link counts differ.
    pub strict_pairing: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
    /// Sender address; falls back to `username` when unset.
    pub from: Option<String>,
    pub to: String,
    pub subject: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            smtp_host: DEFAULT_SMTP_HOST.to_string(),
            smtp_port: DEFAULT_SMTP_PORT,
            username: String::new(),
            password: String::new(),
            from: None,
            to: String::new(),
            subject: DEFAULT_SUBJECT.to_string(),
        }
    }
}

impl MailConfig {
    pub fn sender(&self) -> &str {
        self.from.as_deref().unwrap_or(&self.username)
    }
}

impl AppConfig {
    /// Read and parse the YAML file at `path`. Does not validate.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub async fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.display().to_string(),
                source,
            })?;
        let config = Self::from_yaml(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        info!("Loaded configuration");
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(raw)
    }

    /// Apply CLI and environment overrides on top of the file values.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(targets) = &cli.targets {
            self.targets_file = targets.clone();
        }
        if let Some(username) = &cli.smtp_username {
            self.mail.username = username.clone();
        }
        if let Some(password) = &cli.smtp_password {
            self.mail.password = password.clone();
        }
        if let Some(recipient) = &cli.recipient {
            self.mail.to = recipient.clone();
        }
        debug!(targets = %self.targets_file.display(), to = %self.mail.to, "Applied CLI overrides");
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.scheduler;
        if s.hour > 23 {
            return Err(ConfigError::Invalid(format!("hour {} out of range 0-23", s.hour)));
        }
        if s.minute > 59 {
            return Err(ConfigError::Invalid(format!(
                "minute {} out of range 0-59",
                s.minute
            )));
        }
        if s.job_id.trim().is_empty() {
            return Err(ConfigError::Invalid("scheduler.job_id is empty".to_string()));
        }
        s.weekday_range()?;
        if self.fetch.concurrency == 0 {
            return Err(ConfigError::Invalid(
                "fetch.concurrency must be at least 1".to_string(),
            ));
        }
        if self.mail.to.trim().is_empty() {
            return Err(ConfigError::Invalid("mail.to is empty".to_string()));
        }
        if self.mail.sender().trim().is_empty() {
            return Err(ConfigError::Invalid(
                "mail.from or mail.username is required".to_string(),
            ));
        }
        Ok(())
    }
}
