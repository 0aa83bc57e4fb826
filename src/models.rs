//! Data models for targets, extracted pairs and run results.
//!
//! This module defines the core data structures used throughout the application:
//! - [`TargetRecord`]: One configured site plus the samples used to learn rules
//! - [`ExtractedPair`]: A single `(title, weblink)` match produced for a site
//! - [`DigestResult`]: The aggregated output of one run
//! - [`RunOutcome`] / [`RunStatus`]: What the scheduler records for a run
//!
//! `TargetRecord` keeps the store's historical column names (`website`,
//! `title`, `weblink`) on the wire via serde renames.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A configured site to scrape.
///
/// The samples are literal values visible on the page at the time the
/// record was created. They are used to learn extraction rules on every
/// run, so a sample that disappears from the page makes the site fail.
///
/// # Fields
///
/// * `site_url` - The page to fetch
/// * `title_sample` - One title currently shown on the page
/// * `link_sample` - The link belonging to that title
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TargetRecord {
    /// The page to fetch.
    #[serde(rename = "website")]
    pub site_url: String,
    /// A title currently visible on the page.
    #[serde(rename = "title")]
    pub title_sample: String,
    /// A link currently visible on the page (absolute or as written in `href`).
    #[serde(rename = "weblink")]
    pub link_sample: String,
}

impl TargetRecord {
    #[cfg(test)]
    pub fn new(
        site_url: impl Into<String>,
        title_sample: impl Into<String>,
        link_sample: impl Into<String>,
    ) -> Self {
        Self {
            site_url: site_url.into(),
            title_sample: title_sample.into(),
            link_sample: link_sample.into(),
        }
    }
}

/// A title paired with its link, by position, for a single site.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ExtractedPair {
    /// The extracted title text.
    pub title: String,
    /// The extracted link.
    pub weblink: String,
}

impl ExtractedPair {
    pub fn new(title: impl Into<String>, weblink: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            weblink: weblink.into(),
        }
    }
}

/// The aggregated result of one run.
///
/// `pairs` follow target order first and extraction order within a target.
/// No sorting or deduplication is ever applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DigestResult {
    /// All pairs from every site that succeeded.
    pub pairs: Vec<ExtractedPair>,
    /// Number of target records processed.
    pub sites_attempted: usize,
    /// Number of target records whose extraction failed.
    pub sites_failed: usize,
}

impl DigestResult {
    pub fn sites_succeeded(&self) -> usize {
        self.sites_attempted - self.sites_failed
    }
}

/// Terminal status of a scheduled run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every site extracted and the digest was delivered.
    Success,
    /// The digest was delivered but at least one site failed.
    PartialFailure,
    /// No digest was delivered.
    Fatal,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunStatus::Success => "success",
            RunStatus::PartialFailure => "partial_failure",
            RunStatus::Fatal => "fatal",
        };
        f.write_str(s)
    }
}

/// What a run ended with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunOutcome {
    pub status: RunStatus,
    pub error_detail: Option<String>,
}

impl RunOutcome {
    pub fn success() -> Self {
        Self {
            status: RunStatus::Success,
            error_detail: None,
        }
    }

    pub fn partial_failure(sites_failed: usize, sites_attempted: usize) -> Self {
        Self {
            status: RunStatus::PartialFailure,
            error_detail: Some(format!(
                "{sites_failed} of {sites_attempted} sites failed extraction"
            )),
        }
    }

    pub fn fatal(detail: impl Into<String>) -> Self {
        Self {
            status: RunStatus::Fatal,
            error_detail: Some(detail.into()),
        }
    }

    /// Outcome for a digest that was delivered.
    pub fn delivered(result: &DigestResult) -> Self {
        if result.sites_failed == 0 {
            Self::success()
        } else {
            Self::partial_failure(result.sites_failed, result.sites_attempted)
        }
    }
}
