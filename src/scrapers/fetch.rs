//! Page retrieval.
//!
//! [`HttpFetcher`] issues one GET per call. Nothing is cached, so the title
//! and link cycles for a site each fetch the page independently and can
//! each fail on their own.

use crate::config::FetchConfig;
use crate::errors::FetchError;
use std::future::Future;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Source of raw page HTML.
pub trait PageFetcher {
    fn fetch(&self, url: &Url) -> impl Future<Output = Result<String, FetchError>> + Send;
}

/// Fetches pages over HTTP(S) with a shared client.
///
/// The client carries the per-request timeout so a stalled site cannot hold
/// a run past its next schedule slot.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout())
            .build()?;
        Ok(Self { client })
    }
}

impl PageFetcher for HttpFetcher {
    #[instrument(level = "info", skip_all, fields(%url))]
    async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        let t0 = Instant::now();
        let response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "Page fetch returned non-success status");
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        let body = response.text().await?;
        info!(
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched page"
        );
        debug!(preview = %crate::utils::truncate_for_log(&body, 200), "Page body");
        Ok(body)
    }
}
