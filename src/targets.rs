//! The store of sites to scrape.
//!
//! The pipeline only ever reads targets, once per run, in store order.
//! [`YamlTargetRepository`] keeps them in a YAML list:
//!
//! ```yaml
//! - website: https://news.example.com/
//!   title: Council approves new budget
//!   weblink: /2025/05/06/council-budget
//! ```

use crate::errors::RepositoryError;
use crate::models::TargetRecord;
use std::future::Future;
use std::path::PathBuf;
use tracing::{info, instrument};

/// Read-only access to configured targets.
pub trait TargetRepository {
    /// Return every record in store order. No filtering or paging.
    fn load(&self) -> impl Future<Output = Result<Vec<TargetRecord>, RepositoryError>> + Send;
}

/// Targets kept in a YAML file, re-read on every run.
#[derive(Debug, Clone)]
pub struct YamlTargetRepository {
    path: PathBuf,
}

impl YamlTargetRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TargetRepository for YamlTargetRepository {
    #[instrument(level = "info", skip_all, fields(path = %self.path.display()))]
    async fn load(&self) -> Result<Vec<TargetRecord>, RepositoryError> {
        let path = self.path.display().to_string();
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| RepositoryError::Io {
                path: path.clone(),
                source,
            })?;

        // An empty file is an empty store, not a parse error.
        if raw.trim().is_empty() {
            info!(count = 0, "Loaded targets");
            return Ok(Vec::new());
        }

        let records: Vec<TargetRecord> =
            serde_yaml::from_str(&raw).map_err(|source| RepositoryError::Parse { path, source })?;
        info!(count = records.len(), "Loaded targets");
        Ok(records)
    }
}

/// In-memory store, used by tests.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct StaticTargets(pub Vec<TargetRecord>);

#[cfg(test)]
impl TargetRepository for StaticTargets {
    async fn load(&self) -> Result<Vec<TargetRecord>, RepositoryError> {
        Ok(self.0.clone())
    }
}
