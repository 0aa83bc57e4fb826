//! Error types for each stage of the pipeline.
//!
//! Fetch and extraction errors are isolated per site by the aggregator.
//! Delivery errors end the run and are recorded in its outcome. None of
//! them are allowed to escape a scheduled job.

use thiserror::Error;

/// A page could not be retrieved.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("invalid url {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{url} returned HTTP {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
}

/// A site could not be turned into pairs.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("sample is empty")]
    EmptySample,
    #[error("sample {sample:?} not found on page")]
    SampleNotFound { sample: String },
    #[error("strict pairing: {titles} titles but {links} links")]
    LengthMismatch { titles: usize, links: usize },
}

/// The digest could not be submitted.
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("invalid mailbox: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("failed to build message: {0}")]
    Message(#[from] lettre::error::Error),
    #[error("smtp transport: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

/// The target store could not be read.
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("failed to read targets from {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse targets from {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// The cron scheduler could not be set up or torn down.
#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("scheduler: {0}")]
    Cron(#[from] tokio_cron_scheduler::JobSchedulerError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
