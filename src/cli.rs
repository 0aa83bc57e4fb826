//! Command-line interface definitions for Site Digest.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Everything except the config path can also be given via environment
//! variables, which keeps credentials out of the config file.

use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for the Site Digest service.
///
/// # Examples
///
/// ```sh
/// # Use ./config.yaml
/// site_digest
///
/// # Explicit config and targets
/// site_digest -c /etc/site_digest/config.yaml -t /etc/site_digest/targets.yaml
///
/// # Credentials from the environment
/// SMTP_USERNAME=digest@example.com SMTP_PASSWORD=... site_digest
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to config.yaml
    #[arg(short, long, default_value = "config.yaml")]
    pub config: PathBuf,

    /// Path to the targets file (overrides `targets_file` in the config)
    #[arg(short, long, env = "DIGEST_TARGETS")]
    pub targets: Option<PathBuf>,

    /// SMTP username (overrides `mail.username`)
    #[arg(long, env = "SMTP_USERNAME")]
    pub smtp_username: Option<String>,

    /// SMTP password (overrides `mail.password`)
    #[arg(long, env = "SMTP_PASSWORD", hide_env_values = true)]
    pub smtp_password: Option<String>,

    /// Digest recipient (overrides `mail.to`)
    #[arg(long, env = "DIGEST_TO_EMAIL")]
    pub recipient: Option<String>,
}
