//! Utility functions for string handling and file system checks.
//!
//! This module provides helper functions used throughout the application:
//! - Whitespace normalization for comparing samples against page text
//! - String truncation for logging
//! - Parent directory validation for the outcome log

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Collapse every run of whitespace into a single space and trim the ends.
///
/// Page text is split across text nodes and indented arbitrarily, while
/// samples are typed in by a person, so both sides are normalized before
/// comparison.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(normalize_whitespace("  Hello \n\t world "), "Hello world");
/// ```
pub fn normalize_whitespace(s: &str) -> String {
    WHITESPACE.replace_all(s.trim(), " ").into_owned()
}

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to at most `max` bytes (backing off to the
/// nearest char boundary) with an ellipsis and byte count indicator appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…(+{} bytes)", &s[..end], s.len() - end)
}

/// Ensure the directory that will hold `file_path` exists.
///
/// Creates missing parents. A bare file name (no parent component) needs
/// nothing.
#[instrument(level = "info", skip_all, fields(path = %file_path.display()))]
pub async fn ensure_parent_dir(file_path: &Path) -> std::io::Result<()> {
    match file_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).await?;
            info!(dir = %parent.display(), "Outcome log directory ready");
            Ok(())
        }
        _ => Ok(()),
    }
}
