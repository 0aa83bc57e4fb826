//! Plain-text digest body.

use crate::models::DigestResult;
use std::fmt::Write;

/// First line of every digest, followed by a blank line.
pub const GREETING: &str = "Good morning, here it's the daily news";

/// Render the digest body.
///
/// One `title` / `Link: weblink` block per pair, in order, each followed by
/// a blank line. Failures are not mentioned here; they only show up in the
/// run outcome. An empty result renders the greeting alone.
pub fn compose(result: &DigestResult) -> String {
    let mut body = format!("{GREETING}\n\n");
    for pair in &result.pairs {
        // Writing to a String cannot fail.
        let _ = write!(body, "{}\nLink: {}\n\n", pair.title, pair.weblink);
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExtractedPair;

    #[test]
    fn test_compose_empty_digest_is_greeting_only() {
        let body = compose(&DigestResult::default());
        assert_eq!(body, "Good morning, here it's the daily news\n\n");
    }

    #[test]
    fn test_compose_renders_pairs_in_order() {
        let result = DigestResult {
            pairs: vec![
                ExtractedPair::new("First", "https://a.example.com/1"),
                ExtractedPair::new("Second", "https://b.example.com/2"),
            ],
            sites_attempted: 2,
            sites_failed: 0,
        };
        assert_eq!(
            compose(&result),
            "Good morning, here it's the daily news\n\n\
             First\nLink: https://a.example.com/1\n\n\
             Second\nLink: https://b.example.com/2\n\n"
        );
    }

    #[test]
    fn test_compose_omits_failure_counts() {
        let result = DigestResult {
            pairs: vec![ExtractedPair::new("Only", "https://a.example.com/")],
            sites_attempted: 4,
            sites_failed: 3,
        };
        let body = compose(&result);
        assert!(!body.contains('3'));
        assert!(!body.contains("fail"));
    }

    #[test]
    fn test_compose_is_deterministic() {
        let result = DigestResult {
            pairs: vec![ExtractedPair::new("Same", "https://a.example.com/")],
            sites_attempted: 1,
            sites_failed: 0,
        };
        assert_eq!(compose(&result), compose(&result));
    }
}
