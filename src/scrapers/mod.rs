//! Per-site extraction: fetching pages and learning rules from samples.
//!
//! Every target is processed with the same two-phase pattern, once for the
//! title sample and once for the link sample:
//!
//! 1. **Fetching**: Download the page ([`fetch::PageFetcher`])
//! 2. **Learning**: Find the sample on the page and record where it lives
//!    ([`rules::RuleEngine::learn`])
//! 3. **Applying**: Collect every value that lives in a structurally
//!    identical place ([`rules::RuleEngine::apply`])
//!
//! [`site::SiteExtractor`] then pairs the two value lists by position.
//!
//! # Submodules
//!
//! | Module | Role |
//! |--------|------|
//! | [`fetch`] | HTTP page retrieval with a bounded timeout |
//! | [`rules`] | Structural rule learning/applying over parsed HTML |
//! | [`site`] | One target record in, ordered `(title, link)` pairs out |
//!
//! Rules are learned from scratch on every run and never outlive the
//! extraction of the site they were learned for.

pub mod fetch;
pub mod rules;
pub mod site;
