//! Everything a run produces: the digest email and the execution record.
//!
//! # Submodules
//!
//! - [`body`]: Renders a `DigestResult` into the plain-text message body
//! - [`mailer`]: Submits the message over authenticated STARTTLS SMTP
//! - [`outcomes`]: Append-only log of how each run ended
//!
//! # Message Layout
//!
//! ```text
//! Good morning, here it's the daily news
//!
//! Council approves new budget
//! Link: https://news.example.com/2025/05/06/council-budget
//!
//! Bridge reopens after repairs
//! Link: https://news.example.com/2025/05/06/bridge
//!
//! ```

pub mod body;
pub mod mailer;
pub mod outcomes;
