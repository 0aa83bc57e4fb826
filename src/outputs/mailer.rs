//! Digest delivery over SMTP with STARTTLS.
//!
//! One message, one sender, one recipient, per call. The transport is built
//! inside [`SmtpMailer::send`] without connection pooling and dropped when
//! the call returns, so the SMTP session is closed on success and on every
//! error path. Failures are returned to the caller, never retried here.

use crate::config::MailConfig;
use crate::errors::DeliveryError;
use lettre::message::{Mailbox, header::ContentType};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::future::Future;
use std::time::Instant;
use tracing::{error, info, instrument};

/// Something that can deliver a composed digest.
pub trait DigestSender {
    fn send(&self, subject: &str, body: &str) -> impl Future<Output = Result<(), DeliveryError>> + Send;
}

/// Sends digests through an authenticated SMTP submission server.
#[derive(Debug, Clone)]
pub struct SmtpMailer {
    config: MailConfig,
}

impl SmtpMailer {
    pub fn new(config: MailConfig) -> Self {
        Self { config }
    }

    /// Build the plain-text message without sending it.
    pub fn build_message(&self, subject: &str, body: &str) -> Result<Message, DeliveryError> {
        let from: Mailbox = self.config.sender().parse()?;
        let to: Mailbox = self.config.to.parse()?;

        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())?;
        Ok(message)
    }
}

impl DigestSender for SmtpMailer {
    #[instrument(level = "info", skip_all, fields(to = %self.config.to, host = %self.config.smtp_host))]
    async fn send(&self, subject: &str, body: &str) -> Result<(), DeliveryError> {
        let t0 = Instant::now();
        let message = self.build_message(subject, body)?;

        let credentials = Credentials::new(self.config.username.clone(), self.config.password.clone());
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.smtp_host)?
            .port(self.config.smtp_port)
            .credentials(credentials)
            .build();

        match transport.send(message).await {
            Ok(response) => {
                info!(
                    code = %response.code(),
                    bytes = body.len(),
                    elapsed_ms = t0.elapsed().as_millis() as u64,
                    "Digest email sent"
                );
                Ok(())
            }
            Err(e) => {
                error!(
                    error = %e,
                    elapsed_ms = t0.elapsed().as_millis() as u64,
                    "Digest email submission failed"
                );
                Err(e.into())
            }
        }
    }
}
