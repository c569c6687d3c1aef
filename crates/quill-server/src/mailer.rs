//! Outbound email behind a trait so the transport can be swapped (and
//! faked in tests). The default transport only logs the message, which is
//! enough for local runs; a real SMTP transport implements the same trait.

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum MailerError {
    #[error("Mail transport failed: {0}")]
    Transport(String),
}

/// A message handed to the transport. Kept as plain text plus an HTML
/// alternative, matching what the auth flows produce.
#[derive(Debug, Clone)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutboundEmail) -> Result<(), MailerError>;
}

/// Log-only transport used by default and in development.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: OutboundEmail) -> Result<(), MailerError> {
        info!(
            to = %email.to,
            subject = %email.subject,
            body = %email.text,
            "Outbound email (log transport)"
        );
        Ok(())
    }
}

#[cfg(test)]
pub mod testing {
    use std::sync::Mutex;

    use super::*;

    /// Captures every message instead of delivering it.
    #[derive(Default)]
    pub struct RecordingMailer {
        pub sent: Mutex<Vec<OutboundEmail>>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, email: OutboundEmail) -> Result<(), MailerError> {
            self.sent.lock().unwrap().push(email);
            Ok(())
        }
    }
}
