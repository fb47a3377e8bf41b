//! Console transport for development
//!
//! Logs envelopes instead of sending them.

use async_trait::async_trait;
use tracing::{debug, info};

use super::MailTransport;
use crate::email::{EmailError, MessageEnvelope, Sender};

/// Console mail transport for development
///
/// Useful for development and testing without SMTP credentials.
#[derive(Debug, Clone, Default)]
pub struct ConsoleTransport {
    /// Whether to log the rendered body as well
    verbose: bool,
}

impl ConsoleTransport {
    /// Create a new console transport
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a console transport that also logs the rendered HTML
    #[must_use]
    pub const fn verbose() -> Self {
        Self { verbose: true }
    }
}

#[async_trait]
impl MailTransport for ConsoleTransport {
    async fn send(&self, from: &Sender, envelope: MessageEnvelope) -> Result<(), EmailError> {
        let attachments: Vec<&str> = envelope
            .attachments
            .iter()
            .map(|a| a.filename.as_str())
            .collect();

        info!(
            from = %from,
            to = %envelope.to,
            cc = ?envelope.cc,
            bcc = ?envelope.bcc,
            subject = %envelope.subject,
            attachments = ?attachments,
            "Console email sent"
        );

        if self.verbose {
            debug!(html = %envelope.html, "Email HTML content");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::email::Attachment;

    #[tokio::test]
    async fn test_console_transport_send() {
        let transport = ConsoleTransport::new();
        let envelope = MessageEnvelope::new("user@example.com", "Test Email", "<p>Hi</p>");

        let result = transport
            .send(&Sender::new("noreply@example.com", None), envelope)
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_console_transport_verbose_with_attachment() {
        let transport = ConsoleTransport::verbose();
        let mut envelope = MessageEnvelope::new("user@example.com", "Test Email", "<p>Hi</p>");
        envelope.cc.push("cc@example.com".to_string());
        envelope.attachments.push(Attachment::new("a.txt", b"hello".to_vec()));

        let result = transport
            .send(&Sender::new("noreply@example.com", None), envelope)
            .await;
        assert!(result.is_ok());
    }
}
