//! Testing utilities for omnicanal
//!
//! - [`RecordingTransport`] - in-memory transport that captures envelopes and
//!   fails selected recipients

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::email::{EmailError, MailTransport, MessageEnvelope, Sender};

/// Transport that records every message instead of sending it
///
/// Recipients registered with [`RecordingTransport::failing_for`] get a
/// transport error and are not recorded as sent.
///
/// # Examples
///
/// ```rust
/// use omnicanal::email::{MailTransport, MessageEnvelope, Sender};
/// use omnicanal::testing::RecordingTransport;
///
/// # async fn example() {
/// let transport = RecordingTransport::new().failing_for("bounce@example.com");
/// let from = Sender::new("noreply@example.com", None);
///
/// transport
///     .send(&from, MessageEnvelope::new("user@example.com", "Hi", "<p>Hi</p>"))
///     .await
///     .unwrap();
///
/// assert_eq!(transport.sent_count(), 1);
/// assert!(transport.was_sent_to("user@example.com"));
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct RecordingTransport {
    sent: Arc<Mutex<Vec<MessageEnvelope>>>,
    failing: Arc<Mutex<HashSet<String>>>,
    attempts: Arc<Mutex<usize>>,
}

impl RecordingTransport {
    /// Create a transport that accepts every message
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject messages to `address` with a transport error
    #[must_use]
    pub fn failing_for(self, address: impl Into<String>) -> Self {
        self.failing.lock().insert(address.into());
        self
    }

    /// Messages accepted so far, in send order
    #[must_use]
    pub fn sent(&self) -> Vec<MessageEnvelope> {
        self.sent.lock().clone()
    }

    /// Number of messages accepted
    #[must_use]
    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }

    /// Number of send attempts, accepted or rejected
    #[must_use]
    pub fn attempts(&self) -> usize {
        *self.attempts.lock()
    }

    /// Whether a message to `address` was accepted
    #[must_use]
    pub fn was_sent_to(&self, address: &str) -> bool {
        self.sent.lock().iter().any(|envelope| envelope.to == address)
    }

    /// The accepted message to `address`, if any
    #[must_use]
    pub fn sent_to(&self, address: &str) -> Option<MessageEnvelope> {
        self.sent
            .lock()
            .iter()
            .find(|envelope| envelope.to == address)
            .cloned()
    }
}

#[async_trait]
impl MailTransport for RecordingTransport {
    async fn send(&self, _from: &Sender, envelope: MessageEnvelope) -> Result<(), EmailError> {
        *self.attempts.lock() += 1;

        if self.failing.lock().contains(&envelope.to) {
            return Err(EmailError::transport(format!(
                "recipient rejected: {}",
                envelope.to
            )));
        }

        self.sent.lock().push(envelope);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_and_rejects() {
        let transport = RecordingTransport::new().failing_for("b@example.com");
        let from = Sender::new("noreply@example.com", None);

        transport
            .send(&from, MessageEnvelope::new("a@example.com", "Hi", "<p>Hi</p>"))
            .await
            .unwrap();
        let rejected = transport
            .send(&from, MessageEnvelope::new("b@example.com", "Hi", "<p>Hi</p>"))
            .await;

        assert!(matches!(rejected, Err(EmailError::Transport(_))));
        assert_eq!(transport.sent_count(), 1);
        assert_eq!(transport.attempts(), 2);
        assert!(transport.was_sent_to("a@example.com"));
        assert!(!transport.was_sent_to("b@example.com"));
        assert_eq!(transport.sent_to("a@example.com").unwrap().subject, "Hi");
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let transport = RecordingTransport::new();
        let clone = transport.clone();

        clone
            .send(
                &Sender::new("noreply@example.com", None),
                MessageEnvelope::new("a@example.com", "Hi", "<p>Hi</p>"),
            )
            .await
            .unwrap();

        assert_eq!(transport.sent_count(), 1);
    }
}
