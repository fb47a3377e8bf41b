//! Mail transports
//!
//! A transport delivers one assembled [`MessageEnvelope`]:
//! - **SMTP**: deliver through an SMTP relay (production)
//! - **Console**: log the envelope instead of sending it (development)

use async_trait::async_trait;

use super::{EmailError, MessageEnvelope, Sender};

pub mod console;
pub mod smtp;

/// Trait for delivering a single message
///
/// Implementations are shared read-only by every concurrent send of a batch,
/// so they must be `Send + Sync`. Any pooling of connections is the
/// transport's own concern.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Deliver `envelope` on behalf of `from`
    ///
    /// # Errors
    ///
    /// Returns `EmailError::Transport` for authentication, connection or
    /// timeout failures and `EmailError::InvalidAddress` for malformed
    /// addresses.
    async fn send(&self, from: &Sender, envelope: MessageEnvelope) -> Result<(), EmailError>;
}
