//! Application state
//!
//! Shared by every handler: the loaded configuration and the email sender
//! built from it at startup.

use std::sync::Arc;

use crate::config::OmnicanalConfig;
use crate::email::{EmailError, EmailSender};

/// Application state for omnicanal
///
/// # Example
///
/// ```rust,no_run
/// use omnicanal::{config::OmnicanalConfig, state::AppState};
///
/// # fn example() -> anyhow::Result<()> {
/// let state = AppState::from_config(OmnicanalConfig::load()?)?;
/// let app = omnicanal::routes::router(state);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct AppState {
    config: Arc<OmnicanalConfig>,
    sender: EmailSender,
}

impl AppState {
    /// Create state from a configuration and an already built sender
    ///
    /// Tests use this to inject a recording transport.
    #[must_use]
    pub fn new(config: OmnicanalConfig, sender: EmailSender) -> Self {
        Self {
            config: Arc::new(config),
            sender,
        }
    }

    /// Create state, building the sender and transport from `config`
    pub fn from_config(config: OmnicanalConfig) -> Result<Self, EmailError> {
        let sender = config.email_sender()?;
        Ok(Self::new(config, sender))
    }

    /// Application configuration
    #[must_use]
    pub fn config(&self) -> &OmnicanalConfig {
        &self.config
    }

    /// Email sender
    #[must_use]
    pub const fn sender(&self) -> &EmailSender {
        &self.sender
    }
}
