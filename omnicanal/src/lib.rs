//! omnicanal: templated email delivery over SMTP
//!
//! Renders MJML or HTML templates with per-recipient variables, assembles
//! MIME messages with attachments and hands them to an SMTP transport. Bulk
//! sends fan out concurrently under a configurable bound and report which
//! recipients were delivered and which failed.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use omnicanal::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = OmnicanalConfig::load()?;
//!     let state = AppState::from_config(config)?;
//!
//!     let app = omnicanal::routes::router(state);
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:8000").await?;
//!     axum::serve(listener, app).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! The [`email`] module can also be used on its own, without the HTTP layer.

pub mod config;
pub mod email;
pub mod error;
pub mod middleware;
pub mod observability;
pub mod routes;
pub mod state;
pub mod testing;

pub mod prelude {
    //! Convenience re-exports for common types and traits
    //!
    //! # Examples
    //!
    //! ```rust
    //! use omnicanal::prelude::*;
    //! ```

    pub use crate::config::{ConfigError, OmnicanalConfig};
    pub use crate::email::{
        BulkRequest, BulkResult, EmailError, EmailSender, MailTransport, Recipient,
        RenderContext, SendOutcome, SendRequest, Sender,
    };
    pub use crate::error::AppError;
    pub use crate::state::AppState;
}
