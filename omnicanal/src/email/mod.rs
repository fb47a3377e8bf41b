//! Templated email sending
//!
//! This module provides:
//! - Template rendering (`minijinja` placeholders, MJML to HTML via `mrml`)
//! - Per-recipient subject personalisation
//! - Message assembly with CC, BCC and file attachments
//! - Transports (SMTP, console)
//! - Single and bulk sending with per-recipient failure isolation
//!
//! # Examples
//!
//! ## Sending a single email
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use omnicanal::email::{
//!     EmailSender, RenderContext, SendRequest, Sender, SmtpConfig, SmtpSecurity, SmtpTransport,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = SmtpTransport::new(&SmtpConfig {
//!     host: "smtp.example.com".to_string(),
//!     port: 587,
//!     username: "mailer@example.com".to_string(),
//!     password: "secret".to_string(),
//!     security: SmtpSecurity::StartTls,
//!     timeout: None,
//! })?;
//!
//! let sender = EmailSender::new(
//!     Arc::new(transport),
//!     Sender::new("mailer@example.com", Some("Omnicanal".to_string())),
//! )
//! .with_template_dir("./templates");
//!
//! let outcome = sender
//!     .send_one(
//!         SendRequest::new("juan@example.com", "Welcome", "welcome.mjml")
//!             .variables(RenderContext::new().with("name", "Juan Pérez"))
//!             .attachment("documents/example.pdf"),
//!     )
//!     .await;
//!
//! assert!(outcome.is_delivered());
//! # Ok(())
//! # }
//! ```

mod builder;
mod context;
mod error;
mod sender;
mod subject;
mod template;
pub mod transport;

pub use builder::{Attachment, MessageBuilder, MessageEnvelope, Sender};
pub use context::{ContextValue, RenderContext};
pub use error::EmailError;
pub use sender::{
    BulkRequest, BulkResult, EmailSender, Recipient, SendOutcome, SendRequest,
    DEFAULT_MAX_CONCURRENCY,
};
pub use subject::format_subject;
pub use template::{MarkupDialect, RenderedDocument, TemplateRenderer, TemplateSource};
pub use transport::{
    console::ConsoleTransport,
    smtp::{SmtpConfig, SmtpSecurity, SmtpTransport},
    MailTransport,
};
