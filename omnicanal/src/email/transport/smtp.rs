//! SMTP transport
//!
//! Uses the `lettre` crate to deliver messages through an SMTP relay. The
//! underlying transport is built once and shared by all concurrent sends.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use lettre::{
    message::{
        header::{ContentTransferEncoding, ContentType},
        Attachment as MimeAttachment, Body, Mailbox, MultiPart, SinglePart,
    },
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use serde::{Deserialize, Serialize};

use super::MailTransport;
use crate::email::{EmailError, MessageEnvelope, Sender};

/// Connection security for the SMTP session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmtpSecurity {
    /// Plaintext session, no TLS at all
    None,
    /// Plaintext connection upgraded with STARTTLS (usually port 587)
    #[default]
    StartTls,
    /// Implicit TLS from the first byte (usually port 465)
    Tls,
}

/// SMTP transport configuration
#[derive(Clone)]
pub struct SmtpConfig {
    /// SMTP server hostname
    pub host: String,

    /// SMTP server port
    pub port: u16,

    /// SMTP username; no authentication is attempted when empty
    pub username: String,

    /// SMTP password
    pub password: String,

    /// Connection security
    pub security: SmtpSecurity,

    /// Connection and command timeout
    pub timeout: Option<Duration>,
}

impl fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("security", &self.security)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// SMTP mail transport
///
/// # Examples
///
/// ```rust,no_run
/// use omnicanal::email::{SmtpConfig, SmtpSecurity, SmtpTransport};
///
/// # fn example() -> Result<(), omnicanal::email::EmailError> {
/// let transport = SmtpTransport::new(&SmtpConfig {
///     host: "smtp.example.com".to_string(),
///     port: 587,
///     username: "mailer@example.com".to_string(),
///     password: "secret".to_string(),
///     security: SmtpSecurity::StartTls,
///     timeout: None,
/// })?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SmtpTransport {
    inner: AsyncSmtpTransport<Tokio1Executor>,
}

impl fmt::Debug for SmtpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpTransport").finish_non_exhaustive()
    }
}

impl SmtpTransport {
    /// Build the transport from configuration
    ///
    /// No connection is opened until the first message is sent.
    ///
    /// # Errors
    ///
    /// Returns `EmailError::Config` if TLS parameters cannot be created for
    /// the configured host.
    pub fn new(config: &SmtpConfig) -> Result<Self, EmailError> {
        let mut builder = match config.security {
            SmtpSecurity::None => {
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
            }
            SmtpSecurity::StartTls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                    .map_err(|e| EmailError::config(format!("STARTTLS setup failed: {e}")))?
            }
            SmtpSecurity::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .map_err(|e| EmailError::config(format!("TLS setup failed: {e}")))?,
        };

        builder = builder.port(config.port).timeout(config.timeout);

        if !config.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ));
        }

        Ok(Self {
            inner: builder.build(),
        })
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, EmailError> {
    address
        .parse()
        .map_err(|_| EmailError::InvalidAddress(address.to_string()))
}

/// Convert an envelope into a MIME message
///
/// The body is a `multipart/mixed` whose first part is the HTML document,
/// followed by one base64-encoded part per attachment.
pub(crate) fn build_message(from: &Sender, envelope: &MessageEnvelope) -> Result<Message, EmailError> {
    let from_address = from
        .email
        .parse()
        .map_err(|_| EmailError::InvalidAddress(from.email.clone()))?;

    let mut builder = Message::builder()
        .from(Mailbox::new(from.name.clone(), from_address))
        .to(parse_mailbox(&envelope.to)?)
        .subject(envelope.subject.clone());

    for cc in &envelope.cc {
        builder = builder.cc(parse_mailbox(cc)?);
    }

    for bcc in &envelope.bcc {
        builder = builder.bcc(parse_mailbox(bcc)?);
    }

    let mut body = MultiPart::mixed().singlepart(SinglePart::html(envelope.html.clone()));

    for attachment in &envelope.attachments {
        let content_type = ContentType::parse(&attachment.content_type).map_err(|e| {
            EmailError::transport(format!(
                "invalid content type for {}: {e}",
                attachment.filename
            ))
        })?;

        let content =
            Body::new_with_encoding(attachment.content.clone(), ContentTransferEncoding::Base64)
                .map_err(|_| {
                    EmailError::transport(format!("cannot encode {}", attachment.filename))
                })?;

        body = body.singlepart(
            MimeAttachment::new(attachment.filename.clone()).body(content, content_type),
        );
    }

    builder
        .multipart(body)
        .map_err(|e| EmailError::transport(e.to_string()))
}

#[async_trait]
impl MailTransport for SmtpTransport {
    async fn send(&self, from: &Sender, envelope: MessageEnvelope) -> Result<(), EmailError> {
        let message = build_message(from, &envelope)?;

        self.inner
            .send(message)
            .await
            .map_err(|e| EmailError::transport(e.to_string()))?;

        Ok(())
    }
}
