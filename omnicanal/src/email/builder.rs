//! Message assembly
//!
//! Turns a rendered body into a [`MessageEnvelope`] ready for a transport,
//! reading attachments from disk along the way.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{EmailError, RenderedDocument};

/// The fixed From identity of a sender instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sender {
    /// From address
    pub email: String,

    /// Optional display name
    pub name: Option<String>,
}

impl Sender {
    /// Create a sender identity
    #[must_use]
    pub fn new(email: impl Into<String>, name: Option<String>) -> Self {
        Self {
            email: email.into(),
            name,
        }
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{name} <{}>", self.email),
            None => f.write_str(&self.email),
        }
    }
}

/// A file attached to a message
#[derive(Clone, PartialEq, Eq)]
pub struct Attachment {
    /// File name presented to the recipient
    pub filename: String,

    /// MIME type of the content
    pub content_type: String,

    /// Raw file bytes
    pub content: Vec<u8>,
}

impl Attachment {
    /// Create a binary attachment
    #[must_use]
    pub fn new(filename: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content_type: mime::APPLICATION_OCTET_STREAM.to_string(),
            content,
        }
    }
}

impl fmt::Debug for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .field("size", &self.content.len())
            .finish()
    }
}

/// A fully assembled message for a single recipient
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEnvelope {
    /// Recipient (To)
    pub to: String,

    /// Subject line
    pub subject: String,

    /// HTML body
    pub html: String,

    /// CC recipients, in the order given
    pub cc: Vec<String>,

    /// BCC recipients, in the order given
    pub bcc: Vec<String>,

    /// Attached files
    pub attachments: Vec<Attachment>,
}

impl MessageEnvelope {
    /// Create an envelope with no CC, BCC or attachments
    #[must_use]
    pub fn new(to: impl Into<String>, subject: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            html: html.into(),
            cc: Vec::new(),
            bcc: Vec::new(),
            attachments: Vec::new(),
        }
    }
}

/// Builds envelopes, resolving attachment paths against a base directory
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    attachment_dir: PathBuf,
}

impl MessageBuilder {
    /// Create a builder; relative attachment paths resolve against `attachment_dir`
    #[must_use]
    pub fn new(attachment_dir: impl Into<PathBuf>) -> Self {
        Self {
            attachment_dir: attachment_dir.into(),
        }
    }

    /// Assemble an envelope
    ///
    /// Attachments are read fully into memory.
    ///
    /// # Errors
    ///
    /// Returns `EmailError::AttachmentNotFound` if an attachment path does not
    /// exist, or `EmailError::Io` if it cannot be read.
    pub async fn build(
        &self,
        to: &str,
        subject: &str,
        body: RenderedDocument,
        attachments: &[PathBuf],
        cc: &[String],
        bcc: &[String],
    ) -> Result<MessageEnvelope, EmailError> {
        let mut envelope = MessageEnvelope::new(to, subject, body.into_string());
        envelope.cc = cc.to_vec();
        envelope.bcc = bcc.to_vec();

        for path in attachments {
            envelope.attachments.push(self.load_attachment(path).await?);
        }

        Ok(envelope)
    }

    async fn load_attachment(&self, path: &Path) -> Result<Attachment, EmailError> {
        let resolved = self.attachment_dir.join(path);

        let content = match tokio::fs::read(&resolved).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(EmailError::AttachmentNotFound(resolved));
            }
            Err(e) => return Err(EmailError::Io(e)),
        };

        let filename = resolved
            .file_name()
            .map_or_else(|| "attachment".to_string(), |name| name.to_string_lossy().into_owned());

        Ok(Attachment::new(filename, content))
    }
}
