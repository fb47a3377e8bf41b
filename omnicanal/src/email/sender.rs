//! Single and bulk email sending
//!
//! [`EmailSender::send_one`] runs render → build → transport for one
//! recipient and reports the result as a [`SendOutcome`]; it never returns an
//! error. [`EmailSender::send_bulk`] fans `send_one` out over a batch of
//! recipients, waits for every send to settle and partitions the recipients
//! into delivered and failed.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::{
    format_subject, EmailError, MailTransport, MessageBuilder, RenderContext, Sender,
    TemplateRenderer,
};

/// Default bound on simultaneous in-flight sends in a batch
pub const DEFAULT_MAX_CONCURRENCY: usize = 8;

/// A single templated email
///
/// # Examples
///
/// ```rust
/// use omnicanal::email::{RenderContext, SendRequest};
///
/// let request = SendRequest::new("user@example.com", "Welcome", "welcome.mjml")
///     .variables(RenderContext::new().with("name", "Juan"))
///     .attachment("documents/terms.pdf")
///     .cc("manager@example.com");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SendRequest {
    /// Recipient address
    pub to: String,

    /// Subject line
    pub subject: String,

    /// Template path
    pub template: PathBuf,

    /// Template variables
    #[serde(default)]
    pub variables: RenderContext,

    /// Attachment paths
    #[serde(default)]
    pub attachments: Vec<PathBuf>,

    /// CC recipients
    #[serde(default)]
    pub cc: Vec<String>,

    /// BCC recipients
    #[serde(default)]
    pub bcc: Vec<String>,
}

impl SendRequest {
    /// Create a request with no variables, attachments or copies
    #[must_use]
    pub fn new(
        to: impl Into<String>,
        subject: impl Into<String>,
        template: impl Into<PathBuf>,
    ) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            template: template.into(),
            ..Self::default()
        }
    }

    /// Set the template variables
    #[must_use]
    pub fn variables(mut self, variables: RenderContext) -> Self {
        self.variables = variables;
        self
    }

    /// Add an attachment
    #[must_use]
    pub fn attachment(mut self, path: impl Into<PathBuf>) -> Self {
        self.attachments.push(path.into());
        self
    }

    /// Add a CC recipient
    #[must_use]
    pub fn cc(mut self, address: impl Into<String>) -> Self {
        self.cc.push(address.into());
        self
    }

    /// Add a BCC recipient
    #[must_use]
    pub fn bcc(mut self, address: impl Into<String>) -> Self {
        self.bcc.push(address.into());
        self
    }
}

/// One recipient of a bulk send
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipient {
    /// Recipient address
    pub email: String,

    /// Variables for this recipient's subject and body
    #[serde(default)]
    pub variables: RenderContext,
}

impl Recipient {
    /// Create a recipient
    #[must_use]
    pub fn new(email: impl Into<String>, variables: RenderContext) -> Self {
        Self {
            email: email.into(),
            variables,
        }
    }
}

/// A personalised send to many recipients
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkRequest {
    /// Recipients, each with their own variables
    pub recipients: Vec<Recipient>,

    /// Subject template; `{key}` placeholders are filled per recipient
    pub subject: String,

    /// Template path
    pub template: PathBuf,

    /// Attachment paths shared by every recipient
    #[serde(default)]
    pub attachments: Vec<PathBuf>,
}

impl BulkRequest {
    /// Create a bulk request with no attachments
    #[must_use]
    pub fn new(
        recipients: Vec<Recipient>,
        subject: impl Into<String>,
        template: impl Into<PathBuf>,
    ) -> Self {
        Self {
            recipients,
            subject: subject.into(),
            template: template.into(),
            attachments: Vec::new(),
        }
    }

    /// Add an attachment shared by every recipient
    #[must_use]
    pub fn attachment(mut self, path: impl Into<PathBuf>) -> Self {
        self.attachments.push(path.into());
        self
    }
}

/// Result of sending to one recipient
#[derive(Debug)]
pub enum SendOutcome {
    /// The transport accepted the message
    Delivered {
        /// Recipient address
        recipient: String,
    },
    /// Rendering, assembly or delivery failed
    Failed {
        /// Recipient address
        recipient: String,
        /// Cause of the failure
        error: EmailError,
    },
}

impl SendOutcome {
    /// Recipient address
    #[must_use]
    pub fn recipient(&self) -> &str {
        match self {
            Self::Delivered { recipient } | Self::Failed { recipient, .. } => recipient,
        }
    }

    /// Whether the message was delivered
    #[must_use]
    pub const fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }

    /// The failure cause, if any
    #[must_use]
    pub const fn error(&self) -> Option<&EmailError> {
        match self {
            Self::Delivered { .. } => None,
            Self::Failed { error, .. } => Some(error),
        }
    }
}

/// Recipients of a bulk send, partitioned by outcome
///
/// Each list keeps the order recipients were given in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkResult {
    /// Recipients whose message was delivered
    pub delivered: Vec<String>,

    /// Recipients whose message failed
    pub failed: Vec<String>,
}

impl BulkResult {
    /// Total number of recipients accounted for
    #[must_use]
    pub fn total(&self) -> usize {
        self.delivered.len() + self.failed.len()
    }
}

enum Pending {
    Settled(SendOutcome),
    Running(JoinHandle<SendOutcome>),
}

/// Sends templated emails through a [`MailTransport`]
///
/// The From identity, template and attachment directories, concurrency bound
/// and timeout are fixed at construction and shared read-only by every send.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use omnicanal::email::{
///     BulkRequest, ConsoleTransport, EmailSender, Recipient, RenderContext, Sender,
/// };
///
/// # async fn example() {
/// let sender = EmailSender::new(
///     Arc::new(ConsoleTransport::new()),
///     Sender::new("noreply@example.com", Some("Omnicanal".to_string())),
/// )
/// .with_template_dir("./templates")
/// .with_max_concurrency(4);
///
/// let result = sender
///     .send_bulk(BulkRequest::new(
///         vec![Recipient::new("ana@example.com", RenderContext::new().with("name", "Ana"))],
///         "Account statement - {name}",
///         "statement.mjml",
///     ))
///     .await;
///
/// println!("delivered: {:?}, failed: {:?}", result.delivered, result.failed);
/// # }
/// ```
#[derive(Clone)]
pub struct EmailSender {
    transport: Arc<dyn MailTransport>,
    renderer: TemplateRenderer,
    builder: MessageBuilder,
    from: Sender,
    max_concurrency: usize,
    send_timeout: Option<Duration>,
}

impl std::fmt::Debug for EmailSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailSender")
            .field("renderer", &self.renderer.template_dir())
            .field("from", &self.from)
            .field("max_concurrency", &self.max_concurrency)
            .field("send_timeout", &self.send_timeout)
            .finish_non_exhaustive()
    }
}

impl EmailSender {
    /// Create a sender resolving templates and attachments against the
    /// working directory
    #[must_use]
    pub fn new(transport: Arc<dyn MailTransport>, from: Sender) -> Self {
        Self {
            transport,
            renderer: TemplateRenderer::new("."),
            builder: MessageBuilder::new("."),
            from,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            send_timeout: None,
        }
    }

    /// Resolve relative template paths against `dir`
    #[must_use]
    pub fn with_template_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.renderer = TemplateRenderer::new(dir);
        self
    }

    /// Resolve relative attachment paths against `dir`
    #[must_use]
    pub fn with_attachment_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.builder = MessageBuilder::new(dir);
        self
    }

    /// Bound the number of simultaneous in-flight sends in a batch
    ///
    /// Values below 1 are raised to 1.
    #[must_use]
    pub fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = limit.clamp(1, Semaphore::MAX_PERMITS);
        self
    }

    /// Fail any single transport call that takes longer than `timeout`
    #[must_use]
    pub const fn with_send_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.send_timeout = timeout;
        self
    }

    /// The From identity
    #[must_use]
    pub const fn identity(&self) -> &Sender {
        &self.from
    }

    /// The concurrency bound for batches
    #[must_use]
    pub const fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Send one email
    ///
    /// Every failure (missing template, render error, missing attachment,
    /// transport error) is logged and returned as [`SendOutcome::Failed`].
    /// There are no retries.
    pub async fn send_one(&self, request: SendRequest) -> SendOutcome {
        let recipient = request.to.clone();

        match self.try_send(request).await {
            Ok(()) => {
                info!(recipient = %recipient, "Email delivered");
                SendOutcome::Delivered { recipient }
            }
            Err(error) => {
                warn!(
                    recipient = %recipient,
                    kind = error.kind(),
                    error = %error,
                    "Email delivery failed"
                );
                SendOutcome::Failed { recipient, error }
            }
        }
    }

    async fn try_send(&self, request: SendRequest) -> Result<(), EmailError> {
        let body = self
            .renderer
            .render(&request.template, &request.variables)
            .await?;

        let envelope = self
            .builder
            .build(
                &request.to,
                &request.subject,
                body,
                &request.attachments,
                &request.cc,
                &request.bcc,
            )
            .await?;

        let delivery = self.transport.send(&self.from, envelope);

        match self.send_timeout {
            Some(limit) => tokio::time::timeout(limit, delivery).await.map_err(|_| {
                EmailError::transport(format!("send timed out after {}ms", limit.as_millis()))
            })?,
            None => delivery.await,
        }
    }

    /// Send a personalised email to every recipient
    ///
    /// Each recipient's subject is produced from the subject template and
    /// their variables; a recipient whose subject cannot be produced fails
    /// without affecting the others. Sends run concurrently, at most
    /// `max_concurrency` at a time, and this returns once all of them have
    /// settled. A send that panics counts as failed for its recipient only.
    ///
    /// A recipient address repeated within the batch is sent to once, so
    /// [`BulkResult::total`] equals the number of distinct addresses, which
    /// is less than `recipients.len()` when the batch has duplicates.
    pub async fn send_bulk(&self, request: BulkRequest) -> BulkResult {
        let BulkRequest {
            recipients,
            subject,
            template,
            attachments,
        } = request;

        if recipients.is_empty() {
            return BulkResult::default();
        }

        let shared = Arc::new(self.clone());
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut seen = HashSet::with_capacity(recipients.len());
        let mut pending = Vec::with_capacity(recipients.len());

        for recipient in recipients {
            if !seen.insert(recipient.email.clone()) {
                warn!(recipient = %recipient.email, "Duplicate recipient in batch, skipping");
                continue;
            }

            let address = recipient.email;

            let subject = match format_subject(&subject, &recipient.variables) {
                Ok(subject) => subject,
                Err(error) => {
                    warn!(
                        recipient = %address,
                        kind = error.kind(),
                        error = %error,
                        "Email delivery failed"
                    );
                    pending.push((
                        address.clone(),
                        Pending::Settled(SendOutcome::Failed {
                            recipient: address,
                            error,
                        }),
                    ));
                    continue;
                }
            };

            let request = SendRequest {
                to: address.clone(),
                subject,
                template: template.clone(),
                variables: recipient.variables,
                attachments: attachments.clone(),
                cc: Vec::new(),
                bcc: Vec::new(),
            };

            let sender = Arc::clone(&shared);
            let semaphore = Arc::clone(&semaphore);
            let handle = tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return SendOutcome::Failed {
                        recipient: request.to,
                        error: EmailError::transport("send queue closed"),
                    };
                };
                sender.send_one(request).await
            });

            pending.push((address, Pending::Running(handle)));
        }

        let mut result = BulkResult::default();

        for (address, task) in pending {
            let delivered = match task {
                Pending::Settled(outcome) => outcome.is_delivered(),
                Pending::Running(handle) => match handle.await {
                    Ok(outcome) => outcome.is_delivered(),
                    Err(e) => {
                        error!(recipient = %address, error = %e, "Send task did not complete");
                        false
                    }
                },
            };

            if delivered {
                result.delivered.push(address);
            } else {
                result.failed.push(address);
            }
        }

        info!(
            delivered = result.delivered.len(),
            failed = result.failed.len(),
            "Bulk send finished"
        );

        result
    }
}
