//! Email error types

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while rendering, assembling or delivering an email
///
/// Every variant is scoped to a single recipient: the sender turns them into
/// a failed [`SendOutcome`](super::SendOutcome) rather than aborting a batch.
#[derive(Debug, Error)]
pub enum EmailError {
    /// Template path does not resolve to an existing file
    #[error("template not found: {}", .0.display())]
    TemplateNotFound(PathBuf),

    /// Placeholder substitution failed (syntax error or undefined variable)
    #[error("failed to render email template: {0}")]
    TemplateSyntax(#[from] minijinja::Error),

    /// Markup to HTML conversion reported errors
    #[error("markup conversion failed: {}", .diagnostics.join("; "))]
    MarkupConversion {
        /// Diagnostics reported by the markup converter
        diagnostics: Vec<String>,
    },

    /// Attachment path does not resolve to an existing file
    #[error("attachment not found: {}", .0.display())]
    AttachmentNotFound(PathBuf),

    /// Subject template could not be personalised
    #[error("invalid subject template: {0}")]
    SubjectFormat(String),

    /// Invalid email address format
    #[error("invalid email address: {0}")]
    InvalidAddress(String),

    /// Transport-level failure (authentication, connection, timeout)
    #[error("transport error: {0}")]
    Transport(String),

    /// Email configuration error
    #[error("email configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EmailError {
    /// Create a transport error from a string message
    #[must_use]
    pub fn transport<T: Into<String>>(msg: T) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a subject format error from a string message
    #[must_use]
    pub fn subject<T: Into<String>>(msg: T) -> Self {
        Self::SubjectFormat(msg.into())
    }

    /// Create a configuration error from a string message
    #[must_use]
    pub fn config<T: Into<String>>(msg: T) -> Self {
        Self::Config(msg.into())
    }

    /// Short, stable name of the error kind, used as a log field
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::TemplateNotFound(_) => "template_not_found",
            Self::TemplateSyntax(_) => "template_syntax",
            Self::MarkupConversion { .. } => "markup_conversion",
            Self::AttachmentNotFound(_) => "attachment_not_found",
            Self::SubjectFormat(_) => "subject_format",
            Self::InvalidAddress(_) => "invalid_address",
            Self::Transport(_) => "transport",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markup_conversion_message_joins_diagnostics() {
        let err = EmailError::MarkupConversion {
            diagnostics: vec!["unexpected token".to_string(), "missing mj-body".to_string()],
        };

        assert_eq!(
            err.to_string(),
            "markup conversion failed: unexpected token; missing mj-body"
        );
        assert_eq!(err.kind(), "markup_conversion");
    }

    #[test]
    fn test_helpers() {
        assert!(matches!(EmailError::transport("refused"), EmailError::Transport(m) if m == "refused"));
        assert!(matches!(EmailError::subject("missing"), EmailError::SubjectFormat(_)));
        assert_eq!(EmailError::config("bad port").kind(), "config");
    }
}
