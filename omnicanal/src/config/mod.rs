//! Configuration management for omnicanal
//!
//! Configuration is loaded from multiple sources with clear precedence:
//!
//! 1. Environment variables (highest priority, `OMNICANAL_` prefix, `__`
//!    between section and key, e.g. `OMNICANAL_EMAIL__HOST`)
//! 2. `./config.toml` (or an explicit path)
//! 3. Hardcoded defaults (fallback)
//!
//! # Example Configuration
//!
//! ```toml
//! # config.toml
//! [app]
//! name = "omnicanal"
//! env = "development"
//!
//! [server]
//! port = 8000
//!
//! [logging]
//! level = "debug"
//! request_logging = true
//! show_headers = false
//!
//! [email]
//! host = "smtp.gmail.com"
//! port = 587
//! username = "mailer@example.com"
//! security = "starttls"
//! from_name = "Omnicanal"
//! max_concurrency = 8
//! send_timeout_secs = 30
//!
//! [templates]
//! template_dir = "./templates"
//! attachment_dir = "./documents"
//! ```
//!
//! The SMTP password is best supplied through `OMNICANAL_EMAIL__PASSWORD`.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::email::{
    ConsoleTransport, EmailError, EmailSender, MailTransport, Sender, SmtpConfig, SmtpSecurity,
    SmtpTransport, DEFAULT_MAX_CONCURRENCY,
};

/// Prefix for configuration environment variables
pub const ENV_PREFIX: &str = "OMNICANAL_";

/// Errors raised while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A source could not be read or a value has the wrong shape
    #[error("failed to load configuration: {0}")]
    Load(#[from] figment::Error),
}

/// Application identity and environment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Service name, used in logs and the index route
    pub name: String,

    /// Deployment environment (`production`, `development`, ...)
    pub env: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            name: "omnicanal".to_string(),
            env: "production".to_string(),
        }
    }
}

impl AppSettings {
    /// Whether the service runs in production
    #[must_use]
    pub fn is_production(&self) -> bool {
        self.env.eq_ignore_ascii_case("production")
    }
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Bind address
    pub host: String,

    /// Bind port
    pub port: u16,

    /// Maximum request body size in bytes
    pub body_limit_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            body_limit_bytes: 1024 * 1024,
        }
    }
}

impl ServerSettings {
    /// `host:port` string to bind to
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable, multi-line
    Pretty,
    /// One JSON object per line
    Json,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,

    /// Output format; JSON in production, pretty otherwise when unset
    pub format: Option<LogFormat>,

    /// Log every request and response, even outside production
    pub request_logging: bool,

    /// Include request headers in request logs
    pub show_headers: bool,

    /// Paths whose request bodies are never logged
    pub redacted_paths: Vec<String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: None,
            request_logging: false,
            show_headers: false,
            redacted_paths: vec!["/user/login".to_string()],
        }
    }
}

/// Which transport delivers email
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailBackend {
    /// Deliver through SMTP
    #[default]
    Smtp,
    /// Log messages instead of sending them
    Console,
}

/// Email delivery settings
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailSettings {
    /// Transport to use
    pub backend: EmailBackend,

    /// SMTP server hostname
    pub host: String,

    /// SMTP server port
    pub port: u16,

    /// SMTP username
    pub username: String,

    /// SMTP password
    pub password: String,

    /// Connection security
    pub security: SmtpSecurity,

    /// From address; defaults to `username`
    pub from_email: Option<String>,

    /// From display name
    pub from_name: Option<String>,

    /// Maximum simultaneous in-flight sends in a bulk batch
    pub max_concurrency: usize,

    /// Per-send timeout in seconds
    pub send_timeout_secs: Option<u64>,
}

impl Default for EmailSettings {
    fn default() -> Self {
        Self {
            backend: EmailBackend::default(),
            host: "localhost".to_string(),
            port: 587,
            username: String::new(),
            password: String::new(),
            security: SmtpSecurity::default(),
            from_email: None,
            from_name: None,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            send_timeout_secs: None,
        }
    }
}

impl fmt::Debug for EmailSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailSettings")
            .field("backend", &self.backend)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("security", &self.security)
            .field("from_email", &self.from_email)
            .field("from_name", &self.from_name)
            .field("max_concurrency", &self.max_concurrency)
            .field("send_timeout_secs", &self.send_timeout_secs)
            .finish()
    }
}

impl EmailSettings {
    /// Per-send timeout
    #[must_use]
    pub fn send_timeout(&self) -> Option<Duration> {
        self.send_timeout_secs.map(Duration::from_secs)
    }

    /// SMTP transport configuration
    #[must_use]
    pub fn smtp_config(&self) -> SmtpConfig {
        SmtpConfig {
            host: self.host.clone(),
            port: self.port,
            username: self.username.clone(),
            password: self.password.clone(),
            security: self.security,
            timeout: self.send_timeout(),
        }
    }

    /// The From identity
    ///
    /// # Errors
    ///
    /// Returns `EmailError::Config` if neither `from_email` nor `username`
    /// is set.
    pub fn sender(&self) -> Result<Sender, EmailError> {
        let email = self
            .from_email
            .clone()
            .filter(|email| !email.is_empty())
            .or_else(|| (!self.username.is_empty()).then(|| self.username.clone()))
            .ok_or_else(|| EmailError::config("set email.from_email or email.username"))?;

        Ok(Sender::new(email, self.from_name.clone()))
    }

    /// Build the configured transport
    ///
    /// # Errors
    ///
    /// Returns `EmailError::Config` if the SMTP transport cannot be created.
    pub fn build_transport(&self) -> Result<Arc<dyn MailTransport>, EmailError> {
        Ok(match self.backend {
            EmailBackend::Smtp => Arc::new(SmtpTransport::new(&self.smtp_config())?),
            EmailBackend::Console => Arc::new(ConsoleTransport::verbose()),
        })
    }
}

/// Template and attachment locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateSettings {
    /// Directory relative template paths resolve against
    pub template_dir: PathBuf,

    /// Directory relative attachment paths resolve against
    pub attachment_dir: PathBuf,
}

impl Default for TemplateSettings {
    fn default() -> Self {
        Self {
            template_dir: PathBuf::from("./templates"),
            attachment_dir: PathBuf::from("."),
        }
    }
}

/// Complete omnicanal configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OmnicanalConfig {
    /// Application settings
    #[serde(default)]
    pub app: AppSettings,

    /// HTTP server settings
    #[serde(default)]
    pub server: ServerSettings,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Email delivery settings
    #[serde(default)]
    pub email: EmailSettings,

    /// Template settings
    #[serde(default)]
    pub templates: TemplateSettings,
}

impl OmnicanalConfig {
    /// Load configuration from `./config.toml` and the environment
    ///
    /// A missing file is not an error.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use omnicanal::config::OmnicanalConfig;
    ///
    /// # fn example() -> Result<(), omnicanal::config::ConfigError> {
    /// let config = OmnicanalConfig::load()?;
    /// let port = config.server.port;
    /// # Ok(())
    /// # }
    /// ```
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config.toml")
    }

    /// Load configuration from a specific file and the environment
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Ok(Self::figment(path).extract()?)
    }

    /// The layered configuration sources
    #[must_use]
    pub fn figment(path: impl AsRef<Path>) -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Whether the request logger should be installed
    #[must_use]
    pub fn should_log_requests(&self) -> bool {
        self.app.is_production() || self.logging.request_logging
    }

    /// Effective log format
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.logging.format.unwrap_or(if self.app.is_production() {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        })
    }

    /// Build an [`EmailSender`] from the email and template settings
    ///
    /// # Errors
    ///
    /// Returns `EmailError::Config` if the sender identity or transport is
    /// misconfigured.
    pub fn email_sender(&self) -> Result<EmailSender, EmailError> {
        let identity = self.email.sender()?;
        let sender = EmailSender::new(self.email.build_transport()?, identity)
            .with_template_dir(&self.templates.template_dir)
            .with_attachment_dir(&self.templates.attachment_dir)
            .with_max_concurrency(self.email.max_concurrency)
            .with_send_timeout(self.email.send_timeout());

        Ok(sender)
    }
}
