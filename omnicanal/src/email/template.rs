//! Template loading and rendering
//!
//! Rendering is a two-stage transform over a template read from disk:
//!
//! 1. Placeholder substitution with `minijinja` (`{{ name }}`). Undefined
//!    variables fail the render instead of silently producing empty text.
//! 2. Conversion of the markup dialect to HTML. `.mjml` templates are
//!    converted with `mrml`; any other template is already HTML.
//!
//! Templates are read at render time and never cached.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use minijinja::{AutoEscape, Environment, UndefinedBehavior};
use tracing::debug;

use super::{EmailError, RenderContext};

/// Markup dialect of a template file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkupDialect {
    /// MJML, converted to responsive HTML
    Mjml,
    /// Plain HTML, used as is
    Html,
}

impl MarkupDialect {
    /// Infer the dialect from a file extension
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("mjml") => Self::Mjml,
            _ => Self::Html,
        }
    }
}

/// A template file and its content
#[derive(Debug, Clone)]
pub struct TemplateSource {
    path: PathBuf,
    content: String,
}

impl TemplateSource {
    /// Read a template from disk
    ///
    /// # Errors
    ///
    /// Returns `EmailError::TemplateNotFound` if there is no file at `path`,
    /// or `EmailError::Io` if it cannot be read.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self, EmailError> {
        let path = path.into();
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(EmailError::TemplateNotFound(path));
            }
            Err(e) => return Err(EmailError::Io(e)),
        };

        Ok(Self { path, content })
    }

    /// Create a template source from in-memory content
    #[must_use]
    pub fn from_parts(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }

    /// Path the template was loaded from
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw template text
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Markup dialect of this template
    #[must_use]
    pub fn dialect(&self) -> MarkupDialect {
        MarkupDialect::from_path(&self.path)
    }
}

/// Final HTML produced from a template and its context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument(String);

impl RenderedDocument {
    /// Rendered HTML
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Take ownership of the rendered HTML
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<String> for RenderedDocument {
    fn from(html: String) -> Self {
        Self(html)
    }
}

/// Renders email templates
///
/// Relative template paths resolve against the configured template directory.
///
/// # Examples
///
/// ```rust,no_run
/// use omnicanal::email::{RenderContext, TemplateRenderer};
///
/// # async fn example() -> Result<(), omnicanal::email::EmailError> {
/// let renderer = TemplateRenderer::new("./templates");
/// let context = RenderContext::new().with("name", "Juan");
///
/// let document = renderer.render("welcome.mjml", &context).await?;
/// println!("{}", document.as_str());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct TemplateRenderer {
    env: Arc<Environment<'static>>,
    template_dir: PathBuf,
}

impl TemplateRenderer {
    /// Create a renderer rooted at `template_dir`
    #[must_use]
    pub fn new(template_dir: impl Into<PathBuf>) -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_auto_escape_callback(|_| AutoEscape::Html);

        Self {
            env: Arc::new(env),
            template_dir: template_dir.into(),
        }
    }

    /// Directory relative template paths resolve against
    #[must_use]
    pub fn template_dir(&self) -> &Path {
        &self.template_dir
    }

    /// Load the template at `path` and render it with `context`
    ///
    /// # Errors
    ///
    /// - `EmailError::TemplateNotFound` if the template file does not exist
    /// - `EmailError::TemplateSyntax` if substitution fails, including
    ///   references to variables missing from `context`
    /// - `EmailError::MarkupConversion` if the MJML cannot be converted
    pub async fn render(
        &self,
        path: impl AsRef<Path>,
        context: &RenderContext,
    ) -> Result<RenderedDocument, EmailError> {
        let source = TemplateSource::load(self.template_dir.join(path)).await?;
        self.render_source(&source, context)
    }

    /// Render an already loaded template
    ///
    /// # Errors
    ///
    /// See [`TemplateRenderer::render`].
    pub fn render_source(
        &self,
        source: &TemplateSource,
        context: &RenderContext,
    ) -> Result<RenderedDocument, EmailError> {
        let substituted = self.env.render_str(source.content(), context)?;

        let html = match source.dialect() {
            MarkupDialect::Mjml => mjml_to_html(&substituted)?,
            MarkupDialect::Html => substituted,
        };

        debug!(
            template = %source.path().display(),
            bytes = html.len(),
            "Rendered email template"
        );

        Ok(RenderedDocument(html))
    }
}

fn mjml_to_html(markup: &str) -> Result<String, EmailError> {
    let parsed = mrml::parse(markup).map_err(|e| EmailError::MarkupConversion {
        diagnostics: vec![e.to_string()],
    })?;

    parsed
        .element
        .render(&mrml::prelude::render::RenderOptions::default())
        .map_err(|e| EmailError::MarkupConversion {
            diagnostics: vec![e.to_string()],
        })
}
