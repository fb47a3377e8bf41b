//! Per-recipient subject lines
//!
//! Subjects use single-brace placeholders (`"Status - {name}"`) rather than
//! the body's template syntax. `{{` and `}}` produce literal braces.

use super::{EmailError, RenderContext};

/// Substitute `{key}` placeholders in a subject template
///
/// A template without placeholders is returned verbatim.
///
/// # Errors
///
/// Returns `EmailError::SubjectFormat` if a placeholder names a key missing
/// from `context`, if a placeholder is empty, or if a brace is unbalanced.
///
/// # Examples
///
/// ```rust
/// use omnicanal::email::{format_subject, RenderContext};
///
/// let context = RenderContext::new().with("name", "Ana");
/// assert_eq!(format_subject("Status - {name}", &context).unwrap(), "Status - Ana");
/// assert_eq!(format_subject("Welcome!", &context).unwrap(), "Welcome!");
/// ```
pub fn format_subject(template: &str, context: &RenderContext) -> Result<String, EmailError> {
    let mut output = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                output.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                output.push('}');
            }
            '{' => {
                let mut key = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some('{') | None => {
                            return Err(EmailError::subject(format!(
                                "unclosed placeholder in {template:?}"
                            )));
                        }
                        Some(k) => key.push(k),
                    }
                }

                let key = key.trim();
                if key.is_empty() {
                    return Err(EmailError::subject(format!(
                        "empty placeholder in {template:?}"
                    )));
                }

                let value = context
                    .get(key)
                    .ok_or_else(|| EmailError::subject(format!("missing variable '{key}'")))?;
                output.push_str(&value.to_string());
            }
            '}' => {
                return Err(EmailError::subject(format!(
                    "unmatched '}}' in {template:?}"
                )));
            }
            other => output.push(other),
        }
    }

    Ok(output)
}
