//! HTTP-facing error type
//!
//! Handlers return [`AppError`]; it renders as
//! `{"message": ..., "status_code": ...}` and keeps diagnostic detail in the
//! logs rather than the response.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::warn;
use validator::ValidationErrorsKind;

/// Errors returned by HTTP handlers
#[derive(Debug, Error)]
pub enum AppError {
    /// Payload failed validation or does not match the expected shape (422)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Malformed or unreadable request body (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Body is not declared as JSON (415)
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// Body exceeds the configured limit (413)
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),
}

impl AppError {
    /// HTTP status for this error
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }

    fn message(&self) -> &str {
        match self {
            Self::Validation(msg)
            | Self::BadRequest(msg)
            | Self::UnsupportedMediaType(msg)
            | Self::PayloadTooLarge(msg) => msg,
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .errors()
            .iter()
            .map(|(field, kind)| match kind {
                ValidationErrorsKind::Field(errs) => {
                    let codes: Vec<&str> = errs.iter().map(|e| &*e.code).collect();
                    format!("{field}: {}", codes.join(", "))
                }
                ValidationErrorsKind::Struct(_) | ValidationErrorsKind::List(_) => {
                    format!("{field}: invalid")
                }
            })
            .collect();
        fields.sort();

        if fields.is_empty() {
            Self::Validation("invalid payload".to_string())
        } else {
            Self::Validation(fields.join("; "))
        }
    }
}

/// Extractor failures keep their status; the serde detail is only logged.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        let status = rejection.status();
        warn!(
            status = status.as_u16(),
            error = %rejection.body_text(),
            "Rejected request body"
        );

        match rejection {
            JsonRejection::JsonDataError(_) => {
                Self::Validation("request body does not match the expected fields".to_string())
            }
            JsonRejection::JsonSyntaxError(_) => {
                Self::BadRequest("request body is not valid JSON".to_string())
            }
            JsonRejection::MissingJsonContentType(_) => {
                Self::UnsupportedMediaType("expected Content-Type: application/json".to_string())
            }
            _ if status == StatusCode::PAYLOAD_TOO_LARGE => {
                Self::PayloadTooLarge("request body is too large".to_string())
            }
            _ => Self::BadRequest("request body could not be read".to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = Json(json!({
            "message": self.message(),
            "status_code": status.as_u16(),
        }));

        (status, body).into_response()
    }
}
