//! HTTP routes
//!
//! - `GET /` - service name and version
//! - `POST /email/send` - one templated email, `{"success": bool}`
//! - `POST /email/bulk` - personalised batch, `{"delivered": [...], "failed": [...]}`
//!
//! Delivery failures are reported through the response body only as a
//! boolean or an address list; the cause is logged. Malformed or invalid
//! payloads are answered by [`AppError`].

use std::path::{Component, Path, PathBuf};

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::limit::RequestBodyLimitLayer;
use validator::{Validate, ValidateEmail, ValidationError};

use crate::email::{BulkRequest, BulkResult, Recipient, RenderContext, SendRequest};
use crate::error::AppError;
use crate::middleware::RequestLogger;
use crate::state::AppState;

/// Build the application router
///
/// The request logger is installed only when request logging is enabled.
pub fn router(state: AppState) -> Router {
    let config = state.config().clone();

    let mut router = Router::new()
        .route("/", get(index))
        .route("/email/send", post(send_email))
        .route("/email/bulk", post(send_bulk))
        .with_state(state);

    if config.should_log_requests() {
        router = router.layer(axum::middleware::from_fn_with_state(
            RequestLogger::new(&config.logging),
            RequestLogger::middleware,
        ));
    }

    router.layer(RequestBodyLimitLayer::new(config.server.body_limit_bytes))
}

/// Body of `POST /email/send`
#[derive(Debug, Deserialize, Validate)]
pub struct SendEmailPayload {
    /// Recipient address
    #[validate(email)]
    pub to: String,

    /// Subject line
    #[validate(length(min = 1))]
    pub subject: String,

    /// Template path, relative to the template directory
    #[validate(custom(function = "relative_path"))]
    pub template: String,

    /// Template variables
    #[serde(default)]
    pub variables: RenderContext,

    /// Attachment paths, relative to the attachment directory
    #[serde(default)]
    #[validate(custom(function = "relative_paths"))]
    pub attachments: Vec<String>,

    /// CC addresses
    #[serde(default)]
    #[validate(custom(function = "email_list"))]
    pub cc: Vec<String>,

    /// BCC addresses
    #[serde(default)]
    #[validate(custom(function = "email_list"))]
    pub bcc: Vec<String>,
}

impl From<SendEmailPayload> for SendRequest {
    fn from(payload: SendEmailPayload) -> Self {
        Self {
            to: payload.to,
            subject: payload.subject,
            template: PathBuf::from(payload.template),
            variables: payload.variables,
            attachments: payload.attachments.into_iter().map(PathBuf::from).collect(),
            cc: payload.cc,
            bcc: payload.bcc,
        }
    }
}

/// One recipient in `POST /email/bulk`
#[derive(Debug, Deserialize, Validate)]
pub struct RecipientPayload {
    /// Recipient address
    #[validate(email)]
    pub email: String,

    /// Variables for this recipient
    #[serde(default)]
    pub variables: RenderContext,
}

/// Body of `POST /email/bulk`
#[derive(Debug, Deserialize, Validate)]
pub struct BulkEmailPayload {
    /// Recipients; an empty list sends nothing
    #[validate(nested)]
    pub recipients: Vec<RecipientPayload>,

    /// Subject template with `{key}` placeholders
    #[validate(length(min = 1))]
    pub subject: String,

    /// Template path, relative to the template directory
    #[validate(custom(function = "relative_path"))]
    pub template: String,

    /// Attachment paths shared by every recipient
    #[serde(default)]
    #[validate(custom(function = "relative_paths"))]
    pub attachments: Vec<String>,
}

impl From<BulkEmailPayload> for BulkRequest {
    fn from(payload: BulkEmailPayload) -> Self {
        Self {
            recipients: payload
                .recipients
                .into_iter()
                .map(|r| Recipient::new(r.email, r.variables))
                .collect(),
            subject: payload.subject,
            template: PathBuf::from(payload.template),
            attachments: payload.attachments.into_iter().map(PathBuf::from).collect(),
        }
    }
}

/// Reject empty, absolute and parent-escaping paths
fn relative_path(path: &str) -> Result<(), ValidationError> {
    let path = Path::new(path);

    let contained = !path.as_os_str().is_empty()
        && path
            .components()
            .all(|component| matches!(component, Component::Normal(_) | Component::CurDir));

    if contained {
        Ok(())
    } else {
        Err(ValidationError::new("relative_path"))
    }
}

fn relative_paths(paths: &[String]) -> Result<(), ValidationError> {
    paths.iter().try_for_each(|path| relative_path(path))
}

fn email_list(addresses: &[String]) -> Result<(), ValidationError> {
    if addresses.iter().all(|address| address.validate_email()) {
        Ok(())
    } else {
        Err(ValidationError::new("email"))
    }
}

async fn index(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "service": state.config().app.name,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn send_email(
    State(state): State<AppState>,
    payload: Result<Json<SendEmailPayload>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let outcome = state.sender().send_one(payload.into()).await;

    Ok(Json(json!({ "success": outcome.is_delivered() })))
}

async fn send_bulk(
    State(state): State<AppState>,
    payload: Result<Json<BulkEmailPayload>, JsonRejection>,
) -> Result<Json<BulkResult>, AppError> {
    let Json(payload) = payload?;
    payload.validate()?;

    Ok(Json(state.sender().send_bulk(payload.into()).await))
}
