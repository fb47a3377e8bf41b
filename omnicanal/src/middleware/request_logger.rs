//! Request logging middleware
//!
//! Tags every request with a random 16 hex character id, logs one line when
//! the request arrives and one when the response leaves.
//!
//! # Example
//!
//! ```rust,no_run
//! use omnicanal::config::LoggingSettings;
//! use omnicanal::middleware::RequestLogger;
//! use axum::{Router, routing::get};
//!
//! let logger = RequestLogger::new(&LoggingSettings::default());
//!
//! let app: Router = Router::new()
//!     .route("/", get(|| async { "Hello" }))
//!     .layer(axum::middleware::from_fn_with_state(
//!         logger,
//!         RequestLogger::middleware,
//!     ));
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::{to_bytes, Body},
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use rand::RngCore;
use tracing::{info, warn};

use crate::config::LoggingSettings;
use crate::error::AppError;

/// Response header carrying the request id
pub const REQUEST_ID_HEADER: &str = "x-request-id";

const NO_BODY: &str = "<no body>";
const REDACTED_BODY: &str = "<cannot show>";
const NO_PARAMETERS: &str = "<no parameters>";

/// Id assigned to a request, available to handlers as an extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    /// Generate a fresh id of 16 lowercase hex characters
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; 8];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// The id as a string
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Request logging middleware
#[derive(Debug, Clone)]
pub struct RequestLogger {
    show_headers: bool,
    redacted_paths: Arc<[String]>,
}

impl RequestLogger {
    /// Create the middleware from logging settings
    #[must_use]
    pub fn new(settings: &LoggingSettings) -> Self {
        Self {
            show_headers: settings.show_headers,
            redacted_paths: settings.redacted_paths.clone().into(),
        }
    }

    /// Middleware handler
    pub async fn middleware(
        State(logger): State<Self>,
        request: Request,
        next: Next,
    ) -> Response {
        let started = Instant::now();
        let request_id = RequestId::generate();

        let host = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map_or_else(|| "unknown".to_string(), |ConnectInfo(addr)| addr.ip().to_string());
        let method = request.method().clone();
        let path = request.uri().path().to_string();
        let query = request.uri().query().unwrap_or(NO_PARAMETERS).to_string();

        let (mut parts, body) = request.into_parts();
        let Ok(bytes) = to_bytes(body, usize::MAX).await else {
            warn!(request_id = %request_id.as_str(), %path, "Request body too large or unreadable");
            return AppError::PayloadTooLarge("request body is too large".to_string())
                .into_response();
        };

        let body_text = logger.describe_body(&path, &bytes);

        if logger.show_headers {
            info!(
                request_id = %request_id.as_str(),
                %host,
                %method,
                %path,
                body = %body_text,
                query = %query,
                headers = %describe_headers(&parts.headers),
                "Request received"
            );
        } else {
            info!(
                request_id = %request_id.as_str(),
                %host,
                %method,
                %path,
                body = %body_text,
                query = %query,
                "Request received"
            );
        }

        parts.extensions.insert(request_id.clone());
        let request = Request::from_parts(parts, Body::from(bytes));

        let mut response = next.run(request).await;

        if let Ok(value) = HeaderValue::from_str(request_id.as_str()) {
            response.headers_mut().insert(REQUEST_ID_HEADER, value);
        }

        info!(
            request_id = %request_id.as_str(),
            %host,
            %method,
            %path,
            status = response.status().as_u16(),
            duration = %format!("{:.3}", started.elapsed().as_secs_f64()),
            "Response sent"
        );

        response
    }

    /// Loggable rendering of a request body
    #[must_use]
    pub fn describe_body(&self, path: &str, body: &[u8]) -> String {
        if self.redacted_paths.iter().any(|redacted| redacted == path) {
            return REDACTED_BODY.to_string();
        }

        if body.is_empty() {
            return NO_BODY.to_string();
        }

        serde_json::from_slice::<serde_json::Value>(body).map_or_else(
            |_| String::from_utf8_lossy(body).into_owned(),
            |value| value.to_string(),
        )
    }
}

fn describe_headers(headers: &HeaderMap) -> String {
    headers
        .iter()
        .map(|(name, value)| format!("{name}: {}", value.to_str().unwrap_or("<binary>")))
        .collect::<Vec<_>>()
        .join(", ")
}
