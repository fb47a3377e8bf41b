//! Middleware for omnicanal
//!
//! - [`RequestLogger`] - per-request id and entry/exit logging

pub mod request_logger;

pub use request_logger::{RequestId, RequestLogger, REQUEST_ID_HEADER};
