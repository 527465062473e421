//! HTTP handlers
//!
//! Axum request handlers for the API endpoints.

pub mod feed;
pub mod webhooks;

pub use feed::{advance_session, close_session, get_session, open_session, report_visibility};
pub use webhooks::live_coverage_webhook;
