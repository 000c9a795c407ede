//! HTTP middleware applied to the whole router
//!
//! The authentication gate lives in [`crate::auth::middleware`] because it is
//! attached to protected routes only.

pub mod metrics;
pub mod security_headers;

pub use metrics::{metrics_middleware, HttpMetrics};
pub use security_headers::security_headers_middleware;
