//! Security response headers.
//!
//! # Responsibilities
//! - Add `X-Content-Type-Options`, `X-Frame-Options` and `Referrer-Policy`
//!
//! # Design Decisions
//! - Runs as an after-interceptor, so only invoked actions get the headers
//! - Never overrides a value an action already set

use axum::http::{header, HeaderValue};

use crate::pipeline::{AfterResponse, Context, Interceptor};

/// Adds the standard hardening headers when absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct SecurityHeaders;

impl Interceptor for SecurityHeaders {
    fn name(&self) -> &str {
        "security_headers"
    }

    fn after(&self, _ctx: &Context, response: &mut AfterResponse<'_>) {
        response.insert_if_absent(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        );
        response.insert_if_absent(header::X_FRAME_OPTIONS, HeaderValue::from_static("SAMEORIGIN"));
        response.insert_if_absent(header::REFERRER_POLICY, HeaderValue::from_static("same-origin"));
    }
}
