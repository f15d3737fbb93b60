//! Response helpers shared by the server and the pipeline.
//!
//! # Responsibilities
//! - Render the generic error page for infrastructure failures
//! - Keep error pages distinct from `{ok, msg}` business payloads
//!
//! # Design Decisions
//! - Error pages never include fault details; those go to the log
//! - Handler deadline expiry maps to 504, every other fault to 500

use axum::http::StatusCode;

use crate::pipeline::ResponseDraft;

/// The generic HTML page for `status`.
pub fn error_page(status: StatusCode) -> ResponseDraft {
    let code = status.as_u16();
    let reason = status.canonical_reason().unwrap_or("Error");
    let html = format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>{code} {reason}</title></head>\n\
         <body><h1>{code} {reason}</h1></body>\n</html>\n"
    );
    ResponseDraft::html(status, html)
}
