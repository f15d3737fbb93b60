//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → tower-http RequestBodyLimitLayer (security.max_body_size)
//!     → pipeline
//!     → headers.rs (after-interceptor adds hardening headers)
//! ```
//!
//! # Design Decisions
//! - Body size is enforced before the pipeline buffers anything
//! - Header hardening is switchable with `security.enable_headers`

pub mod headers;

pub use headers::SecurityHeaders;
