//! HTTP front end.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, tower layers, body buffering)
//!     → request.rs (request ID header)
//!     → pipeline::Pipeline (routing, session, actions)
//!     → response.rs (generic error pages)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer};
