//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validate config → secret → catalog → templates → services
//!     → routes → interceptors → pipeline → AppContext
//!
//! Shutdown (shutdown.rs):
//!     Ctrl+C / trigger → stop accepting → drain in-flight requests → exit
//! ```
//!
//! # Design Decisions
//! - Ordered startup, listener bound last
//! - Graceful shutdown lets in-flight requests finish

pub mod shutdown;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{assemble, assemble_with, default_services, AppContext, StartupError};
