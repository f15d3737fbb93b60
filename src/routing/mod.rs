//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path)
//!     → router.rs (route lookup)
//!     → pattern.rs (evaluate segment patterns)
//!     → Return: matched Route + path params, or NotFound
//!
//! Route Compilation (at startup):
//!     (method, pattern, action)[]
//!     → Parse patterns
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Deterministic: literal > `:param` > `*wildcard`, then registration order
//! - A miss is a normal 404 outcome, never a fault

pub mod pattern;
pub mod router;

pub use pattern::{Captures, PathPattern, RouteError};
pub use router::{Lookup, MethodFilter, RouteMatch, RouteTable, RouteTableBuilder};
