//! Server-side rendering collaborators.
//!
//! # Data Flow
//! ```text
//! ActionResult::Render { template, args }
//!     → template.rs (TemplateSet lookup + tag substitution)
//!     → i18n::MessageCatalog for `{{ msg … }}` tags
//!     → HTML bytes for the response draft
//! ```
//!
//! # Design Decisions
//! - Templates are registered at startup; rendering is read-only
//! - Values are escaped unless a template asks for `raw`

pub mod helpers;
pub mod template;

pub use helpers::{Pager, Seq};
pub use template::{escape_html, RenderArgs, RenderError, TemplateSet};
