//! Internationalization subsystem.
//!
//! # Data Flow
//! ```text
//! ?lang=… / locale cookie / Accept-Language
//!     → locale.rs (resolve one supported Locale per request)
//!     → Context.locale (the only locale source downstream)
//!     → messages.rs (catalog lookups for templates and flash texts)
//! ```

pub mod locale;
pub mod messages;

pub use locale::{Locale, LocaleResolver, LocaleSignals, LocaleSource, Resolution};
pub use messages::{CatalogError, MessageCatalog};
