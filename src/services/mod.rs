//! Business collaborators used by the controllers.
//!
//! # Responsibilities
//! - Album and suggestion storage
//! - Credential checks
//! - Outbound email
//!
//! # Design Decisions
//! - Each collaborator is a trait so controllers never see storage shape
//! - Reference implementations are in-memory and safe to share across requests

pub mod album;
pub mod auth;
pub mod email;
pub mod suggestion;

pub use album::{Album, AlbumService, InMemoryAlbums};
pub use auth::{AuthError, AuthService, InMemoryAuth, User};
pub use email::{LogMailer, MailError, Mailer, SentMail};
pub use suggestion::{InMemorySuggestions, Suggestion, SuggestionService};
