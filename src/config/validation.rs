//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, limits > 0)
//! - Check cross-field consistency (default locale is supported)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;

use crate::config::schema::AppConfig;
use crate::pipeline::compression::Encoding;

/// Minimum accepted length of an explicitly configured session secret.
pub const MIN_SECRET_LEN: usize = 32;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    NotPositive { field: &'static str },

    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("session.secret must be at least 32 bytes")]
    SecretTooShort,

    #[error("i18n.default_locale `{0}` is not in i18n.supported")]
    DefaultLocaleUnsupported(String),

    #[error("compression.encodings contains unknown encoding `{0}`")]
    UnknownEncoding(String),

    #[error("cookie names must be distinct, `{0}` is used twice")]
    DuplicateCookie(String),
}

/// Validate a parsed configuration, collecting every problem.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.trim().is_empty() {
        errors.push(ValidationError::Empty { field: "listener.bind_address" });
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::NotPositive { field: "timeouts.request_secs" });
    }
    if config.timeouts.handler_ms == 0 {
        errors.push(ValidationError::NotPositive { field: "timeouts.handler_ms" });
    }
    if config.session.max_age_secs == 0 {
        errors.push(ValidationError::NotPositive { field: "session.max_age_secs" });
    }
    if !config.session.secret.is_empty() && config.session.secret.len() < MIN_SECRET_LEN {
        errors.push(ValidationError::SecretTooShort);
    }
    if config.security.max_body_size == 0 {
        errors.push(ValidationError::NotPositive { field: "security.max_body_size" });
    }

    let cookies = [
        ("session.cookie_name", &config.session.cookie_name),
        ("flash.cookie_name", &config.flash.cookie_name),
        ("i18n.cookie_name", &config.i18n.cookie_name),
    ];
    for (i, (field, name)) in cookies.iter().enumerate() {
        if name.trim().is_empty() {
            errors.push(ValidationError::Empty { field: *field });
        } else if cookies[..i].iter().any(|(_, other)| other == name) {
            errors.push(ValidationError::DuplicateCookie((*name).clone()));
        }
    }

    if config.i18n.supported.is_empty() {
        errors.push(ValidationError::Empty { field: "i18n.supported" });
    } else if !config
        .i18n
        .supported
        .iter()
        .any(|l| l.eq_ignore_ascii_case(&config.i18n.default_locale))
    {
        errors.push(ValidationError::DefaultLocaleUnsupported(
            config.i18n.default_locale.clone(),
        ));
    }

    for name in &config.compression.encodings {
        if Encoding::from_token(name).is_none() {
            errors.push(ValidationError::UnknownEncoding(name.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
