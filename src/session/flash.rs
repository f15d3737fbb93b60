//! One-shot flash/validation carryover.
//!
//! # Responsibilities
//! - Restore the bag written by the previous response, consuming it
//! - Persist the bag written during this response for the next request
//!
//! # Design Decisions
//! - Consume-on-read: restore takes the cookie out of the request jar
//! - A consumed cookie with nothing new to carry is cleared on the client
//! - Forged or corrupt cookies restore to an empty bag

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::session::cookie::{CookieJar, SetCookie};
use crate::session::signer::CookieSigner;

/// Conventional message keys.
pub const SUCCESS_KEY: &str = "success";
pub const ERROR_KEY: &str = "error";

/// A validation failure attached to a form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Messages and field errors carried across exactly one redirect.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashBag {
    #[serde(default)]
    pub messages: BTreeMap<String, String>,
    #[serde(default)]
    pub errors: Vec<FieldError>,
}

impl FlashBag {
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty() && self.errors.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.messages.get(key).map(String::as_str)
    }

    /// First error recorded for `field`.
    pub fn error_for(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }
}

/// Flash state of one request: what arrived, and what leaves.
#[derive(Debug, Clone, Default)]
pub struct Flash {
    incoming: FlashBag,
    outgoing: FlashBag,
}

impl Flash {
    pub fn from_incoming(incoming: FlashBag) -> Self {
        Self {
            incoming,
            outgoing: FlashBag::default(),
        }
    }

    /// The bag written by the previous response.
    pub fn incoming(&self) -> &FlashBag {
        &self.incoming
    }

    /// The bag that will be carried to the next request.
    pub fn outgoing(&self) -> &FlashBag {
        &self.outgoing
    }

    pub fn put(&mut self, key: impl Into<String>, message: impl Into<String>) {
        self.outgoing.messages.insert(key.into(), message.into());
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.put(SUCCESS_KEY, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.put(ERROR_KEY, message);
    }

    pub fn field_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.outgoing.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn has_errors(&self) -> bool {
        !self.outgoing.errors.is_empty()
    }
}

/// Restores and persists [`FlashBag`]s.
#[derive(Debug, Clone)]
pub struct FlashCodec {
    signer: CookieSigner,
    cookie_name: String,
    secure: bool,
}

impl FlashCodec {
    pub fn new(signer: CookieSigner, cookie_name: impl Into<String>, secure: bool) -> Self {
        Self {
            signer,
            cookie_name: cookie_name.into(),
            secure,
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Read and consume the carried bag. A second restore yields an empty bag.
    pub fn restore(&self, jar: &mut CookieJar) -> FlashBag {
        let Some(raw) = jar.take(&self.cookie_name) else {
            return FlashBag::default();
        };
        match self.signer.open::<FlashBag>(&raw) {
            Ok(bag) => bag,
            Err(e) => {
                tracing::warn!(error = %e, "Discarding invalid flash cookie");
                FlashBag::default()
            }
        }
    }

    /// Sealed cookie value, only when there is something to carry.
    pub fn persist(&self, bag: &FlashBag) -> Option<String> {
        if bag.is_empty() {
            return None;
        }
        match self.signer.seal(bag) {
            Ok(sealed) => Some(sealed),
            Err(e) => {
                tracing::error!(error = %e, "Failed to seal flash");
                None
            }
        }
    }

    /// The `Set-Cookie` to emit: the new bag, or a clearing cookie for a
    /// consumed one.
    pub fn set_cookie(&self, bag: &FlashBag, jar: &CookieJar) -> Option<SetCookie> {
        match self.persist(bag) {
            Some(value) => Some(SetCookie::new(&self.cookie_name, value).secure(self.secure)),
            None if jar.was_consumed(&self.cookie_name) => {
                Some(SetCookie::removal(&self.cookie_name).secure(self.secure))
            }
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, HeaderMap, HeaderValue};

    fn codec() -> FlashCodec {
        FlashCodec::new(CookieSigner::new(b"flash-secret".to_vec()), "F", false)
    }

    fn jar_with(value: &str) -> CookieJar {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("F={value}")).unwrap(),
        );
        CookieJar::from_headers(&headers)
    }

    #[test]
    fn test_restore_is_read_once() {
        let codec = codec();
        let mut flash = Flash::default();
        flash.error("bad password");
        flash.field_error("email", "required");
        let value = codec.persist(flash.outgoing()).unwrap();

        let mut jar = jar_with(&value);
        let first = codec.restore(&mut jar);
        assert_eq!(first.get(ERROR_KEY), Some("bad password"));
        assert_eq!(first.error_for("email"), Some("required"));

        assert!(codec.restore(&mut jar).is_empty());
    }

    #[test]
    fn test_consumed_cookie_is_cleared() {
        let codec = codec();
        let value = codec
            .persist(&FlashBag {
                messages: BTreeMap::from([(SUCCESS_KEY.to_string(), "saved".to_string())]),
                errors: vec![],
            })
            .unwrap();

        let mut jar = jar_with(&value);
        codec.restore(&mut jar);
        let cookie = codec.set_cookie(&FlashBag::default(), &jar).unwrap();
        assert_eq!(cookie.max_age, Some(0));
    }

    #[test]
    fn test_nothing_to_carry_nothing_emitted() {
        let codec = codec();
        assert_eq!(codec.persist(&FlashBag::default()), None);
        assert_eq!(codec.set_cookie(&FlashBag::default(), &CookieJar::default()), None);
    }

    #[test]
    fn test_forged_flash_is_empty() {
        let codec = codec();
        let forged = CookieSigner::new(b"other".to_vec())
            .seal(&FlashBag {
                messages: BTreeMap::from([(ERROR_KEY.to_string(), "x".to_string())]),
                errors: vec![],
            })
            .unwrap();
        assert!(codec.restore(&mut jar_with(&forged)).is_empty());
    }
}
