//! Signed, expiring session carried entirely in a cookie.
//!
//! # Responsibilities
//! - Restore the session bag from the request cookie
//! - Persist the (possibly mutated) bag with a refreshed expiry
//!
//! # Design Decisions
//! - Forged, corrupt or expired cookies restore to an empty anonymous session
//! - No server-side state, so overlapping requests need no locking
//! - An empty bag emits no cookie

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::session::cookie::{CookieJar, SetCookie};
use crate::session::signer::CookieSigner;

/// Session key holding the authenticated user id.
pub const USER_ID_KEY: &str = "UserId";

/// Per-request session bag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    values: BTreeMap<String, String>,
}

impl Session {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.values.remove(key)
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// The authenticated identity, if any.
    pub fn user_id(&self) -> Option<&str> {
        self.get(USER_ID_KEY).filter(|id| !id.is_empty())
    }
}

/// Wire form of a session.
#[derive(Debug, Serialize, Deserialize)]
struct SessionRecord {
    data: BTreeMap<String, String>,
    exp: u64,
}

/// Seconds since the Unix epoch.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Restores and persists [`Session`]s.
#[derive(Debug, Clone)]
pub struct SessionCodec {
    signer: CookieSigner,
    cookie_name: String,
    max_age_secs: u64,
    secure: bool,
}

impl SessionCodec {
    pub fn new(
        signer: CookieSigner,
        cookie_name: impl Into<String>,
        max_age_secs: u64,
        secure: bool,
    ) -> Self {
        Self {
            signer,
            cookie_name: cookie_name.into(),
            max_age_secs,
            secure,
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    pub fn restore(&self, jar: &CookieJar) -> Session {
        self.restore_at(jar, unix_now())
    }

    /// Restore against an explicit clock. Never fails.
    pub fn restore_at(&self, jar: &CookieJar, now: u64) -> Session {
        let Some(raw) = jar.get(&self.cookie_name) else {
            return Session::default();
        };

        match self.signer.open::<SessionRecord>(raw) {
            Ok(record) if record.exp > now => Session {
                values: record.data,
            },
            Ok(record) => {
                tracing::debug!(expired_at = record.exp, "Session cookie expired");
                Session::default()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Discarding invalid session cookie");
                Session::default()
            }
        }
    }

    /// Sealed cookie value for `session`, or `None` when there is nothing to carry.
    pub fn persist(&self, session: &Session) -> Option<String> {
        self.persist_at(session, unix_now())
    }

    pub fn persist_at(&self, session: &Session, now: u64) -> Option<String> {
        if session.is_empty() {
            return None;
        }
        let record = SessionRecord {
            data: session.values.clone(),
            exp: now.saturating_add(self.max_age_secs),
        };
        match self.signer.seal(&record) {
            Ok(sealed) => Some(sealed),
            Err(e) => {
                tracing::error!(error = %e, "Failed to seal session");
                None
            }
        }
    }

    /// The `Set-Cookie` to emit for this response, if any.
    ///
    /// An emptied session that arrived with a cookie is expired on the client.
    pub fn set_cookie(&self, session: &Session, jar: &CookieJar) -> Option<SetCookie> {
        match self.persist(session) {
            Some(value) => Some(
                SetCookie::new(&self.cookie_name, value)
                    .max_age(self.max_age_secs)
                    .secure(self.secure),
            ),
            None if jar.contains(&self.cookie_name) => {
                Some(SetCookie::removal(&self.cookie_name).secure(self.secure))
            }
            None => None,
        }
    }
}
