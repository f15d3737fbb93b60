//! Request cookie jar and `Set-Cookie` rendering.

use std::collections::HashSet;

use axum::http::{header, HeaderMap, HeaderValue};

/// Cookies sent by the client, parsed once per request.
///
/// `take` consumes a cookie so one-shot records cannot be read twice; the jar
/// remembers which names were consumed so the response can clear them.
#[derive(Debug, Clone, Default)]
pub struct CookieJar {
    cookies: Vec<(String, String)>,
    consumed: HashSet<String>,
}

impl CookieJar {
    /// Parse every `Cookie` header. Malformed pairs are skipped.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let cookies = headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| {
                let (name, value) = pair.trim().split_once('=')?;
                let name = name.trim();
                if name.is_empty() {
                    return None;
                }
                Some((name.to_string(), value.trim().trim_matches('"').to_string()))
            })
            .collect();

        Self {
            cookies,
            consumed: HashSet::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        if self.consumed.contains(name) {
            return None;
        }
        self.cookies
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.cookies.iter().any(|(n, _)| n == name)
    }

    /// Read and consume a cookie. A second `take` yields `None`.
    pub fn take(&mut self, name: &str) -> Option<String> {
        let value = self.get(name)?.to_string();
        self.consumed.insert(name.to_string());
        Some(value)
    }

    pub fn was_consumed(&self, name: &str) -> bool {
        self.consumed.contains(name)
    }
}

/// A cookie to attach to the response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
    pub name: String,
    pub value: String,
    pub max_age: Option<u64>,
    pub http_only: bool,
    pub secure: bool,
}

impl SetCookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            max_age: None,
            http_only: true,
            secure: false,
        }
    }

    /// A cookie instructing the client to drop `name`.
    pub fn removal(name: impl Into<String>) -> Self {
        Self::new(name, "").max_age(0)
    }

    pub fn max_age(mut self, secs: u64) -> Self {
        self.max_age = Some(secs);
        self
    }

    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    pub fn to_header_value(&self) -> Option<HeaderValue> {
        let mut out = format!("{}={}; Path=/", self.name, self.value);
        if let Some(age) = self.max_age {
            out.push_str(&format!("; Max-Age={age}"));
        }
        if self.http_only {
            out.push_str("; HttpOnly");
        }
        if self.secure {
            out.push_str("; Secure");
        }
        out.push_str("; SameSite=Lax");
        HeaderValue::from_str(&out).ok()
    }
}
