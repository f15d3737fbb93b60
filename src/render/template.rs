//! Minimal server-side templates.
//!
//! Tags:
//! - `{{ name }}`: value from the render args, HTML-escaped
//! - `{{ raw name }}`: value from the render args, unescaped
//! - `{{ msg key }}`: catalog message in the request locale
//!
//! Missing values render as the empty string.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::i18n::{Locale, MessageCatalog};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("unknown template `{0}`")]
    UnknownTemplate(String),

    #[error("unclosed tag in template `{0}`")]
    UnclosedTag(String),

    #[error("render argument could not be serialized: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Named values handed to a template.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderArgs {
    values: BTreeMap<String, Value>,
}

impl RenderArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn insert_serialized<T: Serialize>(
        &mut self,
        key: impl Into<String>,
        value: &T,
    ) -> Result<&mut Self, RenderError> {
        self.values.insert(key.into(), serde_json::to_value(value)?);
        Ok(self)
    }

    /// Whether `key` is present.
    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Dotted lookup into nested objects (`flash.error`).
    fn lookup(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let mut current = self.values.get(parts.next()?)?;
        for part in parts {
            current = current.get(part)?;
        }
        Some(current)
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Escape text for an HTML body or attribute context.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// A set of named templates.
#[derive(Debug, Clone, Default)]
pub struct TemplateSet {
    templates: HashMap<String, String>,
}

const ALBUM_INDEX: &str = r#"<!DOCTYPE html>
<html lang="{{ locale }}">
<head><meta charset="utf-8"><title>{{ msg album.title }}</title></head>
<body>
<h1>{{ msg album.title }}</h1>
<p class="welcome">{{ welcome }}</p>
<p class="flash-success">{{ flash.success }}</p>
<div id="albums" data-url="/album/getAlbums"></div>
</body>
</html>
"#;

const AUTH_LOGIN: &str = r#"<!DOCTYPE html>
<html lang="{{ locale }}">
<head><meta charset="utf-8"><title>{{ msg login.title }}</title></head>
<body>
<h1>{{ msg login.title }}</h1>
<p class="flash-error">{{ flash.error }}</p>
<form method="post" action="/doLogin">
<label>{{ msg login.email }} <input name="email" value="{{ email }}"></label>
<span class="field-error">{{ errors.email }}</span>
<label>{{ msg login.password }} <input name="pwd" type="password"></label>
<span class="field-error">{{ errors.pwd }}</span>
<button type="submit">{{ msg login.submit }}</button>
</form>
</body>
</html>
"#;

impl TemplateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The pages served by the bundled controllers.
    pub fn builtin() -> Self {
        let mut set = Self::new();
        set.insert("album/index.html", ALBUM_INDEX);
        set.insert("auth/login.html", AUTH_LOGIN);
        set
    }

    pub fn insert(&mut self, name: impl Into<String>, source: impl Into<String>) {
        self.templates.insert(name.into(), source.into());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    pub fn render(
        &self,
        name: &str,
        args: &RenderArgs,
        locale: &Locale,
        messages: &MessageCatalog,
    ) -> Result<String, RenderError> {
        let source = self
            .templates
            .get(name)
            .ok_or_else(|| RenderError::UnknownTemplate(name.to_string()))?;

        let mut out = String::with_capacity(source.len());
        let mut rest = source.as_str();
        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let end = after
                .find("}}")
                .ok_or_else(|| RenderError::UnclosedTag(name.to_string()))?;
            let tag = after[..end].trim();

            match tag.split_once(char::is_whitespace) {
                Some(("msg", key)) => {
                    out.push_str(&escape_html(&messages.message(locale, key.trim(), &[])))
                }
                Some(("raw", key)) => {
                    out.push_str(&args.lookup(key.trim()).map(display).unwrap_or_default())
                }
                _ => out.push_str(&escape_html(
                    &args.lookup(tag).map(display).unwrap_or_default(),
                )),
            }
            rest = &after[end + 2..];
        }
        out.push_str(rest);
        Ok(out)
    }
}
