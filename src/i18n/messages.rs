//! Localized message catalog.
//!
//! Tables are flat `key → text` maps per locale. Lookup falls back from the
//! exact locale to a table of the same language (the default locale's own
//! region first, then tag order), then to the default locale; a miss renders as `???key???` so it is visible on the page.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::i18n::locale::Locale;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read messages from {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse messages in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

const BUILTIN_EN: &[(&str, &str)] = &[
    ("app.name", "Notebook"),
    ("login.title", "Sign in"),
    ("login.email", "Email"),
    ("login.password", "Password"),
    ("login.submit", "Sign in"),
    ("login.failed", "Wrong email or password"),
    ("login.required", "Please sign in first"),
    ("validation.required", "{0} is required"),
    ("validation.password_length", "Password must be at least {0} characters"),
    ("album.title", "Albums"),
    ("album.welcome", "Welcome, {0}"),
    ("album.not_found", "Album does not exist"),
    ("album.not_owner", "Album belongs to another user"),
    ("suggestion.thanks", "Thanks for your suggestion"),
    ("suggestion.empty", "Suggestion must not be empty"),
];

const BUILTIN_FR: &[(&str, &str)] = &[
    ("app.name", "Carnet"),
    ("login.title", "Connexion"),
    ("login.email", "E-mail"),
    ("login.password", "Mot de passe"),
    ("login.submit", "Se connecter"),
    ("login.failed", "E-mail ou mot de passe incorrect"),
    ("login.required", "Veuillez vous connecter"),
    ("validation.required", "{0} est obligatoire"),
    ("validation.password_length", "Le mot de passe doit contenir au moins {0} caractères"),
    ("album.title", "Albums"),
    ("album.welcome", "Bienvenue, {0}"),
    ("album.not_found", "L'album n'existe pas"),
    ("album.not_owner", "L'album appartient à un autre utilisateur"),
    ("suggestion.thanks", "Merci pour votre suggestion"),
    ("suggestion.empty", "La suggestion ne doit pas être vide"),
];

/// Per-locale message tables.
#[derive(Debug, Clone)]
pub struct MessageCatalog {
    default: Locale,
    /// Ordered by tag so same-language fallback is deterministic.
    tables: BTreeMap<String, HashMap<String, String>>,
}

impl MessageCatalog {
    pub fn new(default: Locale) -> Self {
        Self {
            default,
            tables: BTreeMap::new(),
        }
    }

    /// Catalog preloaded with the built-in `en-us` and `fr-fr` tables.
    pub fn with_builtin(default: Locale) -> Self {
        let mut catalog = Self::new(default);
        catalog.insert_all(&Locale::new("en-us"), BUILTIN_EN);
        catalog.insert_all(&Locale::new("fr-fr"), BUILTIN_FR);
        catalog
    }

    pub fn insert(&mut self, locale: &Locale, key: impl Into<String>, text: impl Into<String>) {
        self.tables
            .entry(locale.as_str().to_string())
            .or_default()
            .insert(key.into(), text.into());
    }

    fn insert_all(&mut self, locale: &Locale, entries: &[(&str, &str)]) {
        for (key, text) in entries {
            self.insert(locale, *key, *text);
        }
    }

    /// Merge a TOML table; nested tables become dotted keys.
    pub fn load_toml(&mut self, locale: &Locale, content: &str, origin: &str) -> Result<usize, CatalogError> {
        let table: toml::Table = toml::from_str(content).map_err(|source| CatalogError::Parse {
            path: origin.to_string(),
            source,
        })?;
        let mut flat = Vec::new();
        flatten("", &table, &mut flat);
        let count = flat.len();
        for (key, text) in flat {
            self.insert(locale, key, text);
        }
        Ok(count)
    }

    /// Load every `<locale>.toml` file in `dir`.
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize, CatalogError> {
        let io_err = |source| CatalogError::Io {
            path: dir.display().to_string(),
            source,
        };
        let mut total = 0;
        for entry in fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("toml") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let content = fs::read_to_string(&path).map_err(|source| CatalogError::Io {
                path: path.display().to_string(),
                source,
            })?;
            let count = self.load_toml(&Locale::new(stem), &content, &path.display().to_string())?;
            tracing::debug!(locale = stem, messages = count, "Loaded message file");
            total += count;
        }
        Ok(total)
    }

    fn raw(&self, locale: &Locale, key: &str) -> Option<&str> {
        let exact = self.tables.get(locale.as_str()).and_then(|t| t.get(key));
        let by_language = || {
            let default_region = (self.default.language() == locale.language())
                .then(|| self.tables.get(self.default.as_str()))
                .flatten()
                .and_then(|t| t.get(key));
            default_region.or_else(|| {
                self.tables
                    .iter()
                    .filter(|(tag, _)| Locale::new(tag).language() == locale.language())
                    .find_map(|(_, t)| t.get(key))
            })
        };
        let default = || self.tables.get(self.default.as_str()).and_then(|t| t.get(key));
        exact.or_else(by_language).or_else(default).map(String::as_str)
    }

    /// Localized text for `key`, with `{0}`, `{1}`… replaced by `args`.
    pub fn message(&self, locale: &Locale, key: &str, args: &[&str]) -> String {
        match self.raw(locale, key) {
            Some(text) => substitute(text, args),
            None => format!("???{key}???"),
        }
    }
}

/// Replace `{n}` placeholders in one pass; argument text is never rescanned.
fn substitute(text: &str, args: &[&str]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let arg = after.find('}').and_then(|close| {
            let index: usize = after[..close].parse().ok()?;
            Some((close, *args.get(index)?))
        });
        match arg {
            Some((close, value)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn flatten(prefix: &str, table: &toml::Table, out: &mut Vec<(String, String)>) {
    for (key, value) in table {
        let key = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            toml::Value::Table(inner) => flatten(&key, inner, out),
            toml::Value::String(s) => out.push((key, s.clone())),
            other => out.push((key, other.to_string())),
        }
    }
}
