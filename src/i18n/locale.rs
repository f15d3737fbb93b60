//! Effective-locale resolution.
//!
//! # Responsibilities
//! - Honour an explicit override (query parameter, then cookie)
//! - Negotiate against `Accept-Language` in client preference order
//! - Fall back to the configured default
//!
//! # Design Decisions
//! - Only supported locales are ever returned
//! - Matching is case-insensitive, `_` equals `-`
//! - A bare language (`en`) and a regional tag (`en-us`) match each other

use std::fmt;

use crate::config::I18nConfig;

/// A resolved locale identifier, normalized to lowercase `lang-region`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locale(String);

impl Locale {
    pub fn new(tag: &str) -> Self {
        Self(normalize(tag))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Primary language subtag (`en` for `en-us`).
    pub fn language(&self) -> &str {
        primary(&self.0)
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where the resolved locale came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocaleSource {
    Query,
    Cookie,
    Header,
    Default,
}

/// Outcome of [`LocaleResolver::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub locale: Locale,
    pub source: LocaleSource,
}

/// Per-request locale signals.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocaleSignals<'a> {
    pub query: Option<&'a str>,
    pub cookie: Option<&'a str>,
    pub accept_language: Option<&'a str>,
}

fn normalize(tag: &str) -> String {
    tag.trim().replace('_', "-").to_ascii_lowercase()
}

fn primary(tag: &str) -> &str {
    tag.split('-').next().unwrap_or(tag)
}

/// Picks the effective locale for a request.
#[derive(Debug, Clone)]
pub struct LocaleResolver {
    default: Locale,
    supported: Vec<Locale>,
    cookie_name: String,
    query_param: String,
}

impl LocaleResolver {
    pub fn new(
        default: &str,
        supported: &[String],
        cookie_name: impl Into<String>,
        query_param: impl Into<String>,
    ) -> Self {
        Self {
            default: Locale::new(default),
            supported: supported.iter().map(|s| Locale::new(s)).collect(),
            cookie_name: cookie_name.into(),
            query_param: query_param.into(),
        }
    }

    pub fn from_config(config: &I18nConfig) -> Self {
        Self::new(
            &config.default_locale,
            &config.supported,
            &config.cookie_name,
            &config.query_param,
        )
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    pub fn query_param(&self) -> &str {
        &self.query_param
    }

    pub fn default_locale(&self) -> &Locale {
        &self.default
    }

    /// Supported locale matching `tag`, exact first, then by language.
    pub fn lookup(&self, tag: &str) -> Option<&Locale> {
        let tag = normalize(tag);
        if tag.is_empty() || tag == "*" {
            return None;
        }
        self.supported
            .iter()
            .find(|l| l.0 == tag)
            .or_else(|| self.supported.iter().find(|l| l.language() == primary(&tag)))
    }

    pub fn resolve(&self, signals: LocaleSignals<'_>) -> Resolution {
        let overrides = [
            (signals.query, LocaleSource::Query),
            (signals.cookie, LocaleSource::Cookie),
        ];
        for (value, source) in overrides {
            if let Some(locale) = value.and_then(|v| self.lookup(v)) {
                return Resolution {
                    locale: locale.clone(),
                    source,
                };
            }
        }

        if let Some(header) = signals.accept_language {
            for tag in parse_accept_language(header) {
                if let Some(locale) = self.lookup(&tag) {
                    return Resolution {
                        locale: locale.clone(),
                        source: LocaleSource::Header,
                    };
                }
            }
        }

        Resolution {
            locale: self.default.clone(),
            source: LocaleSource::Default,
        }
    }
}

/// Language tags from an `Accept-Language` value, most preferred first.
///
/// Entries with `q=0` are dropped; equal weights keep header order.
pub fn parse_accept_language(header: &str) -> Vec<String> {
    let mut tags: Vec<(String, f32)> = header
        .split(',')
        .filter_map(|item| {
            let mut parts = item.split(';');
            let tag = parts.next()?.trim();
            if tag.is_empty() {
                return None;
            }
            let q = parts
                .filter_map(|p| p.trim().strip_prefix("q="))
                .find_map(|q| q.trim().parse::<f32>().ok())
                .unwrap_or(1.0);
            (q > 0.0).then(|| (tag.to_string(), q))
        })
        .collect();

    // Stable sort keeps header order for equal weights.
    tags.sort_by(|a, b| b.1.total_cmp(&a.1));
    tags.into_iter().map(|(tag, _)| tag).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver(default: &str, supported: &[&str]) -> LocaleResolver {
        let supported: Vec<String> = supported.iter().map(|s| s.to_string()).collect();
        LocaleResolver::new(default, &supported, "LANG", "lang")
    }

    #[test]
    fn test_override_beats_header() {
        let r = resolver("en", &["en", "fr"]);
        let res = r.resolve(LocaleSignals {
            query: Some("fr"),
            cookie: None,
            accept_language: Some("en"),
        });
        assert_eq!(res.locale.as_str(), "fr");
        assert_eq!(res.source, LocaleSource::Query);

        let res = r.resolve(LocaleSignals {
            query: None,
            cookie: Some("fr"),
            accept_language: Some("en;q=1.0"),
        });
        assert_eq!(res.locale.as_str(), "fr");
        assert_eq!(res.source, LocaleSource::Cookie);
    }

    #[test]
    fn test_header_first_supported_wins() {
        let r = resolver("en", &["fr", "en"]);
        let res = r.resolve(LocaleSignals {
            accept_language: Some("de, fr"),
            ..Default::default()
        });
        assert_eq!(res.locale.as_str(), "fr");
        assert_eq!(res.source, LocaleSource::Header);
    }

    #[test]
    fn test_default_when_nothing_matches() {
        let r = resolver("en", &["fr", "en"]);
        let res = r.resolve(LocaleSignals::default());
        assert_eq!(res.locale.as_str(), "en");
        assert_eq!(res.source, LocaleSource::Default);

        let res = r.resolve(LocaleSignals {
            query: Some("xx"),
            accept_language: Some("ja"),
            ..Default::default()
        });
        assert_eq!(res.source, LocaleSource::Default);
    }

    #[test]
    fn test_regional_fallback() {
        let r = resolver("en-us", &["en-us", "zh-cn"]);
        assert_eq!(r.lookup("en").map(Locale::as_str), Some("en-us"));
        assert_eq!(r.lookup("EN_GB").map(Locale::as_str), Some("en-us"));
        assert_eq!(r.lookup("zh-CN").map(Locale::as_str), Some("zh-cn"));
        assert_eq!(r.lookup("*"), None);
    }

    #[test]
    fn test_accept_language_weights() {
        assert_eq!(
            parse_accept_language("fr;q=0.5, de, en;q=0.9, ja;q=0"),
            vec!["de", "en", "fr"]
        );
        assert_eq!(parse_accept_language("a, b, c"), vec!["a", "b", "c"]);
    }
}
