//! Route pattern parsing and matching.
//!
//! # Responsibilities
//! - Parse `/literal/:param/*rest` patterns at startup
//! - Match a split request path against a pattern, capturing parameters
//! - Expose a specificity key used to rank competing matches
//!
//! # Design Decisions
//! - Literal matching is case-sensitive
//! - Empty segments are ignored, so trailing slashes never matter
//! - A catch-all must be the last segment and matches zero or more segments
//! - No regex to guarantee O(n) matching

use percent_encoding::percent_decode_str;
use thiserror::Error;

/// Error raised while compiling the route table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("route pattern `{0}` must start with `/`")]
    MissingLeadingSlash(String),

    #[error("route pattern `{0}` has a parameter without a name")]
    EmptyParam(String),

    #[error("route pattern `{pattern}` declares `{name}` twice")]
    DuplicateParam { pattern: String, name: String },

    #[error("route pattern `{0}` has a catch-all that is not the last segment")]
    CatchAllNotLast(String),
}

/// One compiled segment of a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Param(String),
    CatchAll(String),
}

impl Segment {
    /// Lower is more specific.
    fn rank(&self) -> u8 {
        match self {
            Segment::Literal(_) => 0,
            Segment::Param(_) => 1,
            Segment::CatchAll(_) => 2,
        }
    }
}

/// A compiled path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    /// Compile a pattern such as `/album/:id` or `/public/*file`.
    pub fn parse(raw: &str) -> Result<Self, RouteError> {
        if !raw.starts_with('/') {
            return Err(RouteError::MissingLeadingSlash(raw.to_string()));
        }

        let parts = split_path(raw);
        let mut segments = Vec::with_capacity(parts.len());
        let mut names: Vec<&str> = Vec::new();

        for (i, part) in parts.iter().enumerate() {
            let segment = if let Some(name) = part.strip_prefix(':') {
                Segment::Param(name.to_string())
            } else if let Some(name) = part.strip_prefix('*') {
                if i + 1 != parts.len() {
                    return Err(RouteError::CatchAllNotLast(raw.to_string()));
                }
                Segment::CatchAll(name.to_string())
            } else {
                Segment::Literal(part.to_string())
            };

            if let Segment::Param(name) | Segment::CatchAll(name) = &segment {
                if name.is_empty() {
                    return Err(RouteError::EmptyParam(raw.to_string()));
                }
                if names.contains(&name.as_str()) {
                    return Err(RouteError::DuplicateParam {
                        pattern: raw.to_string(),
                        name: name.clone(),
                    });
                }
            }
            if let Segment::Param(_) | Segment::CatchAll(_) = segment {
                names.push(part.trim_start_matches([':', '*']));
            }
            segments.push(segment);
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// The pattern as written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Per-position rank; lexicographically smaller keys are more specific.
    pub fn specificity(&self) -> Vec<u8> {
        self.segments.iter().map(Segment::rank).collect()
    }

    /// Match already-split path segments, returning percent-decoded captures.
    pub fn matches(&self, path: &[&str]) -> Option<Captures> {
        let mut captures = Captures::default();

        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::CatchAll(name) => {
                    let rest = path.get(i..).unwrap_or_default().join("/");
                    captures.push(name, &rest);
                    return Some(captures);
                }
                Segment::Literal(lit) => {
                    if path.get(i) != Some(&lit.as_str()) {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    let value = path.get(i)?;
                    captures.push(name, value);
                }
            }
        }

        (path.len() == self.segments.len()).then_some(captures)
    }
}

/// Parameters captured by a successful match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captures {
    /// `(name, value)` in pattern order, percent-decoded.
    pub params: Vec<(String, String)>,
    /// Names whose decoded bytes are not UTF-8. Their raw text stays in `params`.
    pub undecodable: Vec<String>,
}

impl Captures {
    fn push(&mut self, name: &str, raw: &str) {
        let value = match percent_decode_str(raw).decode_utf8() {
            Ok(decoded) => decoded.into_owned(),
            Err(_) => {
                self.undecodable.push(name.to_string());
                raw.to_string()
            }
        };
        self.params.push((name.to_string(), value));
    }
}

/// Split a path into its non-empty segments.
pub fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_segments() {
        let pattern = PathPattern::parse("/album/:id/*rest").unwrap();
        assert_eq!(
            pattern.segments(),
            &[
                Segment::Literal("album".into()),
                Segment::Param("id".into()),
                Segment::CatchAll("rest".into()),
            ]
        );
        assert_eq!(pattern.specificity(), vec![0, 1, 2]);
    }

    #[test]
    fn test_rejects_bad_patterns() {
        assert!(matches!(PathPattern::parse("album"), Err(RouteError::MissingLeadingSlash(_))));
        assert!(matches!(PathPattern::parse("/a/:"), Err(RouteError::EmptyParam(_))));
        assert!(matches!(PathPattern::parse("/*rest/a"), Err(RouteError::CatchAllNotLast(_))));
        assert!(matches!(
            PathPattern::parse("/:id/x/:id"),
            Err(RouteError::DuplicateParam { .. })
        ));
    }

    #[test]
    fn test_match_params_and_trailing_slash() {
        let pattern = PathPattern::parse("/album/:id").unwrap();
        let captures = pattern.matches(&split_path("/album/42/")).unwrap();
        assert_eq!(captures.params, vec![("id".to_string(), "42".to_string())]);
        assert!(pattern.matches(&split_path("/album")).is_none());
        assert!(pattern.matches(&split_path("/album/42/x")).is_none());
    }

    #[test]
    fn test_catch_all_matches_zero_or_more() {
        let pattern = PathPattern::parse("/public/*file").unwrap();
        assert_eq!(
            pattern.matches(&split_path("/public/css/app.css")).unwrap().params,
            vec![("file".to_string(), "css/app.css".to_string())]
        );
        assert_eq!(
            pattern.matches(&split_path("/public")).unwrap().params,
            vec![("file".to_string(), String::new())]
        );
    }

    #[test]
    fn test_root_pattern() {
        let root = PathPattern::parse("/").unwrap();
        assert!(root.segments().is_empty());
        assert_eq!(root.matches(&split_path("/")), Some(Captures::default()));
        assert!(root.matches(&split_path("/x")).is_none());
    }

    #[test]
    fn test_params_are_percent_decoded() {
        let pattern = PathPattern::parse("/album/:name").unwrap();
        let captures = pattern.matches(&split_path("/album/Trip%202024")).unwrap();
        assert_eq!(captures.params, vec![("name".to_string(), "Trip 2024".to_string())]);
        assert!(captures.undecodable.is_empty());

        let files = PathPattern::parse("/public/*file").unwrap();
        let captures = files.matches(&split_path("/public/my%20docs/a%2Bb.txt")).unwrap();
        assert_eq!(captures.params[0].1, "my docs/a+b.txt");
    }

    #[test]
    fn test_invalid_utf8_param_is_kept_raw() {
        let pattern = PathPattern::parse("/album/:name").unwrap();
        let captures = pattern.matches(&split_path("/album/%FF%FE")).unwrap();
        assert_eq!(captures.params, vec![("name".to_string(), "%FF%FE".to_string())]);
        assert_eq!(captures.undecodable, vec!["name".to_string()]);
    }
}
