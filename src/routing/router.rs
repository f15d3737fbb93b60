//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store compiled routes
//! - Look up matching route for request
//! - Return matched route or explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) scan over entries (acceptable for typical route counts)
//! - Most specific pattern wins, registration order breaks ties
//! - Explicit NotFound rather than silent default

use std::sync::Arc;

use axum::http::Method;

use crate::pipeline::invoker::Action;
use crate::routing::pattern::{split_path, PathPattern, RouteError};

/// Which request methods an entry accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodFilter {
    Only(Method),
    Any,
}

impl MethodFilter {
    /// Returns `Some(fallback)` when the entry accepts `method`; `fallback`
    /// is true when a HEAD request is served by a GET entry.
    fn accepts(&self, method: &Method) -> Option<bool> {
        match self {
            MethodFilter::Any => Some(false),
            MethodFilter::Only(m) if m == method => Some(false),
            MethodFilter::Only(m) if *m == Method::GET && *method == Method::HEAD => Some(true),
            MethodFilter::Only(_) => None,
        }
    }
}

impl From<Method> for MethodFilter {
    fn from(method: Method) -> Self {
        MethodFilter::Only(method)
    }
}

/// A single registered route.
#[derive(Debug)]
pub struct RouteEntry {
    pub method: MethodFilter,
    pub pattern: PathPattern,
    pub action: Arc<Action>,
}

/// Result of a successful lookup.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub action: Arc<Action>,
    pub pattern: String,
    pub path_params: Vec<(String, String)>,
    /// Path parameters that did not decode to UTF-8.
    pub undecodable_params: Vec<String>,
}

/// Outcome of [`RouteTable::lookup`].
#[derive(Debug, Clone)]
pub enum Lookup {
    Found(RouteMatch),
    NotFound,
}

/// Static, read-only route table.
#[derive(Debug, Default)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl RouteTable {
    pub fn builder() -> RouteTableBuilder {
        RouteTableBuilder::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find the most specific entry for `method` and `path`.
    pub fn lookup(&self, method: &Method, path: &str) -> Lookup {
        let segments = split_path(path);

        let best = self
            .entries
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| {
                let fallback = entry.method.accepts(method)?;
                let captures = entry.pattern.matches(&segments)?;
                Some(((entry.pattern.specificity(), fallback, index), entry, captures))
            })
            .min_by(|a, b| a.0.cmp(&b.0));

        match best {
            Some((_, entry, captures)) => Lookup::Found(RouteMatch {
                action: entry.action.clone(),
                pattern: entry.pattern.as_str().to_string(),
                path_params: captures.params,
                undecodable_params: captures.undecodable,
            }),
            None => Lookup::NotFound,
        }
    }
}

/// Collects routes at startup; `build` freezes them.
#[derive(Debug, Default)]
pub struct RouteTableBuilder {
    entries: Vec<RouteEntry>,
}

impl RouteTableBuilder {
    /// Register `action` for `method` on `pattern`.
    pub fn route(
        mut self,
        method: impl Into<MethodFilter>,
        pattern: &str,
        action: Action,
    ) -> Result<Self, RouteError> {
        let pattern = PathPattern::parse(pattern)?;
        self.entries.push(RouteEntry {
            method: method.into(),
            pattern,
            action: Arc::new(action),
        });
        Ok(self)
    }

    pub fn get(self, pattern: &str, action: Action) -> Result<Self, RouteError> {
        self.route(Method::GET, pattern, action)
    }

    pub fn post(self, pattern: &str, action: Action) -> Result<Self, RouteError> {
        self.route(Method::POST, pattern, action)
    }

    pub fn any(self, pattern: &str, action: Action) -> Result<Self, RouteError> {
        self.route(MethodFilter::Any, pattern, action)
    }

    pub fn build(self) -> RouteTable {
        tracing::debug!(routes = self.entries.len(), "Route table compiled");
        RouteTable {
            entries: self.entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::invoker::{handler_fn, ActionResult};
    use axum::http::StatusCode;

    fn action(name: &str) -> Action {
        Action::new(name, handler_fn(|_| Ok(ActionResult::Status(StatusCode::OK))))
    }

    fn found(lookup: Lookup) -> RouteMatch {
        match lookup {
            Lookup::Found(m) => m,
            Lookup::NotFound => panic!("expected a match"),
        }
    }

    #[test]
    fn test_literal_beats_param() {
        // Parameter route registered first on purpose.
        let table = RouteTable::builder()
            .get("/album/:id", action("Album.Show"))
            .unwrap()
            .get("/album/list", action("Album.List"))
            .unwrap()
            .build();

        let m = found(table.lookup(&Method::GET, "/album/list"));
        assert_eq!(m.action.name(), "Album.List");
        assert!(m.path_params.is_empty());

        let m = found(table.lookup(&Method::GET, "/album/7"));
        assert_eq!(m.action.name(), "Album.Show");
        assert_eq!(m.path_params, vec![("id".to_string(), "7".to_string())]);
    }

    #[test]
    fn test_param_beats_wildcard() {
        let table = RouteTable::builder()
            .get("/files/*path", action("Files.Any"))
            .unwrap()
            .get("/files/:name", action("Files.One"))
            .unwrap()
            .build();

        assert_eq!(found(table.lookup(&Method::GET, "/files/a")).action.name(), "Files.One");
        assert_eq!(found(table.lookup(&Method::GET, "/files/a/b")).action.name(), "Files.Any");
    }

    #[test]
    fn test_registration_order_breaks_ties() {
        let table = RouteTable::builder()
            .get("/:a", action("First"))
            .unwrap()
            .get("/:b", action("Second"))
            .unwrap()
            .build();

        assert_eq!(found(table.lookup(&Method::GET, "/x")).action.name(), "First");
    }

    #[test]
    fn test_method_filtering_and_head_fallback() {
        let table = RouteTable::builder()
            .post("/doLogin", action("Auth.DoLogin"))
            .unwrap()
            .get("/login", action("Auth.Login"))
            .unwrap()
            .any("/ping", action("App.Ping"))
            .unwrap()
            .build();

        assert!(matches!(table.lookup(&Method::GET, "/doLogin"), Lookup::NotFound));
        assert_eq!(found(table.lookup(&Method::HEAD, "/login")).action.name(), "Auth.Login");
        assert_eq!(found(table.lookup(&Method::DELETE, "/ping")).action.name(), "App.Ping");
    }

    #[test]
    fn test_no_match() {
        let table = RouteTable::builder().get("/", action("App.Index")).unwrap().build();
        assert!(matches!(table.lookup(&Method::GET, "/nope"), Lookup::NotFound));
        assert_eq!(table.len(), 1);
    }
}
