//! Before/after interceptors.
//!
//! # Responsibilities
//! - Run before-hooks in registration order; the first `Respond` wins
//! - Run after-hooks in registration order over an append-only header view
//! - Apply each hook only to the actions its [`Scope`] covers
//!
//! # Design Decisions
//! - Hooks are synchronous; anything slow belongs in the action
//! - After-hooks cannot replace the status or body

use std::fmt;
use std::sync::Arc;

use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};

use crate::pipeline::context::Context;
use crate::pipeline::invoker::ActionResult;

/// Decision of a before-hook.
#[derive(Debug)]
pub enum Intercept {
    Continue,
    /// Skip the action and send this result instead.
    Respond(ActionResult),
}

/// Response view given to after-hooks.
pub struct AfterResponse<'a> {
    status: StatusCode,
    headers: &'a mut HeaderMap,
}

impl<'a> AfterResponse<'a> {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn header(&self, name: &HeaderName) -> Option<&HeaderValue> {
        self.headers.get(name)
    }

    /// Insert unless the response already carries `name`.
    pub fn insert_if_absent(&mut self, name: HeaderName, value: HeaderValue) -> bool {
        if self.headers.contains_key(&name) {
            return false;
        }
        self.headers.insert(name, value);
        true
    }

    pub fn append(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.append(name, value);
    }
}

pub trait Interceptor: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn before(&self, _ctx: &mut Context) -> Intercept {
        Intercept::Continue
    }

    fn after(&self, _ctx: &Context, _response: &mut AfterResponse<'_>) {}
}

/// Which actions an interceptor applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    All,
    Controller(String),
}

impl Scope {
    pub fn controller(name: impl Into<String>) -> Self {
        Scope::Controller(name.into())
    }

    fn covers(&self, ctx: &Context) -> bool {
        match self {
            Scope::All => true,
            Scope::Controller(name) => ctx
                .route()
                .is_some_and(|r| r.action.controller() == name),
        }
    }
}

/// Ordered, scoped interceptor list.
#[derive(Clone, Default)]
pub struct InterceptorRunner {
    entries: Vec<(Scope, Arc<dyn Interceptor>)>,
}

impl fmt::Debug for InterceptorRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(scope, i)| (scope, i.name())))
            .finish()
    }
}

impl InterceptorRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, scope: Scope, interceptor: impl Interceptor) -> Self {
        self.entries.push((scope, Arc::new(interceptor)));
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn run_before(&self, ctx: &mut Context) -> Intercept {
        for (scope, interceptor) in &self.entries {
            if !scope.covers(ctx) {
                continue;
            }
            if let Intercept::Respond(result) = interceptor.before(ctx) {
                tracing::debug!(interceptor = interceptor.name(), "Interceptor short-circuited action");
                return Intercept::Respond(result);
            }
        }
        Intercept::Continue
    }

    pub fn run_after(&self, ctx: &mut Context) {
        let mut headers = std::mem::take(&mut ctx.response.headers);
        let status = ctx.response.status;
        for (scope, interceptor) in &self.entries {
            if scope.covers(ctx) {
                let mut view = AfterResponse {
                    status,
                    headers: &mut headers,
                };
                interceptor.after(ctx, &mut view);
            }
        }
        ctx.response.headers = headers;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::{Locale, MessageCatalog};
    use crate::pipeline::invoker::{handler_fn, Action};
    use crate::routing::RouteMatch;
    use axum::body::Bytes;
    use axum::http::Request;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn routed(action: &str) -> Context {
        let request = Request::builder().uri("/x").body(Bytes::new()).unwrap();
        let mut ctx = Context::new(
            request,
            "t".into(),
            Locale::new("en-us"),
            Arc::new(MessageCatalog::new(Locale::new("en-us"))),
        );
        ctx.route = Some(RouteMatch {
            action: Arc::new(Action::new(
                action,
                handler_fn(|_| Ok(ActionResult::Status(StatusCode::OK))),
            )),
            pattern: "/x".into(),
            path_params: Vec::new(),
            undecodable_params: Vec::new(),
        });
        ctx
    }

    struct Deny;

    impl Interceptor for Deny {
        fn name(&self) -> &str {
            "deny"
        }

        fn before(&self, _ctx: &mut Context) -> Intercept {
            Intercept::Respond(ActionResult::Status(StatusCode::FORBIDDEN))
        }
    }

    struct Count(Arc<AtomicUsize>);

    impl Interceptor for Count {
        fn name(&self) -> &str {
            "count"
        }

        fn before(&self, _ctx: &mut Context) -> Intercept {
            self.0.fetch_add(1, Ordering::SeqCst);
            Intercept::Continue
        }
    }

    struct Tag(&'static str);

    impl Interceptor for Tag {
        fn name(&self) -> &str {
            self.0
        }

        fn after(&self, _ctx: &Context, response: &mut AfterResponse<'_>) {
            response.insert_if_absent(
                HeaderName::from_static("x-tag"),
                HeaderValue::from_static(self.0),
            );
        }
    }

    #[test]
    fn test_scope_limits_before_hooks() {
        let runner = InterceptorRunner::new().with(Scope::controller("Album"), Deny);

        let mut album = routed("Album.Index");
        assert!(matches!(runner.run_before(&mut album), Intercept::Respond(_)));

        let mut auth = routed("Auth.Login");
        assert!(matches!(runner.run_before(&mut auth), Intercept::Continue));
    }

    #[test]
    fn test_first_respond_stops_the_chain() {
        let counter = Arc::new(AtomicUsize::new(0));
        let runner = InterceptorRunner::new()
            .with(Scope::All, Count(counter.clone()))
            .with(Scope::All, Deny)
            .with(Scope::All, Count(counter.clone()));

        let mut ctx = routed("Album.Index");
        assert!(matches!(runner.run_before(&mut ctx), Intercept::Respond(_)));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_after_hooks_only_add_headers() {
        let runner = InterceptorRunner::new()
            .with(Scope::All, Tag("first"))
            .with(Scope::All, Tag("second"));
        let mut ctx = routed("Album.Index");
        ctx.response.status = StatusCode::CREATED;

        runner.run_after(&mut ctx);
        assert_eq!(ctx.response().headers["x-tag"], "first");
        assert_eq!(ctx.response().status, StatusCode::CREATED);
        assert_eq!(runner.len(), 2);
    }
}
