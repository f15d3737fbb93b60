//! Per-request state threaded through the pipeline.
//!
//! A [`Context`] is created by the executor for exactly one request and
//! dropped once the response is built. It is never shared across requests.

use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, HeaderValue, Method, Request, Response, StatusCode, Uri};

use crate::i18n::{Locale, MessageCatalog};
use crate::pipeline::binder::Params;
use crate::routing::RouteMatch;
use crate::session::{CookieJar, Flash, Session, SetCookie};

/// A fully buffered inbound request.
pub type RawRequest = Request<Bytes>;

/// Ordered stages of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    PanicGuard,
    Route,
    BindParams,
    RestoreSession,
    ResolveLocale,
    RestoreFlash,
    BeforeInterceptors,
    Invoke,
    AfterInterceptors,
    Compress,
    PersistSession,
    PersistFlash,
    Send,
}

impl Stage {
    /// Every stage, in execution order.
    pub const ORDER: [Stage; 13] = [
        Stage::PanicGuard,
        Stage::Route,
        Stage::BindParams,
        Stage::RestoreSession,
        Stage::ResolveLocale,
        Stage::RestoreFlash,
        Stage::BeforeInterceptors,
        Stage::Invoke,
        Stage::AfterInterceptors,
        Stage::Compress,
        Stage::PersistSession,
        Stage::PersistFlash,
        Stage::Send,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::PanicGuard => "panic_guard",
            Stage::Route => "route",
            Stage::BindParams => "bind_params",
            Stage::RestoreSession => "restore_session",
            Stage::ResolveLocale => "resolve_locale",
            Stage::RestoreFlash => "restore_flash",
            Stage::BeforeInterceptors => "before_interceptors",
            Stage::Invoke => "invoke",
            Stage::AfterInterceptors => "after_interceptors",
            Stage::Compress => "compress",
            Stage::PersistSession => "persist_session",
            Stage::PersistFlash => "persist_flash",
            Stage::Send => "send",
        }
    }
}

/// How a request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminal {
    /// The pipeline produced a response normally.
    Sent,
    /// The fault boundary replaced the response with the generic error page.
    Aborted,
}

/// Response under construction.
#[derive(Debug, Clone)]
pub struct ResponseDraft {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Default for ResponseDraft {
    fn default() -> Self {
        Self::new(StatusCode::OK)
    }
}

impl ResponseDraft {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn with_body(status: StatusCode, content_type: &'static str, body: impl Into<Bytes>) -> Self {
        let mut draft = Self::new(status);
        draft
            .headers
            .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        draft.body = body.into();
        draft
    }

    pub fn html(status: StatusCode, html: impl Into<String>) -> Self {
        Self::with_body(status, "text/html; charset=utf-8", html.into())
    }

    pub fn json(status: StatusCode, json: Vec<u8>) -> Self {
        Self::with_body(status, "application/json; charset=utf-8", json)
    }

    pub fn redirect(location: HeaderValue) -> Self {
        let mut draft = Self::new(StatusCode::FOUND);
        draft.headers.insert(header::LOCATION, location);
        draft
    }

    pub fn into_response(self) -> Response<Body> {
        let mut response = Response::new(Body::from(self.body.clone()));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
            .headers_mut()
            .insert(header::CONTENT_LENGTH, HeaderValue::from(self.body.len()));
        response
    }
}

/// Per-request state.
#[derive(Debug)]
pub struct Context {
    request_id: String,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    pub(crate) cookies: CookieJar,
    pub(crate) route: Option<RouteMatch>,
    pub(crate) params: Params,
    pub(crate) session: Session,
    pub(crate) session_restored: bool,
    pub(crate) flash: Flash,
    pub(crate) flash_restored: bool,
    pub(crate) locale: Locale,
    pub(crate) outgoing_cookies: Vec<SetCookie>,
    pub(crate) response: ResponseDraft,
    pub(crate) fault: Option<String>,
    pub(crate) short_circuited: bool,
    messages: Arc<MessageCatalog>,
    trace: Vec<Stage>,
}

impl Context {
    pub fn new(
        request: RawRequest,
        request_id: String,
        locale: Locale,
        messages: Arc<MessageCatalog>,
    ) -> Self {
        let (parts, body) = request.into_parts();
        let cookies = CookieJar::from_headers(&parts.headers);
        Self {
            request_id,
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body,
            cookies,
            route: None,
            params: Params::default(),
            session: Session::default(),
            session_restored: false,
            flash: Flash::default(),
            flash_restored: false,
            locale,
            outgoing_cookies: Vec::new(),
            response: ResponseDraft::default(),
            fault: None,
            short_circuited: false,
            messages,
            trace: Vec::with_capacity(Stage::ORDER.len()),
        }
    }

    pub(crate) fn enter(&mut self, stage: Stage) {
        tracing::trace!(request_id = %self.request_id, stage = stage.as_str(), "Entering stage");
        self.trace.push(stage);
    }

    pub(crate) fn take_trace(&mut self) -> Vec<Stage> {
        std::mem::take(&mut self.trace)
    }

    pub fn trace(&self) -> &[Stage] {
        &self.trace
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn header(&self, name: impl header::AsHeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn cookies(&self) -> &CookieJar {
        &self.cookies
    }

    /// Whether the request came from script (`X-Requested-With: XMLHttpRequest`).
    pub fn is_xhr(&self) -> bool {
        self.header("x-requested-with")
            .is_some_and(|v| v.eq_ignore_ascii_case("XMLHttpRequest"))
    }

    pub fn route(&self) -> Option<&RouteMatch> {
        self.route.as_ref()
    }

    /// `Controller.Action` of the matched route.
    pub fn action_name(&self) -> Option<&str> {
        self.route.as_ref().map(|r| r.action.name())
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Authenticated user id from the session.
    pub fn user_id(&self) -> Option<&str> {
        self.session.user_id()
    }

    pub fn flash(&self) -> &Flash {
        &self.flash
    }

    pub fn flash_mut(&mut self) -> &mut Flash {
        &mut self.flash
    }

    pub fn locale(&self) -> &Locale {
        &self.locale
    }

    /// Catalog message in the request locale.
    pub fn message(&self, key: &str, args: &[&str]) -> String {
        self.messages.message(&self.locale, key, args)
    }

    pub fn response(&self) -> &ResponseDraft {
        &self.response
    }

    pub fn fault(&self) -> Option<&str> {
        self.fault.as_deref()
    }

    pub fn short_circuited(&self) -> bool {
        self.short_circuited
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order_is_complete_and_unique() {
        let mut seen = std::collections::HashSet::new();
        for stage in Stage::ORDER {
            assert!(seen.insert(stage), "{} listed twice", stage.as_str());
        }
        assert_eq!(Stage::ORDER.first(), Some(&Stage::PanicGuard));
        assert_eq!(Stage::ORDER.last(), Some(&Stage::Send));
    }

    #[test]
    fn test_context_reads_request() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/album/addAlbum?x=1")
            .header("cookie", "a=b")
            .header("x-requested-with", "XMLHttpRequest")
            .body(Bytes::from_static(b"name=x"))
            .unwrap();
        let ctx = Context::new(
            request,
            "req-1".into(),
            Locale::new("en-us"),
            Arc::new(MessageCatalog::with_builtin(Locale::new("en-us"))),
        );

        assert_eq!(ctx.path(), "/album/addAlbum");
        assert_eq!(ctx.cookies().get("a"), Some("b"));
        assert!(ctx.is_xhr());
        assert_eq!(ctx.user_id(), None);
        assert_eq!(ctx.message("login.title", &[]), "Sign in");
    }

    #[test]
    fn test_draft_into_response_sets_length() {
        let response = ResponseDraft::html(StatusCode::OK, "<p>hi</p>").into_response();
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "9");
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/html; charset=utf-8"
        );
    }
}
