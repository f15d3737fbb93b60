//! Action descriptors and invocation.
//!
//! # Responsibilities
//! - Describe an action: name, handler and parameter table
//! - Call the handler under the per-request deadline
//! - Turn the [`ActionResult`] into a response draft (render, JSON,
//!   redirect, raw bytes, bare status)
//!
//! # Design Decisions
//! - Handlers are trait objects so sync closures and async bodies share one
//!   table
//! - A handler error is a [`HandlerFault`]; the executor's fault boundary
//!   decides what the client sees

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::http::{header, HeaderValue, StatusCode};
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::i18n::MessageCatalog;
use crate::pipeline::binder::ParamSpec;
use crate::pipeline::context::{Context, ResponseDraft};
use crate::render::{RenderArgs, RenderError, TemplateSet};

/// What an action asks the pipeline to send.
#[derive(Debug, Clone)]
pub enum ActionResult {
    Render { template: String, args: RenderArgs },
    Json(Value),
    Redirect(String),
    Bytes { content_type: String, body: Bytes },
    Status(StatusCode),
}

impl ActionResult {
    pub fn render(template: impl Into<String>, args: RenderArgs) -> Self {
        ActionResult::Render {
            template: template.into(),
            args,
        }
    }

    pub fn json<T: Serialize>(value: &T) -> Result<Self, HandlerFault> {
        Ok(ActionResult::Json(serde_json::to_value(value)?))
    }

    /// `{ "ok": .., "msg": .. }` response used by the script endpoints.
    pub fn envelope(ok: bool, msg: impl Into<String>) -> Self {
        ActionResult::Json(serde_json::json!({ "ok": ok, "msg": msg.into() }))
    }

    pub fn redirect(location: impl Into<String>) -> Self {
        ActionResult::Redirect(location.into())
    }

    pub fn bytes(content_type: impl Into<String>, body: impl Into<Bytes>) -> Self {
        ActionResult::Bytes {
            content_type: content_type.into(),
            body: body.into(),
        }
    }
}

/// Decoded form of [`ActionResult::envelope`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub ok: bool,
    pub msg: String,
}

#[derive(Debug, Error)]
pub enum HandlerFault {
    #[error("{0}")]
    Internal(String),

    #[error("render failed: {0}")]
    Render(#[from] RenderError),

    #[error("response serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("handler exceeded its deadline of {0:?}")]
    DeadlineExceeded(Duration),
}

impl HandlerFault {
    pub fn internal(msg: impl Into<String>) -> Self {
        HandlerFault::Internal(msg.into())
    }

    /// Status of the generic error page for this fault.
    pub fn status(&self) -> StatusCode {
        match self {
            HandlerFault::DeadlineExceeded(_) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Label for the aborts metric.
    pub fn reason(&self) -> &'static str {
        match self {
            HandlerFault::Internal(_) => "internal",
            HandlerFault::Render(_) => "render",
            HandlerFault::Serialize(_) => "serialize",
            HandlerFault::DeadlineExceeded(_) => "deadline",
        }
    }
}

pub type HandlerResult = Result<ActionResult, HandlerFault>;

/// An action body.
pub trait Handler: Send + Sync + 'static {
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, HandlerResult>;
}

/// Adapter for synchronous handler closures.
pub struct FnHandler<F>(F);

pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: Fn(&mut Context) -> HandlerResult + Send + Sync + 'static,
{
    FnHandler(f)
}

impl<F> Handler for FnHandler<F>
where
    F: Fn(&mut Context) -> HandlerResult + Send + Sync + 'static,
{
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, HandlerResult> {
        Box::pin(std::future::ready((self.0)(ctx)))
    }
}

/// A routable action: `Controller.Action` name, handler, declared params.
pub struct Action {
    name: String,
    handler: Arc<dyn Handler>,
    params: Vec<ParamSpec>,
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl Action {
    pub fn new(name: impl Into<String>, handler: impl Handler) -> Self {
        Self {
            name: name.into(),
            handler: Arc::new(handler),
            params: Vec::new(),
        }
    }

    pub fn with_params(mut self, params: &[ParamSpec]) -> Self {
        self.params = params.to_vec();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Controller part of the name (`Album` for `Album.Index`).
    pub fn controller(&self) -> &str {
        self.name
            .split_once('.')
            .map(|(controller, _)| controller)
            .unwrap_or(&self.name)
    }

    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }
}

/// Calls the routed action and renders its result.
#[derive(Debug, Clone)]
pub struct ActionInvoker {
    templates: Arc<TemplateSet>,
    messages: Arc<MessageCatalog>,
    budget: Duration,
}

impl ActionInvoker {
    pub fn new(templates: Arc<TemplateSet>, messages: Arc<MessageCatalog>, budget: Duration) -> Self {
        Self {
            templates,
            messages,
            budget,
        }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Invoke the routed action and store its response draft.
    pub async fn invoke(&self, ctx: &mut Context) -> Result<(), HandlerFault> {
        let action = match ctx.route.as_ref() {
            Some(route) => Arc::clone(&route.action),
            None => return Err(HandlerFault::internal("invoke called without a route")),
        };

        let result = tokio::time::timeout(self.budget, action.handler.call(ctx))
            .await
            .map_err(|_| HandlerFault::DeadlineExceeded(self.budget))??;

        self.respond(ctx, result)
    }

    /// Store the draft for a result produced outside the handler (for
    /// example by a before-interceptor).
    pub fn respond(&self, ctx: &mut Context, result: ActionResult) -> Result<(), HandlerFault> {
        ctx.response = self.draft(ctx, result)?;
        Ok(())
    }

    fn draft(&self, ctx: &Context, result: ActionResult) -> Result<ResponseDraft, HandlerFault> {
        let draft = match result {
            ActionResult::Render { template, mut args } => {
                self.fill_view_args(ctx, &mut args);
                let html = self
                    .templates
                    .render(&template, &args, ctx.locale(), &self.messages)?;
                ResponseDraft::html(StatusCode::OK, html)
            }
            ActionResult::Json(value) => {
                ResponseDraft::json(StatusCode::OK, serde_json::to_vec(&value)?)
            }
            ActionResult::Redirect(location) => {
                let location = HeaderValue::from_str(&location).map_err(|_| {
                    HandlerFault::internal(format!("invalid redirect location `{location}`"))
                })?;
                ResponseDraft::redirect(location)
            }
            ActionResult::Bytes { content_type, body } => {
                let mut draft = ResponseDraft::new(StatusCode::OK);
                let content_type = HeaderValue::from_str(&content_type).map_err(|_| {
                    HandlerFault::internal(format!("invalid content type `{content_type}`"))
                })?;
                draft.headers.insert(header::CONTENT_TYPE, content_type);
                draft.body = body;
                draft
            }
            ActionResult::Status(status) => ResponseDraft::new(status),
        };
        Ok(draft)
    }

    /// Values every view can use: locale, the incoming flash and its field
    /// errors. Handler-supplied args win.
    fn fill_view_args(&self, ctx: &Context, args: &mut RenderArgs) {
        if !args.has("locale") {
            args.insert("locale", ctx.locale().as_str());
        }
        let incoming = ctx.flash().incoming();
        if !args.has("flash") {
            let flash: Map<String, Value> = incoming
                .messages
                .iter()
                .map(|(k, v)| (k.clone(), Value::from(v.as_str())))
                .collect();
            args.insert("flash", Value::Object(flash));
        }
        if !args.has("errors") {
            let mut errors = Map::new();
            for e in &incoming.errors {
                errors
                    .entry(e.field.clone())
                    .or_insert_with(|| Value::from(e.message.as_str()));
            }
            args.insert("errors", Value::Object(errors));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::Locale;
    use crate::pipeline::binder::ParamKind;
    use axum::http::Request;

    fn invoker(budget: Duration) -> ActionInvoker {
        ActionInvoker::new(
            Arc::new(TemplateSet::builtin()),
            Arc::new(MessageCatalog::with_builtin(Locale::new("en-us"))),
            budget,
        )
    }

    fn context() -> Context {
        let request = Request::builder().uri("/").body(Bytes::new()).unwrap();
        Context::new(
            request,
            "t".into(),
            Locale::new("fr-fr"),
            Arc::new(MessageCatalog::with_builtin(Locale::new("en-us"))),
        )
    }

    #[test]
    fn test_action_names() {
        let action = Action::new("Album.Index", handler_fn(|_| Ok(ActionResult::Status(StatusCode::OK))))
            .with_params(&[ParamSpec::required("name", ParamKind::Str)]);
        assert_eq!(action.name(), "Album.Index");
        assert_eq!(action.controller(), "Album");
        assert_eq!(action.params().len(), 1);
        assert!(format!("{action:?}").contains("Album.Index"));
    }

    #[test]
    fn test_envelope_shape() {
        let ActionResult::Json(value) = ActionResult::envelope(false, "NOTLOGIN") else {
            panic!("expected JSON");
        };
        let envelope: Envelope = serde_json::from_value(value).unwrap();
        assert_eq!(
            envelope,
            Envelope {
                ok: false,
                msg: "NOTLOGIN".into()
            }
        );
    }

    #[test]
    fn test_render_uses_context_locale() {
        let invoker = invoker(Duration::from_secs(1));
        let mut ctx = context();
        invoker
            .respond(&mut ctx, ActionResult::render("auth/login.html", RenderArgs::new()))
            .unwrap();
        let body = String::from_utf8(ctx.response().body.to_vec()).unwrap();
        assert!(body.contains("<h1>Connexion</h1>"));
        assert!(body.contains(r#"lang="fr-fr""#));
    }

    #[test]
    fn test_redirect_and_status() {
        let invoker = invoker(Duration::from_secs(1));
        let mut ctx = context();
        invoker.respond(&mut ctx, ActionResult::redirect("/login")).unwrap();
        assert_eq!(ctx.response().status, StatusCode::FOUND);
        assert_eq!(ctx.response().headers[header::LOCATION], "/login");

        invoker
            .respond(&mut ctx, ActionResult::Status(StatusCode::NO_CONTENT))
            .unwrap();
        assert_eq!(ctx.response().status, StatusCode::NO_CONTENT);
        assert!(ctx.response().body.is_empty());
    }

    #[test]
    fn test_unknown_template_is_a_fault() {
        let invoker = invoker(Duration::from_secs(1));
        let mut ctx = context();
        let err = invoker
            .respond(&mut ctx, ActionResult::render("nope.html", RenderArgs::new()))
            .unwrap_err();
        assert!(matches!(err, HandlerFault::Render(RenderError::UnknownTemplate(_))));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_invoke_without_route_is_a_fault() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        let invoker = invoker(Duration::from_secs(1));
        let mut ctx = context();
        let err = runtime.block_on(invoker.invoke(&mut ctx)).unwrap_err();
        assert!(matches!(err, HandlerFault::Internal(_)));
        assert_eq!(HandlerFault::DeadlineExceeded(Duration::from_millis(5)).status(), StatusCode::GATEWAY_TIMEOUT);
    }
}
