//! Pipeline executor.
//!
//! # Responsibilities
//! - Build a [`Context`] per request and run the stages in fixed order
//! - Convert handler faults and panics into the generic error page
//! - Record the stage trace, terminal state and request metrics
//!
//! # Design Decisions
//! - Built once at startup, shared by `Arc`, never mutated afterwards
//! - Stages before Invoke resolve their own failures; only the boundary
//!   here turns a fault into a response
//! - Cookies are appended after compression so they stay out of the body

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::{header, Response, StatusCode};
use futures_util::FutureExt;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::{CompressionConfig, I18nConfig};
use crate::http::request;
use crate::http::response::error_page;
use crate::i18n::{LocaleResolver, LocaleSignals, LocaleSource, MessageCatalog};
use crate::observability::metrics;
use crate::pipeline::binder::ParamBinder;
use crate::pipeline::compression::CompressionEncoder;
use crate::pipeline::context::{Context, RawRequest, ResponseDraft, Stage, Terminal};
use crate::pipeline::interceptor::{Intercept, InterceptorRunner};
use crate::pipeline::invoker::{ActionInvoker, HandlerFault};
use crate::render::TemplateSet;
use crate::routing::{Lookup, RouteTable};
use crate::session::{CookieSigner, Flash, FlashCodec, SessionCodec, SetCookie};

/// Locale override cookies live for a year.
const LOCALE_COOKIE_MAX_AGE: u64 = 365 * 24 * 3600;

/// Result of one pipeline run.
#[derive(Debug)]
pub struct Outcome {
    pub response: Response<Body>,
    pub terminal: Terminal,
    /// Stages entered, in order.
    pub trace: Vec<Stage>,
    /// Matched action, if routing succeeded.
    pub action: Option<String>,
}

/// The request-processing pipeline.
#[derive(Debug)]
pub struct Pipeline {
    routes: RouteTable,
    binder: ParamBinder,
    sessions: SessionCodec,
    flash: FlashCodec,
    locales: LocaleResolver,
    interceptors: InterceptorRunner,
    invoker: ActionInvoker,
    compression: CompressionEncoder,
    messages: Arc<MessageCatalog>,
    secure_cookies: bool,
}

impl Pipeline {
    pub fn builder(routes: RouteTable) -> PipelineBuilder {
        PipelineBuilder::new(routes)
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Run a request and return only the response.
    pub async fn run(&self, request: RawRequest) -> Response<Body> {
        self.execute(request).await.response
    }

    /// Run a request through every stage inside the fault boundary.
    pub async fn execute(&self, request: RawRequest) -> Outcome {
        let request_id = request::request_id(request.headers())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let span = tracing::info_span!(
            "pipeline",
            request_id = %request_id,
            method = %request.method(),
            path = %request.uri().path(),
        );
        self.execute_in_span(request, request_id).instrument(span).await
    }

    async fn execute_in_span(&self, request: RawRequest, request_id: String) -> Outcome {
        let start = Instant::now();
        let method = request.method().clone();
        let mut ctx = Context::new(
            request,
            request_id,
            self.locales.default_locale().clone(),
            Arc::clone(&self.messages),
        );
        ctx.enter(Stage::PanicGuard);

        let guarded = AssertUnwindSafe(self.drive(&mut ctx)).catch_unwind().await;
        let failure = match guarded {
            Ok(Ok(())) => None,
            Ok(Err(fault)) => Some((fault.status(), fault.reason(), fault.to_string())),
            Err(payload) => Some((
                StatusCode::INTERNAL_SERVER_ERROR,
                "panic",
                format!("handler panicked: {}", panic_message(payload.as_ref())),
            )),
        };

        let terminal = match failure {
            None => Terminal::Sent,
            Some((status, reason, message)) => {
                tracing::error!(
                    request_id = %ctx.request_id(),
                    action = ctx.action_name().unwrap_or("none"),
                    status = status.as_u16(),
                    error = %message,
                    "Request aborted"
                );
                metrics::record_abort(reason);
                ctx.fault = Some(message);
                ctx.response = error_page(status);
                Terminal::Aborted
            }
        };

        ctx.enter(Stage::Send);
        let action = ctx.action_name().map(str::to_string);
        let status = ctx.response.status;
        metrics::record_request(
            method.as_str(),
            status.as_u16(),
            action.as_deref().unwrap_or("none"),
            start,
        );
        tracing::debug!(
            status = status.as_u16(),
            action = action.as_deref().unwrap_or("none"),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Request completed"
        );

        let trace = ctx.take_trace();
        let response = std::mem::take(&mut ctx.response).into_response();
        Outcome {
            response,
            terminal,
            trace,
            action,
        }
    }

    async fn drive(&self, ctx: &mut Context) -> Result<(), HandlerFault> {
        ctx.enter(Stage::Route);
        match self.routes.lookup(ctx.method(), ctx.path()) {
            Lookup::Found(route) => ctx.route = Some(route),
            Lookup::NotFound => {
                tracing::debug!(path = %ctx.path(), "No route matched");
                ctx.response = error_page(StatusCode::NOT_FOUND);
                self.finish(ctx);
                return Ok(());
            }
        }

        ctx.enter(Stage::BindParams);
        self.binder.bind(ctx);

        ctx.enter(Stage::RestoreSession);
        ctx.session = self.sessions.restore(&ctx.cookies);
        ctx.session_restored = true;

        ctx.enter(Stage::ResolveLocale);
        self.resolve_locale(ctx);

        ctx.enter(Stage::RestoreFlash);
        let bag = self.flash.restore(&mut ctx.cookies);
        ctx.flash = Flash::from_incoming(bag);
        ctx.flash_restored = true;

        ctx.enter(Stage::BeforeInterceptors);
        match self.interceptors.run_before(ctx) {
            Intercept::Respond(result) => {
                ctx.short_circuited = true;
                self.invoker.respond(ctx, result)?;
            }
            Intercept::Continue => {
                ctx.enter(Stage::Invoke);
                self.invoker.invoke(ctx).await?;

                ctx.enter(Stage::AfterInterceptors);
                self.interceptors.run_after(ctx);
            }
        }

        self.finish(ctx);
        Ok(())
    }

    fn resolve_locale(&self, ctx: &mut Context) {
        let query_override = ctx.uri().query().and_then(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .find(|(k, _)| k == self.locales.query_param())
                .map(|(_, v)| v.into_owned())
        });
        let cookie_name = self.locales.cookie_name();
        let resolution = self.locales.resolve(LocaleSignals {
            query: query_override.as_deref(),
            cookie: ctx.cookies.get(cookie_name),
            accept_language: ctx.header(header::ACCEPT_LANGUAGE),
        });

        if resolution.source == LocaleSource::Query
            && ctx.cookies.get(cookie_name) != Some(resolution.locale.as_str())
        {
            ctx.outgoing_cookies.push(
                SetCookie::new(cookie_name, resolution.locale.as_str())
                    .max_age(LOCALE_COOKIE_MAX_AGE)
                    .secure(self.secure_cookies),
            );
        }
        tracing::trace!(locale = %resolution.locale, source = ?resolution.source, "Resolved locale");
        ctx.locale = resolution.locale;
    }

    /// Response-side stages, shared by routed requests and routing misses.
    fn finish(&self, ctx: &mut Context) {
        ctx.enter(Stage::Compress);
        let method = ctx.method().clone();
        let accept = ctx.header(header::ACCEPT_ENCODING).map(str::to_string);
        self.compression
            .apply(&method, accept.as_deref(), &mut ctx.response);

        ctx.enter(Stage::PersistSession);
        if ctx.session_restored {
            if let Some(cookie) = self.sessions.set_cookie(&ctx.session, &ctx.cookies) {
                ctx.outgoing_cookies.push(cookie);
            }
        }
        let queued = std::mem::take(&mut ctx.outgoing_cookies);
        for cookie in &queued {
            append_cookie(&mut ctx.response, cookie);
        }

        ctx.enter(Stage::PersistFlash);
        if ctx.flash_restored {
            if let Some(cookie) = self.flash.set_cookie(ctx.flash.outgoing(), &ctx.cookies) {
                append_cookie(&mut ctx.response, &cookie);
            }
        }
    }
}

fn append_cookie(draft: &mut ResponseDraft, cookie: &SetCookie) {
    match cookie.to_header_value() {
        Some(value) => {
            draft.headers.append(header::SET_COOKIE, value);
        }
        None => tracing::warn!(cookie = %cookie.name, "Dropping cookie with invalid header value"),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Assembles a [`Pipeline`]; every collaborator has a working default.
pub struct PipelineBuilder {
    routes: RouteTable,
    sessions: Option<SessionCodec>,
    flash: Option<FlashCodec>,
    locales: Option<LocaleResolver>,
    interceptors: InterceptorRunner,
    templates: Option<Arc<TemplateSet>>,
    messages: Option<Arc<MessageCatalog>>,
    compression: Option<CompressionEncoder>,
    handler_timeout: Duration,
    secure_cookies: bool,
}

impl PipelineBuilder {
    pub fn new(routes: RouteTable) -> Self {
        Self {
            routes,
            sessions: None,
            flash: None,
            locales: None,
            interceptors: InterceptorRunner::new(),
            templates: None,
            messages: None,
            compression: None,
            handler_timeout: Duration::from_secs(10),
            secure_cookies: false,
        }
    }

    pub fn sessions(mut self, sessions: SessionCodec) -> Self {
        self.sessions = Some(sessions);
        self
    }

    pub fn flash(mut self, flash: FlashCodec) -> Self {
        self.flash = Some(flash);
        self
    }

    pub fn locales(mut self, locales: LocaleResolver) -> Self {
        self.locales = Some(locales);
        self
    }

    pub fn interceptors(mut self, interceptors: InterceptorRunner) -> Self {
        self.interceptors = interceptors;
        self
    }

    pub fn templates(mut self, templates: Arc<TemplateSet>) -> Self {
        self.templates = Some(templates);
        self
    }

    pub fn messages(mut self, messages: Arc<MessageCatalog>) -> Self {
        self.messages = Some(messages);
        self
    }

    pub fn compression(mut self, compression: CompressionEncoder) -> Self {
        self.compression = Some(compression);
        self
    }

    pub fn handler_timeout(mut self, timeout: Duration) -> Self {
        self.handler_timeout = timeout;
        self
    }

    pub fn secure_cookies(mut self, secure: bool) -> Self {
        self.secure_cookies = secure;
        self
    }

    pub fn build(self) -> Pipeline {
        let signer = CookieSigner::random();
        let sessions = self.sessions.unwrap_or_else(|| {
            SessionCodec::new(signer.clone(), "NOTEBOOK_SESSION", 7 * 24 * 3600, self.secure_cookies)
        });
        let flash = self
            .flash
            .unwrap_or_else(|| FlashCodec::new(signer, "NOTEBOOK_FLASH", self.secure_cookies));
        let locales = self
            .locales
            .unwrap_or_else(|| LocaleResolver::from_config(&I18nConfig::default()));
        let messages = self.messages.unwrap_or_else(|| {
            Arc::new(MessageCatalog::with_builtin(locales.default_locale().clone()))
        });
        let templates = self
            .templates
            .unwrap_or_else(|| Arc::new(TemplateSet::builtin()));
        let compression = self
            .compression
            .unwrap_or_else(|| CompressionEncoder::from_config(&CompressionConfig::default()));

        Pipeline {
            routes: self.routes,
            binder: ParamBinder::new(),
            sessions,
            flash,
            locales,
            interceptors: self.interceptors,
            invoker: ActionInvoker::new(templates, Arc::clone(&messages), self.handler_timeout),
            compression,
            messages,
            secure_cookies: self.secure_cookies,
        }
    }
}
