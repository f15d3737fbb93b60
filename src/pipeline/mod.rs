//! Request-processing pipeline.
//!
//! # Data Flow
//! ```text
//! RawRequest
//!     → executor.rs (Context, fault boundary, stage trace)
//!     → routing::RouteTable (action + path params, or 404)
//!     → binder.rs (typed parameter bag, per-field errors)
//!     → session::SessionCodec / i18n::LocaleResolver / session::FlashCodec
//!     → interceptor.rs (before-hooks, may short-circuit)
//!     → invoker.rs (handler under deadline → response draft)
//!     → interceptor.rs (after-hooks, header augmentation only)
//!     → compression.rs (body encoding)
//!     → session + flash cookies appended
//!     → Response
//! ```
//!
//! # Design Decisions
//! - One immutable `Pipeline` value per process, built by startup
//! - `Context` is owned by a single request and never shared
//! - Exactly one terminal state per request: `Sent` or `Aborted`

pub mod binder;
pub mod compression;
pub mod context;
pub mod executor;
pub mod interceptor;
pub mod invoker;

pub use binder::{BindingError, BoundValue, ParamBinder, ParamKind, ParamSource, ParamSpec, Params};
pub use compression::{CompressionEncoder, Encoding};
pub use context::{Context, RawRequest, ResponseDraft, Stage, Terminal};
pub use executor::{Outcome, Pipeline, PipelineBuilder};
pub use interceptor::{AfterResponse, Intercept, Interceptor, InterceptorRunner, Scope};
pub use invoker::{
    handler_fn, Action, ActionInvoker, ActionResult, Envelope, FnHandler, Handler, HandlerFault,
    HandlerResult,
};
