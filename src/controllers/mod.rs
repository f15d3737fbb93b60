//! Application controllers.
//!
//! # Responsibilities
//! - Register every route with its action name and parameter table
//! - Translate bound parameters into collaborator calls
//! - Pick the result kind: page, JSON, `{ok, msg}` or redirect
//!
//! # Design Decisions
//! - Controllers hold their collaborators behind `Arc<dyn …>`
//! - Action names are `Controller.Action`; interceptor scopes use the
//!   controller part

pub mod album;
pub mod auth;
pub mod suggestion;

use std::sync::Arc;

use crate::config::SecurityConfig;
use crate::pipeline::{
    handler_fn, Action, ActionResult, Context, HandlerFault, HandlerResult, InterceptorRunner, Scope,
};
use crate::routing::{RouteError, RouteTable, RouteTableBuilder};
use crate::security::SecurityHeaders;
use crate::services::{AlbumService, AuthService, Mailer, SuggestionService};

pub use album::AlbumController;
pub use auth::{AuthController, RequireLogin};
pub use suggestion::SuggestionController;

/// Session key holding the signed-in email.
pub const EMAIL_KEY: &str = "Email";

/// Collaborators the controllers are built from.
#[derive(Clone)]
pub struct Services {
    pub albums: Arc<dyn AlbumService>,
    pub suggestions: Arc<dyn SuggestionService>,
    pub auth: Arc<dyn AuthService>,
    pub mailer: Arc<dyn Mailer>,
    pub admin_address: String,
}

/// Wrap a controller method as a named action.
pub(crate) fn action<C>(
    name: &str,
    controller: &Arc<C>,
    method: fn(&C, &mut Context) -> HandlerResult,
) -> Action
where
    C: Send + Sync + 'static,
{
    let controller = Arc::clone(controller);
    Action::new(name, handler_fn(move |ctx| method(&controller, ctx)))
}

/// The signed-in user. Guarded actions only run when one exists.
pub(crate) fn current_user(ctx: &Context) -> Result<String, HandlerFault> {
    ctx.user_id()
        .map(str::to_string)
        .ok_or_else(|| HandlerFault::internal("guarded action reached without a user"))
}

fn register_app(routes: RouteTableBuilder) -> Result<RouteTableBuilder, RouteError> {
    routes.get(
        "/",
        Action::new(
            "App.Index",
            handler_fn(|_| Ok(ActionResult::redirect("/album/index"))),
        ),
    )
}

/// The complete route table.
pub fn build_routes(services: &Services) -> Result<RouteTable, RouteError> {
    let routes = register_app(RouteTable::builder())?;
    let routes = AuthController::new(Arc::clone(&services.auth)).register(routes)?;
    let routes = AlbumController::new(Arc::clone(&services.albums)).register(routes)?;
    let routes = SuggestionController::new(
        Arc::clone(&services.suggestions),
        Arc::clone(&services.mailer),
        services.admin_address.clone(),
    )
    .register(routes)?;
    Ok(routes.build())
}

/// Interceptors in declaration order.
pub fn build_interceptors(security: &SecurityConfig) -> InterceptorRunner {
    let mut runner = InterceptorRunner::new()
        .with(Scope::controller("Album"), RequireLogin)
        .with(Scope::controller("Suggestion"), RequireLogin);
    if security.enable_headers {
        runner = runner.with(Scope::All, SecurityHeaders);
    }
    runner
}
