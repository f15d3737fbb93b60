//! Sign-in, sign-out and the login guard.

use std::sync::Arc;

use crate::controllers::{action, EMAIL_KEY};
use crate::pipeline::{
    ActionResult, Context, HandlerResult, Intercept, Interceptor, ParamKind, ParamSpec,
};
use crate::render::RenderArgs;
use crate::routing::{RouteError, RouteTableBuilder};
use crate::services::AuthService;
use crate::session::USER_ID_KEY;

/// Shortest accepted password.
pub const MIN_PASSWORD_LEN: usize = 6;

pub struct AuthController {
    auth: Arc<dyn AuthService>,
}

impl AuthController {
    pub fn new(auth: Arc<dyn AuthService>) -> Self {
        Self { auth }
    }

    pub fn register(self, routes: RouteTableBuilder) -> Result<RouteTableBuilder, RouteError> {
        let this = Arc::new(self);
        routes
            .get("/login", action("Auth.Login", &this, Self::login))?
            .post(
                "/doLogin",
                action("Auth.DoLogin", &this, Self::do_login).with_params(&[
                    ParamSpec::required("email", ParamKind::Str),
                    ParamSpec::required("pwd", ParamKind::Str),
                ]),
            )?
            .get("/logout", action("Auth.Logout", &this, Self::logout))
    }

    fn login(&self, ctx: &mut Context) -> HandlerResult {
        if ctx.user_id().is_some() {
            return Ok(ActionResult::redirect("/album/index"));
        }
        let email = ctx.flash().incoming().get("email").unwrap_or_default().to_string();
        let mut args = RenderArgs::new();
        args.insert("email", email);
        Ok(ActionResult::render("auth/login.html", args))
    }

    fn do_login(&self, ctx: &mut Context) -> HandlerResult {
        let email = ctx.params().string("email").trim().to_string();
        let pwd = ctx.params().string("pwd").to_string();

        let mut invalid = Vec::new();
        for error in ctx.params().errors() {
            let label = match error.field() {
                "email" => ctx.message("login.email", &[]),
                "pwd" => ctx.message("login.password", &[]),
                other => other.to_string(),
            };
            invalid.push((error.field().to_string(), ctx.message("validation.required", &[&label])));
        }
        if !pwd.is_empty() && pwd.chars().count() < MIN_PASSWORD_LEN {
            let min = MIN_PASSWORD_LEN.to_string();
            invalid.push(("pwd".to_string(), ctx.message("validation.password_length", &[&min])));
        }

        if !invalid.is_empty() {
            let flash = ctx.flash_mut();
            for (field, message) in invalid {
                flash.field_error(field, message);
            }
            flash.put("email", email);
            return Ok(ActionResult::redirect("/login"));
        }

        match self.auth.login(&email, &pwd) {
            Ok(user) => {
                tracing::info!(user_id = %user.user_id, "User signed in");
                let session = ctx.session_mut();
                session.set(USER_ID_KEY, user.user_id);
                session.set(EMAIL_KEY, user.email);
                Ok(ActionResult::redirect("/album/index"))
            }
            Err(e) => {
                tracing::info!(email = %email, reason = %e, "Sign-in refused");
                let message = ctx.message("login.failed", &[]);
                let flash = ctx.flash_mut();
                flash.error(message);
                flash.put("email", email);
                Ok(ActionResult::redirect("/login"))
            }
        }
    }

    fn logout(&self, ctx: &mut Context) -> HandlerResult {
        if let Some(user_id) = ctx.user_id() {
            tracing::info!(user_id = %user_id, "User signed out");
        }
        ctx.session_mut().clear();
        Ok(ActionResult::redirect("/login"))
    }
}

/// Rejects anonymous requests. Script requests get `{ok:false, msg:"NOTLOGIN"}`,
/// page requests a redirect to the sign-in page.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequireLogin;

impl Interceptor for RequireLogin {
    fn name(&self) -> &str {
        "require_login"
    }

    fn before(&self, ctx: &mut Context) -> Intercept {
        if ctx.user_id().is_some() {
            return Intercept::Continue;
        }
        if ctx.is_xhr() {
            return Intercept::Respond(ActionResult::envelope(false, "NOTLOGIN"));
        }
        let message = ctx.message("login.required", &[]);
        ctx.flash_mut().error(message);
        Intercept::Respond(ActionResult::redirect("/login"))
    }
}
