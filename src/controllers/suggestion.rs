//! Suggestion box.

use std::sync::Arc;

use crate::controllers::{action, current_user};
use crate::pipeline::{ActionResult, Context, HandlerResult, ParamKind, ParamSpec};
use crate::render::escape_html;
use crate::routing::{RouteError, RouteTableBuilder};
use crate::services::{Mailer, Suggestion, SuggestionService};

pub struct SuggestionController {
    suggestions: Arc<dyn SuggestionService>,
    mailer: Arc<dyn Mailer>,
    /// Empty disables notification mail.
    admin_address: String,
}

impl SuggestionController {
    pub fn new(
        suggestions: Arc<dyn SuggestionService>,
        mailer: Arc<dyn Mailer>,
        admin_address: impl Into<String>,
    ) -> Self {
        Self {
            suggestions,
            mailer,
            admin_address: admin_address.into(),
        }
    }

    pub fn register(self, routes: RouteTableBuilder) -> Result<RouteTableBuilder, RouteError> {
        let this = Arc::new(self);
        routes.post(
            "/suggestion/addSuggestion",
            action("Suggestion.AddSuggestion", &this, Self::add_suggestion)
                .with_params(&[ParamSpec::required("suggestion", ParamKind::Str)]),
        )
    }

    fn add_suggestion(&self, ctx: &mut Context) -> HandlerResult {
        let user = current_user(ctx)?;
        let text = ctx.params().string("suggestion").trim().to_string();
        if text.is_empty() {
            return Ok(ActionResult::envelope(false, ctx.message("suggestion.empty", &[])));
        }

        let addr = ctx
            .header("x-forwarded-for")
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_string())
            .unwrap_or_default();
        let stored = self.suggestions.add(Suggestion {
            id: String::new(),
            user_id: user.clone(),
            addr,
            text: text.clone(),
        });

        if stored && !self.admin_address.is_empty() {
            let body = format!(
                "<p>{}</p><p>{}</p>",
                escape_html(&user),
                escape_html(&text)
            );
            if let Err(e) = self.mailer.send(&self.admin_address, "New suggestion", &body) {
                tracing::warn!(error = %e, "Failed to send suggestion notification");
            }
        }

        let msg = if stored {
            ctx.message("suggestion.thanks", &[])
        } else {
            String::new()
        };
        Ok(ActionResult::envelope(stored, msg))
    }
}
