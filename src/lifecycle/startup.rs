//! Startup orchestration.
//!
//! # Responsibilities
//! - Validate configuration
//! - Build every collaborator in a fixed order:
//!   secret → message catalog → templates → services → routes →
//!   interceptors → pipeline
//! - Return one immutable [`AppContext`]
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - No global state; everything hangs off the returned context

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::config::{validate_config, AppConfig, ConfigError};
use crate::controllers::{build_interceptors, build_routes, Services};
use crate::i18n::{CatalogError, Locale, LocaleResolver, MessageCatalog};
use crate::pipeline::{CompressionEncoder, Pipeline};
use crate::render::TemplateSet;
use crate::routing::RouteError;
use crate::services::{InMemoryAlbums, InMemoryAuth, InMemorySuggestions, LogMailer};
use crate::session::{CookieSigner, FlashCodec, SessionCodec};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("message catalog: {0}")]
    Catalog(#[from] CatalogError),

    #[error("route table: {0}")]
    Routes(#[from] RouteError),
}

/// Everything the server needs, assembled once.
pub struct AppContext {
    pub config: AppConfig,
    pub pipeline: Arc<Pipeline>,
    pub services: Services,
}

/// In-memory collaborators seeded from configuration.
pub fn default_services(config: &AppConfig) -> Services {
    Services {
        albums: Arc::new(InMemoryAlbums::new()),
        suggestions: Arc::new(InMemorySuggestions::new()),
        auth: Arc::new(InMemoryAuth::from_config(&config.auth.users)),
        mailer: Arc::new(LogMailer::new(&config.email.from)),
        admin_address: config.email.admin_address.clone(),
    }
}

/// Assemble the application with the default in-memory collaborators.
pub fn assemble(config: AppConfig) -> Result<AppContext, StartupError> {
    let services = default_services(&config);
    assemble_with(config, services)
}

/// Assemble the application around the given collaborators.
pub fn assemble_with(config: AppConfig, services: Services) -> Result<AppContext, StartupError> {
    validate_config(&config).map_err(ConfigError::Validation)?;

    let signer = if config.session.secret.is_empty() {
        tracing::warn!("session.secret is empty, using a random key; sessions will not survive a restart");
        CookieSigner::random()
    } else {
        CookieSigner::new(config.session.secret.as_bytes())
    };

    let default_locale = Locale::new(&config.i18n.default_locale);
    let mut catalog = MessageCatalog::with_builtin(default_locale);
    if let Some(dir) = &config.i18n.messages_dir {
        let loaded = catalog.load_dir(Path::new(dir))?;
        tracing::info!(dir = %dir, messages = loaded, "Loaded message files");
    }
    let messages = Arc::new(catalog);

    let templates = Arc::new(TemplateSet::builtin());

    let routes = build_routes(&services)?;
    tracing::info!(routes = routes.len(), "Route table built");

    let interceptors = build_interceptors(&config.security);

    let secure = config.session.secure;
    let pipeline = Pipeline::builder(routes)
        .sessions(SessionCodec::new(
            signer.clone(),
            &config.session.cookie_name,
            config.session.max_age_secs,
            secure,
        ))
        .flash(FlashCodec::new(signer, &config.flash.cookie_name, secure))
        .locales(LocaleResolver::from_config(&config.i18n))
        .messages(messages)
        .templates(templates)
        .interceptors(interceptors)
        .compression(CompressionEncoder::from_config(&config.compression))
        .handler_timeout(Duration::from_millis(config.timeouts.handler_ms))
        .secure_cookies(secure)
        .build();

    Ok(AppContext {
        config,
        pipeline: Arc::new(pipeline),
        services,
    })
}
