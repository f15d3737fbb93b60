//! Notebook web application server.
//!
//! A small photo-album notebook served through a fixed request pipeline:
//! routing, parameter binding, signed session and flash cookies, locale
//! negotiation, interceptors, action invocation and response compression.

// Request processing
pub mod http;
pub mod pipeline;
pub mod routing;
pub mod session;

// Application
pub mod controllers;
pub mod i18n;
pub mod render;
pub mod services;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::AppConfig;
pub use http::HttpServer;
pub use lifecycle::{assemble, AppContext, Shutdown};
pub use pipeline::Pipeline;
