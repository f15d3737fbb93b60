//! HTTP server setup.
//!
//! # Responsibilities
//! - Create the Axum router with a catch-all dispatch route
//! - Wire up middleware (tracing, request ID, timeout, body limit)
//! - Buffer the request body and hand it to the pipeline
//! - Serve with graceful shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, HeaderValue, Request, StatusCode},
    response::Response,
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::http::request::x_request_id;
use crate::http::response::error_page;
use crate::lifecycle::AppContext;
use crate::pipeline::Pipeline;

const SERVER_NAME: &str = concat!("notebook-server/", env!("CARGO_PKG_VERSION"));

/// Application state injected into the dispatch handler.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub max_body_size: usize,
}

/// HTTP front end for the pipeline.
pub struct HttpServer {
    router: Router,
    config: AppConfig,
}

impl HttpServer {
    pub fn new(app: AppContext) -> Self {
        let state = AppState {
            pipeline: app.pipeline,
            max_body_size: app.config.security.max_body_size,
        };
        let router = Self::build_router(&app.config, state);
        Self {
            router,
            config: app.config,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &AppConfig, state: AppState) -> Router {
        let max_body = config.security.max_body_size;
        Router::new()
            .route("/{*path}", any(dispatch))
            .route("/", any(dispatch))
            .with_state(state)
            .layer(SetResponseHeaderLayer::if_not_present(
                header::SERVER,
                HeaderValue::from_static(SERVER_NAME),
            ))
            .layer(RequestBodyLimitLayer::new(max_body))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::new(x_request_id()))
            .layer(SetRequestIdLayer::new(x_request_id(), MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
    }

    /// A clone of the fully layered router.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Serve until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr: SocketAddr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Buffer the body and run the request through the pipeline.
async fn dispatch(State(state): State<AppState>, request: Request<Body>) -> Response {
    let (parts, body) = request.into_parts();
    let bytes: Bytes = match axum::body::to_bytes(body, state.max_body_size).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(path = %parts.uri.path(), error = %e, "Request body rejected");
            return error_page(StatusCode::PAYLOAD_TOO_LARGE).into_response();
        }
    };
    state.pipeline.run(Request::from_parts(parts, bytes)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::assemble;
    use tower::ServiceExt;

    fn server() -> HttpServer {
        HttpServer::new(assemble(AppConfig::default()).unwrap())
    }

    #[tokio::test]
    async fn test_request_id_is_echoed() {
        let response = server()
            .router()
            .oneshot(
                Request::builder()
                    .uri("/login")
                    .header("x-request-id", "req-42")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-request-id"], "req-42");
        assert_eq!(response.headers()[header::SERVER], SERVER_NAME);
    }

    #[tokio::test]
    async fn test_request_id_is_generated() {
        let response = server()
            .router()
            .oneshot(Request::builder().uri("/nowhere").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let mut config = AppConfig::default();
        config.security.max_body_size = 16;
        let server = HttpServer::new(assemble(config).unwrap());
        let response = server
            .router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/doLogin")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body(Body::from("email=admin&pwd=abc123&padding=xxxxxxxx"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
