//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::http::{header, Request, Response};

use notebook_server::config::AppConfig;
use notebook_server::controllers::Services;
use notebook_server::lifecycle::{assemble_with, AppContext};
use notebook_server::pipeline::{Outcome, Pipeline, RawRequest};
use notebook_server::services::{InMemoryAlbums, InMemoryAuth, InMemorySuggestions, LogMailer};

pub const TEST_SECRET: &str = "integration-test-secret-0123456789abcdef";
pub const ADMIN_ADDRESS: &str = "owner@notebook.test";

/// An assembled app plus handles on its in-memory collaborators.
pub struct TestApp {
    pub app: AppContext,
    pub albums: Arc<InMemoryAlbums>,
    pub suggestions: Arc<InMemorySuggestions>,
    pub mailer: Arc<LogMailer>,
}

impl TestApp {
    pub fn pipeline(&self) -> Arc<Pipeline> {
        Arc::clone(&self.app.pipeline)
    }

    pub fn browser(&self) -> Browser {
        Browser::new(self.pipeline())
    }
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.session.secret = TEST_SECRET.to_string();
    config.email.admin_address = ADMIN_ADDRESS.to_string();
    config
}

pub fn app() -> TestApp {
    app_with(test_config())
}

pub fn app_with(config: AppConfig) -> TestApp {
    let albums = Arc::new(InMemoryAlbums::new());
    let suggestions = Arc::new(InMemorySuggestions::new());
    let mailer = Arc::new(LogMailer::new(&config.email.from));
    let services = Services {
        albums: albums.clone(),
        suggestions: suggestions.clone(),
        auth: Arc::new(InMemoryAuth::from_config(&config.auth.users)),
        mailer: mailer.clone(),
        admin_address: config.email.admin_address.clone(),
    };
    let app = assemble_with(config, services).expect("test app assembles");
    TestApp {
        app,
        albums,
        suggestions,
        mailer,
    }
}

pub fn get(path: &str) -> axum::http::request::Builder {
    Request::builder().method("GET").uri(path)
}

pub fn form(path: &str, fields: &[(&str, &str)]) -> RawRequest {
    let body = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(fields)
        .finish();
    Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Bytes::from(body))
        .unwrap()
}

pub fn xhr_form(path: &str, fields: &[(&str, &str)]) -> RawRequest {
    let mut request = form(path, fields);
    request
        .headers_mut()
        .insert("x-requested-with", "XMLHttpRequest".parse().unwrap());
    request
}

pub fn xhr_get(path: &str) -> RawRequest {
    get(path)
        .header("x-requested-with", "XMLHttpRequest")
        .body(Bytes::new())
        .unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Bytes {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
}

pub async fn body_string(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await.to_vec()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Every `Set-Cookie` value on a response.
pub fn set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

pub fn set_cookie_named(response: &Response<Body>, name: &str) -> Option<String> {
    set_cookies(response)
        .into_iter()
        .find(|c| c.starts_with(&format!("{name}=")))
}

pub fn location(response: &Response<Body>) -> Option<&str> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
}

/// Drives the pipeline like a browser: replays cookies across requests.
pub struct Browser {
    pipeline: Arc<Pipeline>,
    cookies: BTreeMap<String, String>,
}

impl Browser {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self {
            pipeline,
            cookies: BTreeMap::new(),
        }
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn set_cookie(&mut self, name: &str, value: &str) {
        self.cookies.insert(name.to_string(), value.to_string());
    }

    pub async fn send(&mut self, mut request: RawRequest) -> Outcome {
        if !self.cookies.is_empty() {
            let header_value = self
                .cookies
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("; ");
            request
                .headers_mut()
                .insert(header::COOKIE, header_value.parse().unwrap());
        }

        let outcome = self.pipeline.execute(request).await;
        for raw in set_cookies(&outcome.response) {
            let pair = raw.split(';').next().unwrap_or_default();
            let Some((name, value)) = pair.split_once('=') else {
                continue;
            };
            if raw.contains("Max-Age=0") {
                self.cookies.remove(name);
            } else {
                self.cookies.insert(name.to_string(), value.to_string());
            }
        }
        outcome
    }

    pub async fn get(&mut self, path: &str) -> Outcome {
        self.send(get(path).body(Bytes::new()).unwrap()).await
    }

    /// Sign in with the development account.
    pub async fn login(&mut self) {
        let outcome = self
            .send(form("/doLogin", &[("email", "admin"), ("pwd", "abc123")]))
            .await;
        assert_eq!(location(&outcome.response), Some("/album/index"));
    }
}
