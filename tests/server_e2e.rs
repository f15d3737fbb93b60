//! The server over real sockets.

use std::net::SocketAddr;
use std::time::Duration;

use reqwest::{header, redirect, StatusCode};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use notebook_server::http::HttpServer;
use notebook_server::lifecycle::Shutdown;

mod common;

struct Running {
    addr: SocketAddr,
    shutdown: Shutdown,
    task: JoinHandle<Result<(), std::io::Error>>,
}

async fn start() -> Running {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(common::app().app);
    let shutdown = Shutdown::new();
    let signal = shutdown.subscribe();
    let task = tokio::spawn(server.run(listener, signal));
    Running { addr, shutdown, task }
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(redirect::Policy::none())
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

fn cookie_pair(response: &reqwest::Response, name: &str) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(&format!("{name}=")))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

#[tokio::test]
async fn test_root_redirects_with_request_id() {
    let server = start().await;
    let response = client()
        .get(format!("http://{}/", server.addr))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers()[header::LOCATION], "/album/index");
    assert!(response.headers().contains_key("x-request-id"));
    assert!(response.headers().contains_key(header::SERVER));
    server.shutdown.trigger();
}

#[tokio::test]
async fn test_login_then_list_albums() {
    let server = start().await;
    let base = format!("http://{}", server.addr);
    let client = client();

    let login = client
        .post(format!("{base}/doLogin"))
        .form(&[("email", "admin"), ("pwd", "abc123")])
        .send()
        .await
        .unwrap();
    assert_eq!(login.status(), StatusCode::FOUND);
    let session = cookie_pair(&login, "NOTEBOOK_SESSION").unwrap();

    let anonymous = client
        .get(format!("{base}/album/getAlbums"))
        .header("x-requested-with", "XMLHttpRequest")
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = anonymous.json().await.unwrap();
    assert_eq!(body["msg"], "NOTLOGIN");

    let albums = client
        .get(format!("{base}/album/getAlbums"))
        .header(header::COOKIE, session)
        .send()
        .await
        .unwrap();
    assert_eq!(albums.status(), StatusCode::OK);
    assert_eq!(albums.headers()["x-content-type-options"], "nosniff");
    let body: serde_json::Value = albums.json().await.unwrap();
    assert_eq!(body, serde_json::json!([]));
    server.shutdown.trigger();
}

#[tokio::test]
async fn test_unknown_path_is_404() {
    let server = start().await;
    let response = client()
        .get(format!("http://{}/missing", server.addr))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(response.text().await.unwrap().contains("404"));
    server.shutdown.trigger();
}

#[tokio::test]
async fn test_graceful_shutdown_stops_server() {
    let server = start().await;
    server.shutdown.trigger();
    let result = tokio::time::timeout(Duration::from_secs(5), server.task)
        .await
        .expect("server stops after shutdown")
        .unwrap();
    assert!(result.is_ok());
}
