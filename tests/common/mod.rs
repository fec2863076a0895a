#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use tower_http::normalize_path::NormalizePath;

use planner_api::config::AppConfig;
use planner_api::state::{memory_store, AppState};

pub const TEST_SECRET: &str = "integration-test-secret";

/// Development defaults with a fixed secret and a cheap bcrypt cost
pub fn test_config(revocation: bool) -> AppConfig {
    let mut config = AppConfig::from_lookup(|_| None);
    config.security.jwt_secret = TEST_SECRET.to_string();
    config.security.bcrypt_cost = 4;
    config.security.enable_token_revocation = revocation;
    config
}

/// The application service as served by the binary
pub type App = NormalizePath<Router>;

/// App over a fresh in-memory store, plus the state so tests can reach the store
pub fn test_app_with(config: &AppConfig) -> (App, AppState) {
    let state = AppState::new(config, memory_store()).expect("test config is valid");
    (planner_api::app(state.clone(), config), state)
}

pub fn test_app() -> App {
    test_app_with(&test_config(false)).0
}

/// Drive one request through the router and decode the JSON body
pub async fn send(
    app: &App,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    send_request(app, request).await
}

pub async fn send_request(app: &App, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, value)
}

pub async fn register(app: &App, username: &str, password: &str) -> Value {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/users/register",
        None,
        Some(json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": password
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
    body["data"]["user"].clone()
}

/// Logged-in account: (user id, access token, refresh token)
pub struct Session {
    pub user_id: String,
    pub access: String,
    pub refresh: String,
}

pub async fn register_and_login(app: &App, username: &str) -> Session {
    register(app, username, "pw1").await;

    let (status, body) = send(
        app,
        Method::POST,
        "/api/users/login",
        None,
        Some(json!({ "username": username, "password": "pw1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {}", body);

    Session {
        user_id: body["data"]["user"]["id"].as_str().unwrap().to_string(),
        access: body["data"]["access"].as_str().unwrap().to_string(),
        refresh: body["data"]["refresh"].as_str().unwrap().to_string(),
    }
}

/// The real binary on a free port, backed by the in-memory store. Killed on drop.
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    pub async fn start() -> Result<Self> {
        let server = Self::spawn()?;
        server.wait_ready(Duration::from_secs(10)).await?;
        Ok(server)
    }

    fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let child = Command::new(env!("CARGO_BIN_EXE_planner-api"))
            .args(["--host", "127.0.0.1", "--store", "memory"])
            .env("APP_ENV", "development")
            .env("PLANNER_API_PORT", port.to_string())
            .env("JWT_SECRET", TEST_SECRET)
            .env("SECURITY_BCRYPT_COST", "4")
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .context("failed to spawn server binary")?;

        Ok(Self { port, base_url, child })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        let url = format!("{}/health", self.base_url);
        while Instant::now() < deadline {
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == reqwest::StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
