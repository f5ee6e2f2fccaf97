#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use sleepsync_server::{app_router, AppState, ServerConfig};
use tower::ServiceExt;

/// Config for `role` with both stores under `dir`; `extra` overrides any variable.
pub fn config(role: &str, dir: &Path, extra: &[(&str, String)]) -> ServerConfig {
    let mut vars: HashMap<String, String> = HashMap::new();
    vars.insert("SLEEPSYNC_SERVICE".into(), role.into());
    vars.insert(
        "SLEEPSYNC_PRIMARY_DB".into(),
        dir.join(format!("{}-primary.db", role)).to_string_lossy().into(),
    );
    vars.insert(
        "SLEEPSYNC_FALLBACK_DB".into(),
        dir.join(format!("{}-fallback.db", role)).to_string_lossy().into(),
    );
    for (name, value) in extra {
        vars.insert(name.to_string(), value.clone());
    }
    ServerConfig::from_lookup(|name| vars.get(name).cloned()).expect("valid config")
}

pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let bytes = body
        .map(|json| serde_json::to_vec(&json).unwrap())
        .unwrap_or_default();
    send_raw(app, method, uri, bytes).await
}

/// Sends `body` verbatim as `application/json`; a non-JSON response reads as `Null`.
pub async fn send_raw(
    app: &Router,
    method: Method,
    uri: &str,
    body: impl Into<Body>,
) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

/// Serves `state` on an ephemeral loopback port and returns its base URL.
pub async fn serve(state: Arc<AppState>) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = app_router(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}
