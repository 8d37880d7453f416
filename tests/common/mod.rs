//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tokio::net::TcpListener;
use tower::ServiceExt;

use route_gate::config::{parse_config, GatewayConfig};
use route_gate::lifecycle::{Gateway, Shutdown};

/// The sample policy shipped with the binary.
pub const SAMPLE_CONFIG: &str = include_str!("../../route-gate.toml");

pub fn sample_config() -> GatewayConfig {
    parse_config(SAMPLE_CONFIG).unwrap()
}

/// The catalog app behind `config`'s policy, without server layers.
pub fn catalog(config: GatewayConfig) -> Router {
    Gateway::from_config(config).unwrap().app()
}

/// Send one request through `app` and decode the JSON response.
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, body)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

/// Serve `config` on an ephemeral port. Trigger the returned handle to stop.
pub async fn spawn_server(mut config: GatewayConfig) -> (SocketAddr, Shutdown) {
    config.listener.bind_address = "127.0.0.1:0".to_string();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let gateway = Gateway::from_config(config).unwrap();
    let shutdown = Shutdown::new();
    let handle = shutdown.clone();
    tokio::spawn(async move {
        gateway.serve(listener, &handle).await.unwrap();
    });

    (addr, shutdown)
}
