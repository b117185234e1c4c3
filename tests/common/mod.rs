#![allow(dead_code)]

use std::{net::TcpListener, thread};

use axum::Router;
use base64::engine::{general_purpose::STANDARD as BASE64, Engine};
use firma_json::{Config, ConfigSource};
use serde_json::json;

pub const SECRET: &str = "27a216342c744f89b7b82fa290519ba0";
pub const API_KEY: &str = "sandbox";
pub const SIGN_PATH: &str = "/firma/v2/files/tickets";

/// Serves `router` on an ephemeral local port from a background runtime and
/// returns the signing endpoint URL.
pub fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.set_nonblocking(true).unwrap();
    let addr = listener.local_addr().unwrap();

    thread::spawn(move || {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async move {
            let listener = tokio::net::TcpListener::from_std(listener).unwrap();
            axum::serve(listener, router).await.unwrap();
        });
    });

    format!("http://{addr}{SIGN_PATH}")
}

/// An endpoint nothing listens on.
pub fn closed_endpoint() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}{SIGN_PATH}")
}

pub fn config(endpoint: &str) -> Config {
    ConfigSource {
        entity: Some("Subsecretaría General de la Presidencia".into()),
        secret_key: Some(SECRET.into()),
        run: Some("22222222".into()),
        purpose: Some("Desatendido".into()),
        api_token_key: Some(API_KEY.into()),
        endpoint: Some(endpoint.into()),
        timeout_secs: Some(5),
    }
    .validate()
    .unwrap()
}

/// Base64 of the `{"jws": ...}` envelope the service returns per file.
pub fn envelope(jws: &str) -> String {
    BASE64.encode(serde_json::to_vec(&json!({ "jws": jws })).unwrap())
}
