//! Mock identity provider and backend shared by the integration tests.

#![allow(dead_code)]

use std::num::NonZeroU32;
use std::time::Duration;

use hanagrow::config::{AppConfig, RawConfig};
use serde_json::{Value, json};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TOKEN_PATH: &str = "/v1/token";
pub const GRAPHQL_PATH: &str = "/graphql";

pub fn user_body(name: &str, points: i64) -> Value {
    json!({"data": {"currentUser": {"name": name, "totalPoint": points}}})
}

pub fn token_body(access_token: &str) -> Value {
    json!({
        "access_token": access_token,
        "expires_in": "3600",
        "token_type": "Bearer",
        "refresh_token": "refresh",
    })
}

/// Identity provider that hands out the given tokens in order, repeating the last one.
pub async fn token_server(tokens: &[&str]) -> MockServer {
    let server = MockServer::start().await;
    let (last, first) = tokens.split_last().expect("at least one token");
    for (i, token) in first.iter().enumerate() {
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body(token)))
            .up_to_n_times(1)
            .with_priority(i as u8 + 1)
            .mount(&server)
            .await;
    }
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body(last)))
        .with_priority(100)
        .mount(&server)
        .await;
    server
}

/// Backend that answers every operation successfully.
///
/// Specific failures can be layered on top with a lower priority number.
pub async fn healthy_backend() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .and(body_string_contains("currentUser"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_body("alice", 4200)))
        .with_priority(50)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"ok": true}})))
        .with_priority(100)
        .mount(&server)
        .await;
    server
}

/// Reject `CurrentUser` with 401 while `token` is presented.
pub async fn reject_current_user_for(server: &MockServer, token: &str) {
    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .and(header("authorization", format!("Bearer {token}").as_str()))
        .and(body_string_contains("currentUser"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Unauthorized"})))
        .with_priority(1)
        .mount(server)
        .await;
}

pub fn graphql_url(server: &MockServer) -> String {
    format!("{}{GRAPHQL_PATH}", server.uri())
}

pub fn token_url(server: &MockServer) -> String {
    format!("{}{TOKEN_PATH}", server.uri())
}

pub fn app_config(backend: &MockServer, identity: &MockServer, iterations: u32) -> AppConfig {
    let raw = RawConfig {
        refresh_token: Some("refresh".to_string()),
        api_key: Some("api-key".to_string()),
        proxy: None,
        graphql_url: graphql_url(backend),
        token_url: token_url(identity),
        request_timeout: Duration::from_secs(5),
        call_delay: Duration::ZERO,
        batch_delay: Duration::from_secs(3600),
        max_auth_restarts: 5,
    };
    AppConfig::resolve(raw, || Ok(NonZeroU32::new(iterations).unwrap())).unwrap()
}

/// Requests received on `path_`.
pub async fn requests_to(server: &MockServer, path_: &str) -> Vec<wiremock::Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.url.path() == path_)
        .collect()
}
