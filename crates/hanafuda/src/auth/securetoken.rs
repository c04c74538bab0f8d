//! Refresh-token exchange against the Google securetoken endpoint.
//!
//! The identity provider trades the long-lived refresh token for a short-lived
//! access token:
//!
//! `POST {token_url}?key={api_key}` with `{"grant_type":"refresh_token","refresh_token":…}`
//!
//! Error responses carry a JSON envelope of the form
//! `{"error":{"code":400,"message":"INVALID_REFRESH_TOKEN","status":"INVALID_ARGUMENT"}}`.

use std::fmt;

use reqwest::{Client, header};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Default identity-provider token endpoint.
pub const TOKEN_URL: &str = "https://securetoken.googleapis.com/v1/token";

const UNKNOWN_ERROR: &str = "Unknown error";

#[derive(Debug, Error)]
pub enum TokenRefreshError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Failed to refresh access token (HTTP {status}): {message}")]
    Api {
        status: u16,
        code: Option<i64>,
        message: String,
    },
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    grant_type: &'static str,
    refresh_token: &'a str,
}

/// Result of a successful token refresh.
#[derive(Clone)]
pub struct RefreshedTokens {
    /// New access token, presented as a bearer token on backend calls.
    pub access_token: String,
    /// Refresh token echoed back by the provider (may be rotated).
    pub refresh_token: Option<String>,
    /// Access token validity in seconds.
    pub expires_in: Option<u64>,
    pub user_id: Option<String>,
}

impl fmt::Debug for RefreshedTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshedTokens")
            .field("access_token", &"<redacted>")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .field("expires_in", &self.expires_in)
            .field("user_id", &self.user_id)
            .finish()
    }
}

/// Extract `(code, message)` from the provider's error envelope.
///
/// Falls back to `"Unknown error"` when the body has no usable `error` field.
pub fn extract_error(body: Option<&Value>) -> (Option<i64>, String) {
    match body.and_then(|b| b.get("error")) {
        Some(Value::Object(error)) => {
            let code = error.get("code").and_then(|c| c.as_i64());
            let message = error
                .get("message")
                .and_then(|m| m.as_str())
                .map(String::from)
                .unwrap_or_else(|| Value::Object(error.clone()).to_string());
            (code, message)
        }
        Some(Value::String(message)) => (None, message.clone()),
        Some(Value::Null) | None => (None, UNKNOWN_ERROR.to_string()),
        Some(other) => (None, other.to_string()),
    }
}

/// Exchange `refresh_token` for a fresh access token.
///
/// No retry is attempted here; callers decide what a failure means.
pub async fn refresh_token(
    client: &Client,
    token_url: &str,
    api_key: &str,
    refresh_token: &str,
) -> Result<RefreshedTokens, TokenRefreshError> {
    let response = client
        .post(token_url)
        .query(&[("key", api_key)])
        .header(header::CONTENT_TYPE, "application/json")
        .json(&RefreshRequest {
            grant_type: "refresh_token",
            refresh_token,
        })
        .send()
        .await?;

    let status = response.status();
    let text = response.text().await?;
    let body: Option<Value> = serde_json::from_str(&text).ok();

    if !status.is_success() {
        let (code, message) = extract_error(body.as_ref());
        tracing::debug!(status = status.as_u16(), ?code, %message, "Token refresh rejected");
        return Err(TokenRefreshError::Api {
            status: status.as_u16(),
            code,
            message,
        });
    }

    let body = body.ok_or_else(|| {
        TokenRefreshError::Parse("Token response is not valid JSON".to_string())
    })?;

    let access_token = body
        .get("access_token")
        .and_then(|t| t.as_str())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| TokenRefreshError::Parse("No access_token in response".to_string()))?
        .to_string();

    let refresh_token = body
        .get("refresh_token")
        .and_then(|t| t.as_str())
        .map(String::from);

    // securetoken reports expires_in as a string ("3600"); accept numbers too.
    let expires_in = body.get("expires_in").and_then(|e| match e {
        Value::String(s) => s.parse().ok(),
        other => other.as_u64(),
    });

    let user_id = body
        .get("user_id")
        .and_then(|u| u.as_str())
        .map(String::from);

    tracing::debug!(?expires_in, ?user_id, "Token refresh successful");

    Ok(RefreshedTokens {
        access_token,
        refresh_token,
        expires_in,
        user_id,
    })
}
