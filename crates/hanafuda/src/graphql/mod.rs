//! GraphQL transport for the hanafuda backend.
//!
//! Every call is a single `POST {query, variables}` with a bearer token. The
//! backend signals an expired token two different ways depending on the call:
//! a transport-level `401`, or a `200` whose payload carries
//! `errors[0].message` containing `UNAUTHORIZED`. [`classify`] folds both into
//! [`CallResult::AuthExpired`].

pub mod operations;

use reqwest::{Client, StatusCode, header};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, trace};

pub use operations::{CurrentUser, Operation};

/// Default backend endpoint.
pub const GRAPHQL_URL: &str =
    "https://hanafuda-backend-app-520478841386.us-central1.run.app/graphql";

/// Marker the backend places in `errors[0].message` for an expired token.
pub const UNAUTHORIZED_MARKER: &str = "UNAUTHORIZED";

/// Transport failures. Anything that produced an HTTP response is a [`CallResult`] instead.
#[derive(Debug, Error)]
pub enum GraphQlError {
    #[error("GraphQL request failed: {0}")]
    Network(#[from] reqwest::Error),
}

/// JSON body of a GraphQL call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphQlRequest {
    pub query: &'static str,
    pub variables: Option<Value>,
}

/// Why a call that reached the backend did not succeed.
#[derive(Debug, Clone, PartialEq)]
pub enum CallFailure {
    /// Non-200/401 status with a JSON body.
    Status { status: u16, body: Value },
    /// The response body was not JSON.
    Undecodable { status: u16, reason: String },
}

impl std::fmt::Display for CallFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Status { status, body } => write!(f, "HTTP {status}: {body}"),
            Self::Undecodable { status, reason } => {
                write!(f, "HTTP {status}: undecodable body ({reason})")
            }
        }
    }
}

/// Outcome of one remote call.
#[derive(Debug, Clone, PartialEq)]
pub enum CallResult {
    Success(Value),
    AuthExpired,
    OtherError(CallFailure),
}

/// Whether a decoded payload reports an expired token in `errors[0].message`.
pub fn is_unauthorized(body: &Value) -> bool {
    body.get("errors")
        .and_then(|e| e.as_array())
        .and_then(|errors| errors.first())
        .and_then(|first| first.get("message"))
        .and_then(|m| m.as_str())
        .is_some_and(|message| message.contains(UNAUTHORIZED_MARKER))
}

/// Classify a backend response.
///
/// - `401` is always [`CallResult::AuthExpired`], whatever the body says.
/// - Any other non-200 status is [`CallResult::OtherError`].
/// - A `200` is [`CallResult::AuthExpired`] when the payload carries the
///   unauthorized marker, otherwise [`CallResult::Success`].
pub fn classify(status: StatusCode, body: &[u8]) -> CallResult {
    if status == StatusCode::UNAUTHORIZED {
        return CallResult::AuthExpired;
    }

    let decoded = match serde_json::from_slice::<Value>(body) {
        Ok(value) => value,
        Err(e) => {
            return CallResult::OtherError(CallFailure::Undecodable {
                status: status.as_u16(),
                reason: e.to_string(),
            });
        }
    };

    if status != StatusCode::OK {
        return CallResult::OtherError(CallFailure::Status {
            status: status.as_u16(),
            body: decoded,
        });
    }

    if is_unauthorized(&decoded) {
        return CallResult::AuthExpired;
    }

    CallResult::Success(decoded)
}

/// Send one request and classify the response. No retry is attempted.
pub async fn execute(
    client: &Client,
    url: &str,
    access_token: &str,
    request: &GraphQlRequest,
) -> Result<CallResult, GraphQlError> {
    let response = client
        .post(url)
        .bearer_auth(access_token)
        .header(header::CONTENT_TYPE, "application/json")
        .json(request)
        .send()
        .await?;

    let status = response.status();
    let body = response.bytes().await?;
    trace!(status = status.as_u16(), len = body.len(), "GraphQL response received");

    let result = classify(status, &body);
    if let CallResult::OtherError(failure) = &result {
        debug!(%failure, "GraphQL call failed");
    }
    Ok(result)
}
