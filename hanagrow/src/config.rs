//! Startup configuration.
//!
//! Everything here is resolved once before the run loop starts and is
//! immutable afterwards.

use std::fmt;
use std::num::NonZeroU32;
use std::time::Duration;

use tracing::warn;
use url::Url;

use crate::credentials::RefreshToken;
use crate::error::{Error, Result};
use crate::session::SessionOptions;

/// Pause between iterations.
pub const DEFAULT_CALL_DELAY: Duration = Duration::from_secs(1);

/// Pause between batches.
pub const DEFAULT_BATCH_DELAY: Duration = Duration::from_secs(3600);

/// Per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Token refreshes allowed within a single iteration before the run is failed.
pub const DEFAULT_MAX_AUTH_RESTARTS: u32 = 5;

/// Parse the operator-supplied iteration count.
///
/// Only positive integers are accepted; zero, negatives and anything
/// non-numeric are configuration errors.
pub fn parse_iteration_count(input: &str) -> Result<NonZeroU32> {
    let trimmed = input.trim();
    let value: i64 = trimmed
        .parse()
        .map_err(|_| Error::validation(format!("`{trimmed}` is not an integer")))?;

    if value <= 0 {
        return Err(Error::validation(
            "The number of iterations must be a positive integer.",
        ));
    }

    u32::try_from(value)
        .ok()
        .and_then(NonZeroU32::new)
        .ok_or_else(|| Error::validation(format!("{value} iterations is too many")))
}

/// Shape of one batch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    pub iteration_count: NonZeroU32,
    /// Sleep after each iteration.
    pub call_delay: Duration,
    /// Sleep after the last iteration of a batch.
    pub batch_delay: Duration,
    /// Refreshes tolerated inside one iteration before giving up on the run.
    pub max_auth_restarts: u32,
}

impl BatchConfig {
    pub fn new(iteration_count: NonZeroU32) -> Self {
        Self {
            iteration_count,
            call_delay: DEFAULT_CALL_DELAY,
            batch_delay: DEFAULT_BATCH_DELAY,
            max_auth_restarts: DEFAULT_MAX_AUTH_RESTARTS,
        }
    }

    pub fn with_delays(mut self, call_delay: Duration, batch_delay: Duration) -> Self {
        self.call_delay = call_delay;
        self.batch_delay = batch_delay;
        self
    }

    pub fn with_max_auth_restarts(mut self, max_auth_restarts: u32) -> Self {
        self.max_auth_restarts = max_auth_restarts;
        self
    }
}

/// Fully resolved application configuration.
#[derive(Clone)]
pub struct AppConfig {
    pub refresh_token: RefreshToken,
    pub api_key: String,
    pub proxy: Option<String>,
    pub graphql_url: String,
    pub token_url: String,
    pub request_timeout: Duration,
    pub batch: BatchConfig,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("refresh_token", &self.refresh_token)
            .field("api_key", &"<redacted>")
            .field("proxy", &self.proxy)
            .field("graphql_url", &self.graphql_url)
            .field("token_url", &self.token_url)
            .field("request_timeout", &self.request_timeout)
            .field("batch", &self.batch)
            .finish()
    }
}

/// Raw, unvalidated configuration values as collected from CLI/env.
#[derive(Debug, Clone, Default)]
pub struct RawConfig {
    pub refresh_token: Option<String>,
    pub api_key: Option<String>,
    pub proxy: Option<String>,
    pub graphql_url: String,
    pub token_url: String,
    pub request_timeout: Duration,
    pub call_delay: Duration,
    pub batch_delay: Duration,
    pub max_auth_restarts: u32,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate_url(name: &str, value: &str) -> Result<String> {
    let url = Url::parse(value).map_err(|e| Error::config(format!("invalid {name} `{value}`: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(value.to_string()),
        other => Err(Error::config(format!(
            "invalid {name} `{value}`: unsupported scheme `{other}`"
        ))),
    }
}

impl AppConfig {
    /// Validate raw values into an [`AppConfig`].
    ///
    /// The refresh token is checked first; `iteration_count` is only asked for
    /// once it is known to be present.
    pub fn resolve(
        raw: RawConfig,
        iteration_count: impl FnOnce() -> Result<NonZeroU32>,
    ) -> Result<Self> {
        let refresh_token = non_empty(raw.refresh_token)
            .ok_or_else(|| Error::config("Refresh token not found in environment variables."))?;

        let api_key = non_empty(raw.api_key).unwrap_or_else(|| {
            warn!("API_KEY is not set; token refreshes will be rejected by the identity provider");
            String::new()
        });

        let batch = BatchConfig::new(iteration_count()?)
            .with_delays(raw.call_delay, raw.batch_delay)
            .with_max_auth_restarts(raw.max_auth_restarts);

        Ok(Self {
            refresh_token: RefreshToken::new(refresh_token),
            api_key,
            proxy: non_empty(raw.proxy),
            graphql_url: validate_url("GraphQL URL", &raw.graphql_url)?,
            token_url: validate_url("token URL", &raw.token_url)?,
            request_timeout: raw.request_timeout,
            batch,
        })
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            endpoint: self.graphql_url.clone(),
            proxy: self.proxy.clone(),
            request_timeout: self.request_timeout,
        }
    }
}
