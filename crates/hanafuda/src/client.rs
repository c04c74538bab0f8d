//! HTTP client construction shared by the identity-provider and GraphQL calls.

use std::{sync::OnceLock, time::Duration};

use reqwest::{Client, Proxy};
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/142.0.0.0 Safari/537.36";

/// Request timeout applied when the caller does not pick one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ClientBuildError {
    #[error("invalid proxy URL `{url}`: {reason}")]
    InvalidProxy { url: String, reason: String },
    #[error("failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

/// Options for [`create_client`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Proxy URL applied to every scheme (`http://`, `https://` or `socks5://`).
    pub proxy: Option<String>,
    /// Whole-request timeout. `Duration::ZERO` disables it.
    pub timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            proxy: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

pub fn install_rustls_provider() {
    static PROVIDER_INSTALLED: OnceLock<()> = OnceLock::new();
    PROVIDER_INSTALLED.get_or_init(|| {
        if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
            // Can happen if another crate installed it first.
            debug!(existing_provider = ?e, "rustls CryptoProvider already installed");
        }
    });
}

/// Build a proxy that routes both HTTP and HTTPS traffic through `url`.
///
/// Bare `host:port` values are treated as HTTP proxies.
pub fn build_proxy(url: &str) -> Result<Proxy, ClientBuildError> {
    let url = url.trim();
    let normalized = if url.contains("://") {
        url.to_string()
    } else {
        format!("http://{url}")
    };

    Proxy::all(&normalized).map_err(|e| ClientBuildError::InvalidProxy {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

/// Create the `reqwest::Client` used for one session.
///
/// Unlike reqwest's defaults, an explicit proxy replaces any system/env proxy,
/// and no proxy at all is used when none is configured.
pub fn create_client(options: &ClientOptions) -> Result<Client, ClientBuildError> {
    install_rustls_provider();

    let mut builder = Client::builder().user_agent(DEFAULT_UA);

    if options.timeout > Duration::ZERO {
        builder = builder.timeout(options.timeout);
    }

    builder = match options.proxy.as_deref() {
        Some(url) => builder.proxy(build_proxy(url)?),
        None => builder.no_proxy(),
    };

    Ok(builder.build()?)
}
