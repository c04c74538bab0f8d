//! Google securetoken credential manager.
//!
//! Delegates the wire exchange to `hanafuda_api::auth` and maps its errors.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use hanafuda_api::auth::{TokenRefreshError, refresh_token as securetoken_refresh};
use reqwest::Client;
use tracing::{debug, instrument};

use crate::credentials::error::CredentialError;
use crate::credentials::manager::{CredentialManager, RefreshedCredentials};
use crate::credentials::types::{AccessToken, RefreshToken};

/// Provider messages that mean the refresh token itself is dead.
const RELOGIN_MESSAGES: &[&str] = &[
    "INVALID_REFRESH_TOKEN",
    "TOKEN_EXPIRED",
    "USER_DISABLED",
    "USER_NOT_FOUND",
];

pub struct SecureTokenCredentialManager {
    client: Client,
    token_url: String,
    api_key: String,
}

fn map_token_refresh_error(err: TokenRefreshError) -> CredentialError {
    match err {
        TokenRefreshError::Network(e) => CredentialError::Network(e),
        TokenRefreshError::Parse(e) => CredentialError::ParseError(e),
        TokenRefreshError::Api {
            status, message, ..
        } => {
            if RELOGIN_MESSAGES.iter().any(|m| message.starts_with(m)) {
                CredentialError::InvalidRefreshToken(message)
            } else {
                CredentialError::RefreshFailed { status, message }
            }
        }
    }
}

/// Absolute expiry for a provider-reported lifetime.
///
/// Lifetimes that do not fit a timestamp are dropped rather than trusted.
fn expiry_from(expires_in: Option<u64>, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let secs = i64::try_from(expires_in?).ok()?;
    now.checked_add_signed(Duration::try_seconds(secs)?)
}

impl SecureTokenCredentialManager {
    pub fn new(client: Client, token_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            token_url: token_url.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl CredentialManager for SecureTokenCredentialManager {
    fn provider_id(&self) -> &'static str {
        "securetoken"
    }

    #[instrument(skip(self, refresh_token))]
    async fn refresh(
        &self,
        refresh_token: &RefreshToken,
    ) -> Result<RefreshedCredentials, CredentialError> {
        if refresh_token.as_str().is_empty() {
            return Err(CredentialError::MissingRefreshToken);
        }

        let tokens = securetoken_refresh(
            &self.client,
            &self.token_url,
            &self.api_key,
            refresh_token.as_str(),
        )
        .await
        .map_err(map_token_refresh_error)?;

        debug!(expires_in = ?tokens.expires_in, "securetoken refresh completed");

        Ok(RefreshedCredentials {
            access_token: AccessToken::new(tokens.access_token),
            expires_at: expiry_from(tokens.expires_in, Utc::now()),
            user_id: tokens.user_id,
        })
    }
}
