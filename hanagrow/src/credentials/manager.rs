//! Identity-provider credential manager trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::CredentialError;
use super::types::{AccessToken, RefreshToken};

/// Result of a successful credential refresh.
#[derive(Debug, Clone)]
pub struct RefreshedCredentials {
    /// New access token.
    pub access_token: AccessToken,
    /// Expected expiration time (if the provider reported one).
    pub expires_at: Option<DateTime<Utc>>,
    /// Provider-side user id (if reported).
    pub user_id: Option<String>,
}

impl RefreshedCredentials {
    pub fn new(access_token: AccessToken) -> Self {
        Self {
            access_token,
            expires_at: None,
            user_id: None,
        }
    }
}

/// Exchanges a refresh token for a new access token.
///
/// Implementations perform exactly one exchange per call and never retry;
/// retry policy belongs to the caller.
#[async_trait]
pub trait CredentialManager: Send + Sync {
    /// Provider identifier, used in logs.
    fn provider_id(&self) -> &'static str;

    /// Perform a credential refresh.
    ///
    /// # Returns
    /// * `Ok(RefreshedCredentials)` - Refresh successful
    /// * `Err(...)` - Refresh failed (may need re-login)
    async fn refresh(
        &self,
        refresh_token: &RefreshToken,
    ) -> Result<RefreshedCredentials, CredentialError>;
}
