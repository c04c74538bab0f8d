//! Owner of the refresh/access token pair.

use std::sync::Arc;

use tracing::{info, warn};

use super::error::CredentialError;
use super::manager::CredentialManager;
use super::types::{AccessToken, RefreshToken};

/// The current credential pair and the manager that renews it.
///
/// The refresh token never changes. The access token is swapped in whole on a
/// successful refresh and left untouched when a refresh fails.
pub struct CredentialState {
    manager: Arc<dyn CredentialManager>,
    refresh_token: RefreshToken,
    access_token: Option<AccessToken>,
    refresh_count: u64,
}

impl CredentialState {
    pub fn new(manager: Arc<dyn CredentialManager>, refresh_token: RefreshToken) -> Self {
        Self {
            manager,
            refresh_token,
            access_token: None,
            refresh_count: 0,
        }
    }

    /// The current access token, if a refresh has succeeded yet.
    pub fn access_token(&self) -> Option<&AccessToken> {
        self.access_token.as_ref()
    }

    /// Number of successful refreshes performed through this state.
    pub fn refresh_count(&self) -> u64 {
        self.refresh_count
    }

    /// Obtain a new access token and make it current.
    pub async fn refresh(&mut self) -> Result<&AccessToken, CredentialError> {
        let refreshed = match self.manager.refresh(&self.refresh_token).await {
            Ok(refreshed) => refreshed,
            Err(e) => {
                warn!(
                    provider = self.manager.provider_id(),
                    error = %e,
                    requires_relogin = e.requires_relogin(),
                    "Access token refresh failed"
                );
                return Err(e);
            }
        };

        self.refresh_count += 1;
        info!(
            provider = self.manager.provider_id(),
            refresh_count = self.refresh_count,
            expires_at = ?refreshed.expires_at,
            user_id = ?refreshed.user_id,
            "Access token refreshed"
        );

        let token: &AccessToken = self.access_token.insert(refreshed.access_token);
        Ok(token)
    }

    /// Return the current access token, refreshing first if there is none.
    pub async fn ensure_access_token(&mut self) -> Result<&AccessToken, CredentialError> {
        if self.access_token.is_none() {
            self.refresh().await?;
        }
        self.access_token
            .as_ref()
            .ok_or(CredentialError::MissingRefreshToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::manager::RefreshedCredentials;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Hands out scripted refresh outcomes in order.
    struct ScriptedManager {
        outcomes: Mutex<Vec<Result<&'static str, &'static str>>>,
    }

    impl ScriptedManager {
        fn new(mut outcomes: Vec<Result<&'static str, &'static str>>) -> Arc<Self> {
            outcomes.reverse();
            Arc::new(Self {
                outcomes: Mutex::new(outcomes),
            })
        }
    }

    #[async_trait]
    impl CredentialManager for ScriptedManager {
        fn provider_id(&self) -> &'static str {
            "scripted"
        }

        async fn refresh(
            &self,
            _refresh_token: &RefreshToken,
        ) -> Result<RefreshedCredentials, CredentialError> {
            match self.outcomes.lock().unwrap().pop().expect("script exhausted") {
                Ok(token) => Ok(RefreshedCredentials::new(AccessToken::new(token))),
                Err(message) => Err(CredentialError::RefreshFailed {
                    status: 400,
                    message: message.to_string(),
                }),
            }
        }
    }

    #[tokio::test]
    async fn test_refresh_replaces_access_token() {
        let manager = ScriptedManager::new(vec![Ok("T1"), Ok("T2")]);
        let mut state = CredentialState::new(manager, RefreshToken::new("r"));
        assert!(state.access_token().is_none());

        assert_eq!(state.refresh().await.unwrap().as_str(), "T1");
        assert_eq!(state.refresh().await.unwrap().as_str(), "T2");
        assert_eq!(state.access_token().unwrap().as_str(), "T2");
        assert_eq!(state.refresh_count(), 2);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_current_token() {
        let manager = ScriptedManager::new(vec![Ok("T1"), Err("INVALID_ARGUMENT")]);
        let mut state = CredentialState::new(manager, RefreshToken::new("r"));

        state.refresh().await.unwrap();
        assert!(state.refresh().await.is_err());
        assert_eq!(state.access_token().unwrap().as_str(), "T1");
        assert_eq!(state.refresh_count(), 1);
    }

    #[tokio::test]
    async fn test_ensure_access_token_refreshes_once() {
        let manager = ScriptedManager::new(vec![Ok("T1")]);
        let mut state = CredentialState::new(manager, RefreshToken::new("r"));

        assert_eq!(state.ensure_access_token().await.unwrap().as_str(), "T1");
        assert_eq!(state.ensure_access_token().await.unwrap().as_str(), "T1");
        assert_eq!(state.refresh_count(), 1);
    }
}
