//! Credential error types.

use thiserror::Error;

/// Errors that can occur while obtaining an access token.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// No refresh token was configured.
    #[error("Missing refresh token")]
    MissingRefreshToken,

    /// The provider no longer accepts the refresh token - re-login required.
    #[error("Invalid refresh token - re-login required: {0}")]
    InvalidRefreshToken(String),

    /// The provider rejected the refresh for another reason.
    #[error("Failed to refresh access token (HTTP {status}): {message}")]
    RefreshFailed { status: u16, message: String },

    /// Network error.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Parse error.
    #[error("Parse error: {0}")]
    ParseError(String),
}

impl CredentialError {
    /// Check if this error requires manual re-login.
    pub fn requires_relogin(&self) -> bool {
        matches!(self, Self::MissingRefreshToken | Self::InvalidRefreshToken(_))
    }

    /// Check if this error is transient and may be retried.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::ParseError(_) => true,
            Self::RefreshFailed { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
