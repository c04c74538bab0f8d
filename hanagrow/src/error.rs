//! Application-wide error types.

use thiserror::Error;

use crate::credentials::CredentialError;

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Application-wide error type.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    #[error("Transport error: {0}")]
    Transport(#[from] hanafuda_api::GraphQlError),

    #[error("Iteration {index} still unauthorized after {attempts} token refreshes")]
    AuthRetriesExhausted { index: u32, attempts: u32 },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] hanafuda_api::ClientBuildError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Whether the identity provider rejected or failed the refresh.
    pub fn is_credential_failure(&self) -> bool {
        matches!(self, Self::Credential(_))
    }

    /// Whether the failure is likely to clear up on its own (network trouble,
    /// provider overload) rather than needing operator action.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Credential(e) => e.is_transient(),
            Self::Transport(_) => true,
            _ => false,
        }
    }
}
