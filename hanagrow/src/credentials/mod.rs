//! Credential management module.
//!
//! # Architecture
//!
//! - [`CredentialManager`]: provider-specific refresh trait
//! - [`SecureTokenCredentialManager`]: Google securetoken implementation
//! - [`CredentialState`]: owns the refresh/access token pair for one run

mod error;
mod manager;
mod state;
mod types;

// Provider-specific implementations
pub mod platforms;

pub use error::CredentialError;
pub use manager::{CredentialManager, RefreshedCredentials};
pub use platforms::SecureTokenCredentialManager;
pub use state::CredentialState;
pub use types::{AccessToken, RefreshToken};
