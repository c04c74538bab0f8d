//! Wire-level client for the HANA Network backend.
//!
//! - [`auth`]: refresh-token exchange with the identity provider
//! - [`graphql`]: request execution and response classification
//! - [`client`]: `reqwest::Client` construction (proxy, timeout, TLS provider)

pub mod auth;
pub mod client;
pub mod graphql;

pub use auth::{RefreshedTokens, TokenRefreshError};
pub use client::{ClientBuildError, ClientOptions, create_client};
pub use graphql::{CallFailure, CallResult, CurrentUser, GraphQlError, GraphQlRequest, Operation};
