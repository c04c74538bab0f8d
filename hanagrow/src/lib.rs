//! Auto grow for HANA Network.
//!
//! Runs the grow/spin call sequence against the HANA backend in batches,
//! refreshing the access token whenever the backend rejects it and restarting
//! the whole run when something escapes.
//!
//! # Layout
//!
//! - [`credentials`]: refresh/access token pair and the identity provider
//! - [`session`]: HTTP session and the [`session::RemoteExecutor`] seam
//! - [`scheduler`]: batch orchestrator, restart backoff, supervisor
//! - [`config`] / [`cli`]: startup configuration
//! - [`output`]: console progress lines

pub mod cli;
pub mod config;
pub mod credentials;
pub mod error;
pub mod logging;
pub mod output;
pub mod scheduler;
pub mod session;

pub use error::{Error, Result};
