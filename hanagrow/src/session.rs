//! Transport session and remote call execution.

use std::time::Duration;

use async_trait::async_trait;
use hanafuda_api::graphql;
use hanafuda_api::{CallResult, ClientOptions, GraphQlError, Operation, create_client};
use reqwest::Client;
use tracing::{debug, info};

use crate::credentials::AccessToken;
use crate::error::Result;

/// Issues one backend call and classifies the response.
///
/// Transport failures come back as `Err`; anything the backend answered is a
/// [`CallResult`]. Implementations never retry.
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    async fn execute(
        &self,
        operation: Operation,
        access_token: &AccessToken,
    ) -> std::result::Result<CallResult, GraphQlError>;
}

/// Options for opening a [`BackendSession`].
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub endpoint: String,
    pub proxy: Option<String>,
    pub request_timeout: Duration,
}

/// One HTTP connection context bound to an optional proxy.
///
/// Holds no credential state. Built at the start of a run and dropped when the
/// run ends.
pub struct BackendSession {
    client: Client,
    endpoint: String,
}

impl BackendSession {
    pub fn open(options: &SessionOptions) -> Result<Self> {
        let client = create_client(&ClientOptions {
            proxy: options.proxy.clone(),
            timeout: options.request_timeout,
        })?;

        if let Some(proxy) = options.proxy.as_deref() {
            info!(proxy = %proxy, "Connected to proxy");
        }

        Ok(Self {
            client,
            endpoint: options.endpoint.clone(),
        })
    }

    /// The underlying client, shared with the credential manager so token
    /// refreshes go through the same proxy.
    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl RemoteExecutor for BackendSession {
    async fn execute(
        &self,
        operation: Operation,
        access_token: &AccessToken,
    ) -> std::result::Result<CallResult, GraphQlError> {
        debug!(operation = %operation, "Executing GraphQL call");
        graphql::execute(
            &self.client,
            &self.endpoint,
            access_token.as_str(),
            &operation.request(),
        )
        .await
    }
}
