//! Reqwest-based HTTP client for file stashing.

use std::sync::Arc;

use nvisy_stash::FileStasher;
use reqwest::Client;

use super::ReqwestConfig;
use crate::error::Result;

/// Tracing target for reqwest client operations.
pub const TRACING_TARGET: &str = "nvisy_reqwest::client";

/// Inner client that holds the HTTP client and configuration.
struct ReqwestClientInner {
    http: Client,
    config: ReqwestConfig,
}

/// Reqwest-based HTTP client used as the stash transport.
///
/// Implements [`HttpTransport`](nvisy_stash::transport::HttpTransport) with
/// buffered and raw response modes. Clones share the connection pool.
///
/// # Examples
///
/// ```rust,ignore
/// use nvisy_reqwest::{ReqwestClient, ReqwestConfig, RpcNegotiator};
///
/// let client = ReqwestClient::new(ReqwestConfig::default())?;
/// let negotiator = RpcNegotiator::new(client.clone(), rpc_url);
/// let stasher = client.into_stasher().with_negotiator(negotiator);
///
/// let download = client.get_raw(file_url).await?;
/// let url = stasher.stash_file(download, None, None).await?;
/// ```
#[derive(Clone)]
pub struct ReqwestClient {
    inner: Arc<ReqwestClientInner>,
}

impl std::fmt::Debug for ReqwestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestClient")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl ReqwestClient {
    /// Creates a new reqwest client with the given configuration.
    pub fn new(config: ReqwestConfig) -> Result<Self> {
        let timeout = config.effective_timeout();
        let connect_timeout = config.effective_connect_timeout();
        let user_agent = config.effective_user_agent();

        tracing::debug!(
            target: TRACING_TARGET,
            timeout_ms = timeout.as_millis(),
            connect_timeout_ms = connect_timeout.as_millis(),
            "Creating reqwest client"
        );

        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .user_agent(&user_agent)
            .build()?;

        let inner = ReqwestClientInner { http, config };
        let client = Self {
            inner: Arc::new(inner),
        };

        tracing::info!(
            target: TRACING_TARGET,
            "Reqwest client created successfully"
        );

        Ok(client)
    }

    /// Gets the underlying HTTP client.
    pub(crate) fn http(&self) -> &Client {
        &self.inner.http
    }

    /// Gets the client configuration.
    pub fn config(&self) -> &ReqwestConfig {
        &self.inner.config
    }

    /// Converts this client into a [`FileStasher`] that uploads through it.
    ///
    /// The stasher still needs a negotiator before it can stash anything.
    pub fn into_stasher(self) -> FileStasher {
        FileStasher::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = ReqwestClient::new(ReqwestConfig::default()).unwrap();
        assert!(client.config().user_agent.is_none());
        assert!(format!("{client:?}").starts_with("ReqwestClient"));
    }

    #[test]
    fn test_into_stasher_uses_default_stash_config() {
        let client = ReqwestClient::new(ReqwestConfig::default().with_timeout(5)).unwrap();
        let stasher = client.into_stasher();
        assert_eq!(stasher.config().max_upload_size, 150_000_000);
    }
}
