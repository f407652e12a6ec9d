//! Reqwest transport configuration.

use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

/// Default timeout for a whole request: 30 seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default timeout for establishing a connection: 10 seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Configuration for [`ReqwestClient`](super::ReqwestClient).
///
/// The request timeout also bounds uploads, so it should leave room for the
/// largest file the stasher accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct ReqwestConfig {
    /// HTTP request timeout in seconds
    #[cfg_attr(
        feature = "config",
        arg(long = "http-timeout", default_value_t = DEFAULT_TIMEOUT_SECS)
    )]
    #[serde(default = "default_timeout_secs")]
    pub http_timeout: u64,

    /// Connection timeout in seconds
    #[cfg_attr(
        feature = "config",
        arg(long = "http-connect-timeout", default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS)
    )]
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout: u64,

    /// User-Agent header to send with requests
    #[cfg_attr(feature = "config", arg(long = "http-user-agent"))]
    #[serde(default)]
    pub user_agent: Option<String>,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_connect_timeout_secs() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

impl Default for ReqwestConfig {
    fn default() -> Self {
        Self {
            http_timeout: default_timeout_secs(),
            connect_timeout: default_connect_timeout_secs(),
            user_agent: None,
        }
    }
}

impl ReqwestConfig {
    /// Returns the effective request timeout, using the default if zero.
    pub fn effective_timeout(&self) -> Duration {
        Duration::from_secs(match self.http_timeout {
            0 => DEFAULT_TIMEOUT_SECS,
            secs => secs,
        })
    }

    /// Returns the effective connect timeout, using the default if zero.
    pub fn effective_connect_timeout(&self) -> Duration {
        Duration::from_secs(match self.connect_timeout {
            0 => DEFAULT_CONNECT_TIMEOUT_SECS,
            secs => secs,
        })
    }

    /// Returns the effective user agent, using `nvisy-stash/<version>` if unset.
    pub fn effective_user_agent(&self) -> String {
        self.user_agent
            .clone()
            .filter(|agent| !agent.is_empty())
            .unwrap_or_else(|| format!("nvisy-stash/{}", env!("CARGO_PKG_VERSION")))
    }

    /// Set the request timeout in seconds.
    #[must_use]
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.http_timeout = timeout_secs;
        self
    }

    /// Set the connect timeout in seconds.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout_secs: u64) -> Self {
        self.connect_timeout = timeout_secs;
        self
    }

    /// Set the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
}
