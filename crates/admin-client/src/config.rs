//! Client configuration

use std::time::Duration;

use admin_auth::{DEFAULT_REFRESH_PATH, DEFAULT_TOKEN_SKEW_SECS};

use crate::error::{Error, Result};

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL every relative path is joined onto. Required.
    pub base_url: String,
    /// Refresh endpoint, relative to `base_url`.
    pub refresh_path: String,
    /// Tokens expiring within this window are refreshed before sending.
    pub token_skew: Duration,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            refresh_path: DEFAULT_REFRESH_PATH.to_owned(),
            token_skew: Duration::from_secs(DEFAULT_TOKEN_SKEW_SECS),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_refresh_path(mut self, path: impl Into<String>) -> Self {
        self.refresh_path = path.into();
        self
    }

    pub fn with_token_skew(mut self, skew: Duration) -> Self {
        self.token_skew = skew;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(Error::Config(format!(
                "base_url must start with http:// or https://, got: {}",
                self.base_url
            )));
        }
        if self.refresh_path.is_empty() {
            return Err(Error::Config("refresh_path must not be empty".into()));
        }
        if self.timeout.is_zero() {
            return Err(Error::Config("timeout must be greater than 0".into()));
        }
        Ok(())
    }
}
