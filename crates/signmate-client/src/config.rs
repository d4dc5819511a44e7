use crate::error::{ClientError, Result};
use reqwest::Url;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000/api";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything the client needs, passed in explicitly at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// API root, e.g. `http://localhost:5000/api`
    pub base_url: String,
    /// Bearer token for the document endpoints
    pub token: Option<String>,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        let url = self.base_url.trim();
        if url.is_empty() {
            return Err(ClientError::InvalidConfig("base URL cannot be empty".into()));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ClientError::InvalidConfig(format!(
                "base URL must start with http:// or https://, got {}",
                url
            )));
        }
        if self.timeout.is_zero() {
            return Err(ClientError::InvalidConfig("timeout must be non-zero".into()));
        }
        if matches!(&self.token, Some(t) if t.trim().is_empty()) {
            return Err(ClientError::InvalidConfig("token cannot be blank".into()));
        }
        Ok(())
    }

    /// Join an endpoint path onto the base URL
    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Endpoint with one extra path segment, percent-encoded so `/`, `?`
    /// and `#` inside it stay part of the segment
    pub(crate) fn endpoint_with(&self, path: &str, segment: &str) -> Result<Url> {
        let mut url = Url::parse(&self.endpoint(path))
            .map_err(|e| ClientError::InvalidConfig(format!("invalid base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidConfig("base URL cannot take a path".into()))?
            .pop_if_empty()
            .push(segment);
        Ok(url)
    }
}
