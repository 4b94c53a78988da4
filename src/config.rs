// src/config.rs
//! Resolved client configuration.
//!
//! The crate never reads environment variables or files itself: the host
//! resolves a credential and hands it over here, already validated.

use crate::api::RetryPolicy;
use crate::constants::{NOTION_API_BASE_URL, NOTION_VERSION, REQUEST_TIMEOUT_SECS};
use crate::types::ValidationError;
use std::fmt;
use std::time::Duration;
use url::Url;

/// Bearer credential for the Notion API.
///
/// Immutable once constructed and owned by the transport. Both `Display`
/// and `Debug` redact; the full token never appears in logs or error
/// messages.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Create a new API key with validation
    pub fn new(key: impl Into<String>) -> Result<Self, ValidationError> {
        let key = key.into();

        if key.is_empty() {
            return Err(ValidationError::InvalidApiKey {
                reason: "API key cannot be empty".to_string(),
            });
        }

        if !key.starts_with("secret_") && !key.starts_with("ntn_") {
            return Err(ValidationError::InvalidApiKey {
                reason: "API key must start with 'secret_' or 'ntn_'".to_string(),
            });
        }

        if key.len() < 20 {
            return Err(ValidationError::InvalidApiKey {
                reason: "API key is too short".to_string(),
            });
        }

        Ok(Self(key))
    }

    /// Get the API key as a string reference
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Redact in display
        write!(f, "{}...", &self.0[..10.min(self.0.len())])
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiKey({})", self)
    }
}

/// Everything the transport needs to reach the service.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_key: ApiKey,
    pub base_url: Url,
    pub protocol_version: String,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl ClientConfig {
    /// Configuration with production defaults for the given credential.
    pub fn new(api_key: ApiKey) -> Self {
        Self {
            api_key,
            base_url: Url::parse(NOTION_API_BASE_URL)
                .expect("default base URL is statically valid"),
            protocol_version: NOTION_VERSION.to_string(),
            timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            retry: RetryPolicy::default(),
        }
    }

    /// Point the client at a different host (mock servers in tests,
    /// regional proxies).
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, ValidationError> {
        let parsed = Url::parse(base_url).map_err(|e| ValidationError::InvalidUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(ValidationError::InvalidUrl {
                url: base_url.to_string(),
                reason: "Only HTTP and HTTPS URLs are supported".to_string(),
            });
        }
        self.base_url = parsed;
        Ok(self)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}
