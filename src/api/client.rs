// src/api/client.rs
//! Pure HTTP client wrapper for the Notion API.
//!
//! A thin wrapper around reqwest that handles authentication headers,
//! the protocol-version header, and the per-request timeout. No retry
//! logic, no parsing, no business logic — that lives in the transport.

use crate::config::ClientConfig;
use crate::error::ClientError;
use reqwest::{header, Client, Response};
use serde_json::Value;
use url::Url;

/// HTTP verb for a request envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

/// A thin wrapper around the reqwest client for Notion API requests.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    base_url: Url,
}

impl HttpClient {
    /// Creates a new HTTP client with auth and version headers installed.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let client = Client::builder()
            .default_headers(Self::create_headers(config)?)
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    /// Creates the default headers attached to every request.
    fn create_headers(config: &ClientConfig) -> Result<header::HeaderMap, ClientError> {
        let mut headers = header::HeaderMap::new();

        let auth_header = format!("Bearer {}", config.api_key.as_str());
        let mut auth_value = header::HeaderValue::from_str(&auth_header).map_err(|_| {
            ClientError::Auth {
                message: "API token contains characters that cannot be sent in a header"
                    .to_string(),
            }
        })?;
        auth_value.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, auth_value);

        headers.insert(
            "Notion-Version",
            header::HeaderValue::from_str(&config.protocol_version).map_err(|_| {
                ClientError::validation("protocol version is not a valid header value")
            })?,
        );

        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        Ok(headers)
    }

    /// Joins an endpoint path onto the base URL.
    fn endpoint_url(&self, path: &str) -> Result<Url, ClientError> {
        let joined = format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Url::parse(&joined)
            .map_err(|e| ClientError::validation(format!("invalid endpoint path '{}': {}", path, e)))
    }

    /// Sends one request. Transport-level failures come back as
    /// `reqwest::Error`; HTTP error statuses are the caller's to classify.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&Value>,
        idempotency_key: Option<&str>,
    ) -> Result<Response, ClientError> {
        let url = self.endpoint_url(path)?;
        log::debug!("{} {}", method.as_str(), url);

        let mut request = match method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
            Method::Patch => self.client.patch(url),
            Method::Delete => self.client.delete(url),
        };

        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        if let Some(key) = idempotency_key {
            request = request.header("Idempotency-Key", key);
        }

        Ok(request.send().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiKey;

    fn test_config() -> ClientConfig {
        ClientConfig::new(ApiKey::new("secret_abcdefghijklmnopqrs").unwrap())
    }

    #[test]
    fn endpoint_urls_join_cleanly() {
        let client = HttpClient::new(&test_config()).unwrap();
        let url = client.endpoint_url("pages/abc123").unwrap();
        assert_eq!(url.as_str(), "https://api.notion.com/v1/pages/abc123");

        let url = client.endpoint_url("/users").unwrap();
        assert_eq!(url.as_str(), "https://api.notion.com/v1/users");
    }
}
