// src/api/transport.rs
//! The retrying transport: envelopes in, classified JSON out.
//!
//! Every operation in the crate funnels through [`Transport::execute`].
//! The transport owns the retry loop, the usage counters, and the mapping
//! from HTTP statuses and error bodies to the typed error taxonomy.

use super::client::{HttpClient, Method};
use super::counters::UsageCounters;
use super::retry::RetryPolicy;
use crate::config::ClientConfig;
use crate::error::{body_preview, ClientError, ErrorCode};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

/// One API call, fully described. Created per call and discarded after
/// response handling; nothing is persisted.
#[derive(Debug, Clone)]
pub struct RequestEnvelope {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    /// Caller-supplied idempotency context, forwarded as the
    /// `Idempotency-Key` header. Retries of one envelope reuse the same
    /// key, so a write that raced a timeout is not applied twice.
    pub idempotency_key: Option<String>,
}

impl RequestEnvelope {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            query: Vec::new(),
            body: None,
            idempotency_key: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
            idempotency_key: None,
        }
    }

    pub fn patch(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Patch,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
            idempotency_key: None,
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

/// Error body shape the service returns alongside non-2xx statuses.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: String,
    message: String,
}

/// Executes envelopes against the service with retry semantics.
pub struct Transport {
    http: HttpClient,
    policy: RetryPolicy,
    counters: Arc<UsageCounters>,
}

impl Transport {
    pub fn new(config: &ClientConfig, counters: Arc<UsageCounters>) -> Result<Self, ClientError> {
        Ok(Self {
            http: HttpClient::new(config)?,
            policy: config.retry.clone(),
            counters,
        })
    }

    pub fn counters(&self) -> &UsageCounters {
        &self.counters
    }

    /// Executes the envelope, retrying transient failures per the policy.
    ///
    /// Every attempt increments `requests_made`; every failed attempt also
    /// increments `errors_made`. Terminal transient errors carry the number
    /// of attempts made. Dropping the returned future cancels the in-flight
    /// request and any pending backoff sleep — a cancelled call never
    /// retries.
    pub async fn execute(&self, envelope: &RequestEnvelope) -> Result<Value, ClientError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            self.counters.record_attempt();

            match self.attempt_once(envelope).await {
                Ok(value) => {
                    if attempt > 1 {
                        log::info!(
                            "{} {} succeeded on attempt {}",
                            envelope.method.as_str(),
                            envelope.path,
                            attempt
                        );
                    }
                    return Ok(value);
                }
                Err(error) => {
                    self.counters.record_error();

                    if !error.is_retryable() || attempt >= self.policy.max_attempts {
                        if error.is_retryable() {
                            log::warn!(
                                "{} {} failed permanently after {} attempts: {}",
                                envelope.method.as_str(),
                                envelope.path,
                                attempt,
                                error
                            );
                        }
                        return Err(error.with_attempts(attempt));
                    }

                    let delay = self.policy.delay_for(attempt);
                    log::warn!(
                        "{} {} failed on attempt {} ({}), retrying after {:?}",
                        envelope.method.as_str(),
                        envelope.path,
                        attempt,
                        error.kind(),
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// One attempt: send, then classify the response.
    async fn attempt_once(&self, envelope: &RequestEnvelope) -> Result<Value, ClientError> {
        let response = self
            .http
            .send(
                envelope.method,
                &envelope.path,
                &envelope.query,
                envelope.body.as_ref(),
                envelope.idempotency_key.as_deref(),
            )
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            return serde_json::from_str(&body).map_err(|e| {
                ClientError::Malformed(format!(
                    "response was not valid JSON ({}): {}",
                    e,
                    body_preview(&body)
                ))
            });
        }

        // Prefer the typed error body; fall back to the bare status.
        let (code, message) = match serde_json::from_str::<ApiErrorBody>(&body) {
            Ok(parsed) => (
                ErrorCode::from_api_response(&parsed.code),
                parsed.message,
            ),
            Err(_) => (
                ErrorCode::from_http_status(status.as_u16()),
                format!("HTTP {}: {}", status, body_preview(&body)),
            ),
        };

        Err(ClientError::from_status(status.as_u16(), code, message))
    }
}
