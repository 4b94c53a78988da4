// src/error.rs
//! Client error types with structured error handling.
//!
//! Error types form the vocabulary for failure modes in the system.
//! Each variant tells the story of what went wrong and where, enabling
//! composable recovery strategies: transient kinds are retried by the
//! transport, everything else surfaces to the caller immediately.

use std::fmt;
use thiserror::Error;

use crate::constants::ERROR_BODY_PREVIEW_LENGTH;

/// Notion API error codes as a typed vocabulary.
///
/// Instead of matching against magic strings like `"rate_limited"`,
/// the domain vocabulary is encoded in the type system. Each variant
/// tells you exactly what the API reported and enables pattern-based
/// recovery without stringly-typed dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCode {
    /// API rate limit exceeded — back off and retry
    RateLimited,
    /// The requested object does not exist or is inaccessible
    ObjectNotFound,
    /// API key is invalid or expired
    Unauthorized,
    /// API key lacks permission for this resource
    RestrictedResource,
    /// Request body contains invalid JSON
    InvalidJson,
    /// Request parameters failed the service's validation
    ValidationFailed,
    /// Conflict with current state of the resource
    Conflict,
    /// Notion internal server error
    InternalError,
    /// Notion is temporarily unavailable
    ServiceUnavailable,
    /// HTTP status code fallback when the error body is unparseable
    HttpStatus(u16),
    /// An error code this client doesn't recognize yet
    Unknown(String),
}

impl ErrorCode {
    /// Parse a Notion API error code string into the typed vocabulary.
    pub fn from_api_response(code: &str) -> Self {
        match code {
            "rate_limited" => Self::RateLimited,
            "object_not_found" => Self::ObjectNotFound,
            "unauthorized" => Self::Unauthorized,
            "restricted_resource" => Self::RestrictedResource,
            "invalid_json" => Self::InvalidJson,
            "validation_error" => Self::ValidationFailed,
            "conflict_error" => Self::Conflict,
            "internal_server_error" => Self::InternalError,
            "service_unavailable" => Self::ServiceUnavailable,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Create from an HTTP status code when the error body is unparseable.
    pub fn from_http_status(status: u16) -> Self {
        Self::HttpStatus(status)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RateLimited => write!(f, "rate_limited"),
            Self::ObjectNotFound => write!(f, "object_not_found"),
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::RestrictedResource => write!(f, "restricted_resource"),
            Self::InvalidJson => write!(f, "invalid_json"),
            Self::ValidationFailed => write!(f, "validation_error"),
            Self::Conflict => write!(f, "conflict_error"),
            Self::InternalError => write!(f, "internal_server_error"),
            Self::ServiceUnavailable => write!(f, "service_unavailable"),
            Self::HttpStatus(code) => write!(f, "http_{}", code),
            Self::Unknown(code) => write!(f, "{}", code),
        }
    }
}

/// Main client error type.
///
/// The `attempts` field on transient variants records how many attempts
/// the transport made before surfacing the error; pre-flight failures
/// constructed outside the transport carry `attempts: 0`.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Authentication failed: {message}")]
    Auth { message: String },

    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Validation failed: {message}")]
    Validation { message: String },

    #[error("Rate limited by the service ({attempts} attempts): {message}")]
    RateLimited { message: String, attempts: u32 },

    #[error("Server error HTTP {status} ({attempts} attempts): {message}")]
    Server {
        status: u16,
        message: String,
        attempts: u32,
    },

    #[error("Network failure ({attempts} attempts): {message}")]
    Network { message: String, attempts: u32 },

    #[error("Unsupported property type: {property_type}")]
    Schema { property_type: String },

    #[error("Row {index} failed on field '{field}': {message}")]
    Row {
        index: usize,
        field: String,
        message: String,
    },

    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl ClientError {
    /// Shorthand for a pre-flight validation failure.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Stable machine-readable kind, paired with the human-readable
    /// `Display` message when an error is handed to the hosting framework.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Auth { .. } => "auth_error",
            Self::NotFound { .. } => "not_found_error",
            Self::Validation { .. } => "validation_error",
            Self::RateLimited { .. } => "rate_limited",
            Self::Server { .. } => "server_error",
            Self::Network { .. } => "network_error",
            Self::Schema { .. } => "schema_error",
            Self::Row { .. } => "row_error",
            Self::Malformed(_) => "malformed_response",
        }
    }

    /// Whether this error is transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Server { .. } | Self::Network { .. }
        )
    }

    /// Stamp the attempt count onto a terminal transient error.
    pub(crate) fn with_attempts(self, attempts: u32) -> Self {
        match self {
            Self::RateLimited { message, .. } => Self::RateLimited { message, attempts },
            Self::Server {
                status, message, ..
            } => Self::Server {
                status,
                message,
                attempts,
            },
            Self::Network { message, .. } => Self::Network { message, attempts },
            other => other,
        }
    }

    /// Classify an HTTP error response into a client error.
    ///
    /// The typed [`ErrorCode`] from the response body wins over the raw
    /// status when the two disagree; the status is the fallback for
    /// unparseable bodies.
    pub fn from_status(status: u16, code: ErrorCode, message: String) -> Self {
        match code {
            ErrorCode::Unauthorized | ErrorCode::RestrictedResource => Self::Auth { message },
            ErrorCode::ObjectNotFound => Self::NotFound { message },
            ErrorCode::RateLimited => Self::RateLimited {
                message,
                attempts: 0,
            },
            ErrorCode::InvalidJson | ErrorCode::ValidationFailed | ErrorCode::Conflict => {
                Self::Validation { message }
            }
            ErrorCode::InternalError | ErrorCode::ServiceUnavailable => Self::Server {
                status,
                message,
                attempts: 0,
            },
            ErrorCode::HttpStatus(_) | ErrorCode::Unknown(_) => match status {
                401 | 403 => Self::Auth { message },
                404 => Self::NotFound { message },
                408 | 429 => Self::RateLimited {
                    message,
                    attempts: 0,
                },
                500..=599 => Self::Server {
                    status,
                    message,
                    attempts: 0,
                },
                _ => Self::Validation { message },
            },
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            "request timed out".to_string()
        } else {
            err.to_string()
        };
        Self::Network {
            message,
            attempts: 0,
        }
    }
}

impl From<crate::types::ValidationError> for ClientError {
    fn from(err: crate::types::ValidationError) -> Self {
        Self::Validation {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}

// Allow converting from anyhow::Error at integration boundaries,
// preserving the rendered chain as the message.
impl From<anyhow::Error> for ClientError {
    fn from(err: anyhow::Error) -> Self {
        Self::Malformed(format!("{:#}", err))
    }
}

/// Truncate a response body for inclusion in error messages.
pub(crate) fn body_preview(body: &str) -> String {
    if body.chars().count() > ERROR_BODY_PREVIEW_LENGTH {
        let preview: String = body.chars().take(ERROR_BODY_PREVIEW_LENGTH).collect();
        format!("{}...", preview)
    } else {
        body.to_string()
    }
}

/// Result type alias for convenience
pub type Result<T, E = ClientError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_parsing() {
        assert_eq!(
            ErrorCode::from_api_response("rate_limited"),
            ErrorCode::RateLimited
        );
        assert_eq!(
            ErrorCode::from_api_response("object_not_found"),
            ErrorCode::ObjectNotFound
        );
        assert_eq!(
            ErrorCode::from_api_response("something_new"),
            ErrorCode::Unknown("something_new".to_string())
        );
    }

    #[test]
    fn status_classification() {
        let auth = ClientError::from_status(
            401,
            ErrorCode::Unauthorized,
            "token expired".to_string(),
        );
        assert_eq!(auth.kind(), "auth_error");
        assert!(!auth.is_retryable());

        let rate = ClientError::from_status(
            429,
            ErrorCode::RateLimited,
            "slow down".to_string(),
        );
        assert!(rate.is_retryable());

        let server = ClientError::from_status(
            503,
            ErrorCode::from_http_status(503),
            "unavailable".to_string(),
        );
        assert!(server.is_retryable());

        let not_found = ClientError::from_status(
            404,
            ErrorCode::from_http_status(404),
            "no such page".to_string(),
        );
        assert_eq!(not_found.kind(), "not_found_error");
        assert!(!not_found.is_retryable());
    }

    #[test]
    fn attempts_stamped_on_transient_kinds_only() {
        let err = ClientError::Server {
            status: 500,
            message: "boom".to_string(),
            attempts: 0,
        }
        .with_attempts(3);
        assert!(matches!(err, ClientError::Server { attempts: 3, .. }));

        let err = ClientError::validation("bad filter").with_attempts(3);
        assert!(matches!(err, ClientError::Validation { .. }));
    }

    #[test]
    fn body_preview_truncates_on_char_boundary() {
        let long = "ä".repeat(ERROR_BODY_PREVIEW_LENGTH + 50);
        let preview = body_preview(&long);
        assert!(preview.ends_with("..."));
        assert_eq!(
            preview.chars().count(),
            ERROR_BODY_PREVIEW_LENGTH + 3
        );
    }
}
