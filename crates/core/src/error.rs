//! Classified failures and their stable error payloads
//!
//! Failures are routine outcomes here, not exceptional program states:
//! every variant is returned as data from the provider client and
//! serialized into the same interchange format as success responses.

use serde::Serialize;

use crate::query::ValidationError;

/// Classified failure for a weather lookup
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WeatherError {
    /// Malformed or out-of-range input. Correct the parameters and retry.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// API key invalid or missing. Not retryable without operator action.
    #[error("authorization failed: {0}")]
    Auth(String),

    /// Location not recognized by the provider.
    #[error("location not found: {0}")]
    NotFound(String),

    /// Upstream throttling. The caller may retry after backoff.
    #[error("rate limited by upstream: {0}")]
    RateLimited(String),

    /// HTTP 200 with a body that does not match the expected schema.
    #[error("unexpected upstream payload: {0}")]
    UpstreamSchema(String),

    /// Any other non-success upstream status.
    #[error("upstream error (HTTP {status}): {message}")]
    Upstream { status: u16, message: String },

    /// Network, connection or timeout failure before a response arrived.
    #[error("transport error: {0}")]
    Transport(String),
}

impl WeatherError {
    /// Stable kind tag, part of the output contract.
    pub fn kind(&self) -> &'static str {
        match self {
            WeatherError::Validation(_) => "validation_error",
            WeatherError::Auth(_) => "auth_error",
            WeatherError::NotFound(_) => "not_found",
            WeatherError::RateLimited(_) => "rate_limited",
            WeatherError::UpstreamSchema(_) => "upstream_schema_error",
            WeatherError::Upstream { .. } => "upstream_error",
            WeatherError::Transport(_) => "transport_error",
        }
    }

    /// HTTP status this classification was derived from, when there was one.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            WeatherError::Auth(_) => Some(401),
            WeatherError::NotFound(_) => Some(404),
            WeatherError::RateLimited(_) => Some(429),
            WeatherError::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the caller can meaningfully retry without changing anything.
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            WeatherError::RateLimited(_) | WeatherError::Transport(_)
        )
    }

    /// The serializable error payload surfaced to callers.
    pub fn to_payload(&self) -> ErrorPayload {
        ErrorPayload {
            status: "error",
            kind: self.kind(),
            message: self.to_string(),
            upstream_status: self.upstream_status(),
            retryable: self.retryable(),
        }
    }
}

/// Error payload returned in place of a report. A failure never partially
/// populates a report; callers get exactly one of the two shapes.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorPayload {
    pub status: &'static str,
    pub kind: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_status: Option<u16>,
    pub retryable: bool,
}
