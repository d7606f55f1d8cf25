//! Provider error types.
//!
//! These error types represent failures when talking to the remote language
//! model. Defined in `transdrill-core` so the scoring oracle can downcast
//! them out of an `anyhow::Error` and pick a fallback reason without string
//! matching.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when interacting with an LLM provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The API returned a 429 rate limit response.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Authentication failed (invalid API key).
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The requested model was not found.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// The API returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    NetworkError(String),
}

impl ProviderError {
    /// The fallback reason reported to the learner for this failure.
    pub fn reason(&self) -> FallbackReason {
        match self {
            ProviderError::AuthenticationFailed(_) => FallbackReason::AuthFailed,
            ProviderError::RateLimited { .. } => FallbackReason::RateLimited,
            ProviderError::Timeout(_) | ProviderError::NetworkError(_) => {
                FallbackReason::NetworkUnreachable
            }
            ProviderError::ModelNotFound(_) | ProviderError::ApiError { .. } => {
                FallbackReason::ServiceError
            }
        }
    }
}

/// Why the scoring oracle fell back to local similarity scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    AuthFailed,
    RateLimited,
    NetworkUnreachable,
    ServiceError,
}

impl FallbackReason {
    /// Classify an arbitrary provider failure.
    ///
    /// Anything that is not a [`ProviderError`] counts as a service error.
    pub fn classify(err: &anyhow::Error) -> Self {
        err.downcast_ref::<ProviderError>()
            .map(ProviderError::reason)
            .unwrap_or(FallbackReason::ServiceError)
    }

    /// Classify a failure the service reported in its reply body.
    pub fn from_remote_message(message: &str) -> Self {
        let message = message.to_lowercase();
        if message.contains("rate limit") || message.contains("too many requests") {
            FallbackReason::RateLimited
        } else if ["api key", "unauthorized", "authentication", "forbidden"]
            .iter()
            .any(|needle| message.contains(needle))
        {
            FallbackReason::AuthFailed
        } else {
            FallbackReason::ServiceError
        }
    }

    /// Machine-readable tag, stable across releases.
    pub fn tag(&self) -> &'static str {
        match self {
            FallbackReason::AuthFailed => "auth_failed",
            FallbackReason::RateLimited => "rate_limited",
            FallbackReason::NetworkUnreachable => "network_unreachable",
            FallbackReason::ServiceError => "service_error",
        }
    }

    /// Short learner-facing description.
    pub fn describe(&self) -> &'static str {
        match self {
            FallbackReason::AuthFailed => "AI service rejected the API key",
            FallbackReason::RateLimited => "AI service is rate limiting requests",
            FallbackReason::NetworkUnreachable => "AI service could not be reached",
            FallbackReason::ServiceError => "AI service returned an error",
        }
    }

    /// Prefix `feedback` with the tag and description of this reason.
    pub fn annotate(&self, feedback: &str) -> String {
        format!("[{}] {}. {}", self.tag(), self.describe(), feedback)
    }
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}
