//! Error types for external source operations.
//!
//! Every variant follows the What/Why/Suggestion message pattern used across
//! the crate. The crawler treats all of them as terminal for the node being
//! resolved; none of them abort a run.

use thiserror::Error;

use crate::http::HttpClientError;

/// Errors raised by seed searches and citation lookups.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    /// The service could not be reached at all.
    #[error("cannot reach {service} for '{input}': {reason}\n  Suggestion: {suggestion}")]
    Unreachable {
        /// Service name (e.g. "crossref")
        service: String,
        /// Query or key being looked up
        input: String,
        /// Transport-level reason
        reason: String,
        /// How to fix the issue
        suggestion: String,
    },

    /// The service answered with a non-success status.
    #[error("{service} returned HTTP {status} for '{input}': {reason}\n  Suggestion: {suggestion}")]
    HttpStatus {
        /// Service name
        service: String,
        /// Query or key being looked up
        input: String,
        /// HTTP status code
        status: u16,
        /// Human-readable status interpretation
        reason: String,
        /// How to fix the issue
        suggestion: String,
    },

    /// The service does not know the requested record.
    #[error(
        "'{input}' not found in {service}\n  Suggestion: The identifier may be unregistered; it will be kept without citations"
    )]
    NotFound {
        /// Service name
        service: String,
        /// Key being looked up
        input: String,
    },

    /// The payload could not be decoded into the expected shape.
    #[error(
        "unexpected {service} response for '{input}': {reason}\n  Suggestion: The API format may have changed; re-run with -vv to inspect responses"
    )]
    MalformedResponse {
        /// Service name
        service: String,
        /// Query or key being looked up
        input: String,
        /// What was wrong with the payload
        reason: String,
    },

    /// The source could not be constructed.
    #[error("cannot create {service} client: {reason}\n  Suggestion: {suggestion}")]
    ClientBuild {
        /// Service name
        service: String,
        /// Why construction failed
        reason: String,
        /// How to fix the issue
        suggestion: String,
    },
}

impl SourceError {
    /// Creates an `Unreachable` error from a transport failure.
    #[must_use]
    pub fn unreachable(service: &str, input: &str, reason: &str) -> Self {
        Self::Unreachable {
            service: service.to_string(),
            input: input.to_string(),
            reason: reason.to_string(),
            suggestion: "Check your network connection and proxy settings".to_string(),
        }
    }

    /// Creates an `HttpStatus` error with a status-specific suggestion.
    #[must_use]
    pub fn http_status(service: &str, input: &str, status: u16) -> Self {
        let (reason, suggestion) = match status {
            429 => (
                "rate limit exceeded".to_string(),
                "Increase delay_ms or set mailto to use the polite pool".to_string(),
            ),
            s if s >= 500 => (
                "service unavailable".to_string(),
                "Try again later".to_string(),
            ),
            s => (
                format!("unexpected status {s}"),
                "Check the query or identifier format".to_string(),
            ),
        };
        Self::HttpStatus {
            service: service.to_string(),
            input: input.to_string(),
            status,
            reason,
            suggestion,
        }
    }

    /// Creates a `NotFound` error.
    #[must_use]
    pub fn not_found(service: &str, input: &str) -> Self {
        Self::NotFound {
            service: service.to_string(),
            input: input.to_string(),
        }
    }

    /// Creates a `MalformedResponse` error.
    #[must_use]
    pub fn malformed(service: &str, input: &str, reason: &str) -> Self {
        Self::MalformedResponse {
            service: service.to_string(),
            input: input.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Creates a `ClientBuild` error for invalid configuration.
    #[must_use]
    pub fn client_build(service: &str, reason: &str) -> Self {
        Self::ClientBuild {
            service: service.to_string(),
            reason: reason.to_string(),
            suggestion: "Check the source configuration values".to_string(),
        }
    }

    /// Wraps an HTTP client construction failure.
    #[must_use]
    pub fn from_http_client(service: &str, error: &HttpClientError) -> Self {
        Self::ClientBuild {
            service: service.to_string(),
            reason: error.to_string(),
            suggestion: "Check proxy environment variables (HTTP_PROXY, HTTPS_PROXY)".to_string(),
        }
    }
}
