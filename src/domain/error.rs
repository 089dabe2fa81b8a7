//! Error types for the discovery engine.
//!
//! This module defines the centralized error type [`DiscoveryError`] and a type
//! alias [`Result`] used throughout the crate. Nothing in the engine treats
//! these as fatal: fetch failures degrade to an empty result set plus a
//! message, location failures degrade to a fallback coordinate.

use std::time::Duration;
use thiserror::Error;

/// The main error type for discovery engine operations.
///
/// Transport-level variants (`Network`, `Timeout`, 5xx `Api`) are transient and
/// reported as retryable to the presentation layer. `Decode` covers payloads
/// that were delivered but could not be understood as a whole.
///
/// # Examples
///
/// ```
/// use event_compass::DiscoveryError;
/// use std::time::Duration;
///
/// let err = DiscoveryError::Timeout(Duration::from_secs(15));
/// assert!(err.is_retryable());
/// ```
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The request never produced an HTTP response (DNS, connect, reset).
    #[error("Network error: {0}")]
    Network(String),

    /// The request exceeded its bounded timeout and was abandoned.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The aggregation service answered with a non-success status.
    #[error("API error (status {status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly empty.
        message: String,
    },

    /// A response body could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Device location could not be obtained (denied, unavailable).
    #[error("Location unavailable: {0}")]
    Location(String),

    /// Configuration is invalid or missing.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Filesystem or I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DiscoveryError {
    /// Whether retrying the same request could plausibly succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) => true,
            Self::Api { status, .. } => *status >= 500 || *status == 429,
            Self::Decode(_) | Self::Location(_) | Self::Config(_) | Self::Io(_) => false,
        }
    }

    /// Short human-readable message for display next to the result list.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Network(_) => "Could not reach the event service. Check your connection.".to_string(),
            Self::Timeout(_) => "The event service took too long to respond.".to_string(),
            Self::Api { status, .. } if *status >= 500 => {
                "The event service is having trouble right now.".to_string()
            }
            Self::Api { .. } => "Failed to load events".to_string(),
            Self::Decode(_) => "Received an unexpected response from the event service.".to_string(),
            Self::Location(_) => "Your location could not be determined.".to_string(),
            Self::Config(message) => format!("Configuration problem: {message}"),
            Self::Io(e) => e.to_string(),
        }
    }
}

impl From<reqwest::Error> for DiscoveryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for DiscoveryError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<url::ParseError> for DiscoveryError {
    fn from(err: url::ParseError) -> Self {
        Self::Config(format!("invalid service URL: {err}"))
    }
}

impl From<toml::de::Error> for DiscoveryError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

/// A specialized `Result` type for discovery engine operations.
pub type Result<T> = std::result::Result<T, DiscoveryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_failures_are_retryable() {
        assert!(DiscoveryError::Network("reset".into()).is_retryable());
        assert!(DiscoveryError::Api { status: 503, message: String::new() }.is_retryable());
        assert!(!DiscoveryError::Api { status: 404, message: String::new() }.is_retryable());
        assert!(!DiscoveryError::Decode("bad".into()).is_retryable());
    }

    #[test]
    fn client_errors_use_generic_message() {
        let err = DiscoveryError::Api { status: 400, message: "nope".into() };
        assert_eq!(err.user_message(), "Failed to load events");
    }
}
