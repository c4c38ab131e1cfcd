//! Errors raised while talking to the timing provider.

use std::time::Duration;

use thiserror::Error;

/// Failure of a single request to the results API.
///
/// Every variant carries the URL so logs identify the failing page.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The server answered with a non-success status.
    #[error("request to {url} returned HTTP {status}")]
    Http {
        /// Requested URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },
    /// The request exceeded the configured timeout.
    #[error("request to {url} timed out after {timeout:?}")]
    Timeout {
        /// Requested URL.
        url: String,
        /// Timeout that elapsed.
        timeout: Duration,
    },
    /// Connection or protocol failure before a response was read.
    #[error("request to {url} failed: {message}")]
    Network {
        /// Requested URL.
        url: String,
        /// Underlying error text.
        message: String,
    },
    /// The response body was not the expected JSON document.
    #[error("failed to decode response from {url}: {message}")]
    Decode {
        /// Requested URL.
        url: String,
        /// Decoder error text.
        message: String,
    },
    /// A required response header was absent.
    #[error("response from {url} is missing the {header} header")]
    MissingHeader {
        /// Requested URL.
        url: String,
        /// Header name.
        header: &'static str,
    },
    /// A response header could not be interpreted.
    #[error("response from {url} has an invalid {header} header: {value:?}")]
    InvalidHeader {
        /// Requested URL.
        url: String,
        /// Header name.
        header: &'static str,
        /// Raw header value.
        value: String,
    },
}

impl TransportError {
    /// Whether the error reports a missing or malformed header.
    #[must_use]
    pub const fn is_header_error(&self) -> bool {
        matches!(
            self,
            Self::MissingHeader { .. } | Self::InvalidHeader { .. }
        )
    }
}

/// Invalid or unusable remote configuration.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// A required credential or identifier was blank.
    #[error("{field} must not be empty")]
    MissingField {
        /// Name of the blank field.
        field: &'static str,
    },
    /// The event endpoint rejected the request, which the provider does for
    /// unknown client identifiers.
    #[error("event lookup returned HTTP {status}; check the client id")]
    InvalidClientId {
        /// HTTP status code returned.
        status: u16,
    },
    /// The event endpoint answered but the payload did not describe an event.
    #[error("invalid event id: {message}")]
    InvalidEventId {
        /// Decoder error text.
        message: String,
    },
    /// The event endpoint could not be reached.
    #[error("results API is unreachable")]
    Unreachable {
        /// Transport failure.
        #[source]
        source: TransportError,
    },
    /// The base URL could not be parsed or cannot carry path segments.
    #[error("invalid base URL {url:?}: {reason}")]
    InvalidBaseUrl {
        /// Rejected URL.
        url: String,
        /// Why it was rejected.
        reason: String,
    },
    /// Zero concurrent pages were requested.
    #[error("max concurrent pages must be greater than zero")]
    ZeroConcurrency,
    /// More concurrent pages were requested than a semaphore can track.
    #[error("max concurrent pages must be at most {max}, got {limit}")]
    ExcessiveConcurrency {
        /// Requested limit.
        limit: usize,
        /// Largest accepted limit.
        max: usize,
    },
    /// The HTTP client could not be built.
    #[error("failed to build HTTP client")]
    HttpClient {
        /// Builder failure.
        #[source]
        source: reqwest::Error,
    },
}

impl From<TransportError> for ConfigurationError {
    /// Classify an event-endpoint failure.
    fn from(error: TransportError) -> Self {
        match error {
            TransportError::Http { status, .. } => Self::InvalidClientId { status },
            TransportError::Decode { message, .. } => Self::InvalidEventId { message },
            other => Self::Unreachable { source: other },
        }
    }
}
