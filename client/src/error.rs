//! Error types for the Daybook HTTP client

use thiserror::Error;

/// Errors that can occur when talking to the todo service
///
/// `Clone` so that failures can travel inside reducer actions.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The request never produced a response (connection, DNS, TLS, ...)
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// The response body did not match the expected entity shape
    #[error("Response parsing failed: {0}")]
    ResponseParseFailed(String),

    /// The service answered with a non-2xx status
    #[error("Service error (status {status}): {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, possibly empty
        message: String,
    },

    /// The configured base URL cannot be used to build request URLs
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),
}

impl TransportError {
    /// HTTP status of the failure, when the service answered at all
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
