//! Errors returned by the catalog client.

use thiserror::Error;

/// Errors that can occur when calling the catalog API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never got a response (connect, timeout, reset).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-2xx status. `message` is the server's
    /// `error` string when it sent one.
    #[error("{message}")]
    Status { status: u16, message: String },

    /// The response body did not match the expected shape.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The client could not be configured.
    #[error("Invalid client configuration: {0}")]
    Config(String),
}

impl ApiError {
    /// HTTP status of a server rejection, if this is one.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the request may succeed if sent again: transport failures and
    /// 5xx responses. 4xx responses never are.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => !e.is_builder() && !e.is_decode(),
            Self::Status { status, .. } => *status >= 500,
            Self::Parse(_) | Self::Config(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_errors_display_server_message() {
        let err = ApiError::Status {
            status: 404,
            message: "Fabric not found".to_string(),
        };
        assert_eq!(err.to_string(), "Fabric not found");
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn test_only_server_errors_are_retryable() {
        let server = ApiError::Status {
            status: 503,
            message: "unavailable".to_string(),
        };
        let client = ApiError::Status {
            status: 400,
            message: "bad".to_string(),
        };
        assert!(server.is_retryable());
        assert!(!client.is_retryable());
        assert!(!ApiError::Parse("eof".to_string()).is_retryable());
    }
}
