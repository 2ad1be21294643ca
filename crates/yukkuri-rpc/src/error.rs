//! Internal error types for the HTTP transport.
//!
//! These errors stay inside `yukkuri-rpc`; they are mapped to
//! [`TransportError`] at the port boundary.

use thiserror::Error;
use yukkuri_core::TransportError;

/// Result type alias for HTTP transport operations.
pub type RpcResult<T> = Result<T, RpcError>;

/// Errors raised while talking to the Panel bridge over HTTP.
#[derive(Debug, Error)]
pub enum RpcError {
    /// The bridge answered with an error status and no fault body.
    #[error("Panel bridge request failed with status {status}: {url}")]
    Status {
        /// HTTP status code
        status: u16,
        /// The URL that was requested
        url: String,
    },

    /// The bridge answered with something that is not a reply envelope.
    #[error("Invalid response from Panel bridge: {message}")]
    InvalidResponse {
        /// Description of what was invalid
        message: String,
    },

    /// Network or HTTP client error.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// JSON encoding or parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<RpcError> for TransportError {
    fn from(err: RpcError) -> Self {
        match err {
            RpcError::Network(ref e) if e.is_connect() => Self::Unreachable(err.to_string()),
            RpcError::Network(_) => Self::Io(err.to_string()),
            RpcError::InvalidUrl(_) => Self::Unreachable(err.to_string()),
            RpcError::Status { .. } | RpcError::InvalidResponse { .. } | RpcError::Json(_) => {
                Self::Protocol(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_message() {
        let error = RpcError::Status {
            status: 502,
            url: "http://127.0.0.1:50080/invoke".to_string(),
        };
        let msg = error.to_string();
        assert!(msg.contains("502"));
        assert!(msg.contains("/invoke"));
    }

    #[test]
    fn test_status_maps_to_protocol() {
        let error = RpcError::Status {
            status: 500,
            url: "http://panel/invoke".to_string(),
        };
        assert!(matches!(
            TransportError::from(error),
            TransportError::Protocol(_)
        ));
    }

    #[test]
    fn test_bad_json_maps_to_protocol() {
        let parse = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let mapped = TransportError::from(RpcError::from(parse));
        assert!(matches!(mapped, TransportError::Protocol(ref m) if m.contains("JSON")));
    }

    #[test]
    fn test_invalid_url_is_unreachable() {
        let parse = url::Url::parse("not a url").unwrap_err();
        assert!(TransportError::from(RpcError::from(parse)).is_unreachable());
    }
}
