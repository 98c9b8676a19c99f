use crate::http::protocol::HttpProtocolError;
use thiserror::Error;

/// Error types for the echosrv library
#[derive(Error, Debug)]
pub enum EchoError {
    /// Socket-level errors (bind, accept, connect, read, write)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors building `http` request/response values
    #[error("HTTP error: {0}")]
    Http(#[from] ::http::Error),

    /// Malformed or rejected HTTP traffic
    #[error("HTTP protocol error: {0}")]
    Protocol(String),

    /// JSON encoding errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Timeout errors
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// Unsupported operation errors
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

impl From<HttpProtocolError> for EchoError {
    fn from(err: HttpProtocolError) -> Self {
        match err {
            HttpProtocolError::Io(e) => EchoError::Io(e),
            HttpProtocolError::Unsupported(msg) => EchoError::Unsupported(msg),
            other => EchoError::Protocol(other.to_string()),
        }
    }
}

/// Result type for the echosrv library
pub type Result<T> = std::result::Result<T, EchoError>;

pub mod common;
pub mod handler;
pub mod http;
pub mod security;

// Re-export main types for convenience
pub use common::EchoServerTrait;
pub use handler::{
    Body, EchoDataHandler, EchoHandler, EchoLogger, Handler, MemoryLogger, TracingLogger,
};
pub use crate::http::{ClientConfig, ClientConfigBuilder, HttpClient, HttpConfig, HttpServer};

#[cfg(test)]
mod tests {
    use super::*;

    fn variant(err: &EchoError) -> &'static str {
        match err {
            EchoError::Io(_) => "io",
            EchoError::Http(_) => "http",
            EchoError::Protocol(_) => "protocol",
            EchoError::Json(_) => "json",
            EchoError::Config(_) => "config",
            EchoError::Timeout(_) => "timeout",
            EchoError::Unsupported(_) => "unsupported",
        }
    }

    #[test]
    fn test_protocol_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone");
        let err: EchoError = HttpProtocolError::Io(io).into();
        assert_eq!(variant(&err), "io");

        let err: EchoError = HttpProtocolError::Unsupported("gzip".into()).into();
        assert_eq!(variant(&err), "unsupported");

        let err: EchoError = HttpProtocolError::IncompleteRequest.into();
        assert_eq!(variant(&err), "protocol");
        assert_eq!(err.to_string(), "HTTP protocol error: Incomplete request");
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: EchoError = json_err.into();
        assert_eq!(variant(&err), "json");
    }
}
