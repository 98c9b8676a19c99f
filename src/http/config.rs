use std::net::SocketAddr;
use std::time::Duration;

/// Configuration for the HTTP fixture server
///
/// # Examples
///
/// ```rust
/// use echosrv::http::HttpConfig;
/// use std::time::Duration;
///
/// let config = HttpConfig {
///     bind_addr: "127.0.0.1:8080".parse().unwrap(),
///     max_connections: 100,
///     read_timeout: Duration::from_secs(30),
///     write_timeout: Duration::from_secs(30),
///     max_header_size: 16 * 1024,
///     max_body_size: 1024 * 1024,
/// };
/// ```
///
/// Using the defaults:
///
/// ```
/// use echosrv::http::HttpConfig;
///
/// let config = HttpConfig::default();
/// assert_eq!(config.max_connections, 100);
/// ```
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Network address to bind to
    pub bind_addr: SocketAddr,
    /// Maximum number of concurrent connections
    pub max_connections: usize,
    /// Time allowed for the request line and headers to arrive
    pub read_timeout: Duration,
    /// Time allowed for writing a response
    pub write_timeout: Duration,
    /// Largest accepted request head (request line plus headers)
    pub max_header_size: usize,
    /// Largest accepted declared `Content-Length`
    pub max_body_size: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            max_connections: 100,
            read_timeout: Duration::from_secs(30),
            write_timeout: Duration::from_secs(30),
            max_header_size: 16 * 1024,
            max_body_size: 10 * 1024 * 1024, // 10MB
        }
    }
}
