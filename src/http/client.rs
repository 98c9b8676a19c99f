use super::protocol;
use crate::{EchoError, Result};
use bytes::{Bytes, BytesMut};
use http::{Request, Response};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Configuration for HTTP clients
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Read timeout for operations
    pub read_timeout: Duration,
    /// Write timeout for operations
    pub write_timeout: Duration,
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Buffer size for reading data
    pub buffer_size: usize,
    /// Maximum response size to prevent memory exhaustion
    pub max_response_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_secs(30),
            write_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            buffer_size: 8192,
            max_response_size: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// HTTP client for driving a hosted handler from tests
///
/// Each call opens a fresh connection, sends one request with
/// `Connection: close` and reads the response until the server closes.
///
/// # Examples
///
/// ```no_run
/// use echosrv::HttpClient;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = HttpClient::new("127.0.0.1:8080".parse()?);
///
///     let response = client.post("/data", r#"{"x":5}"#).await?;
///     println!("{}", String::from_utf8_lossy(response.body()));
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    addr: SocketAddr,
    config: ClientConfig,
}

impl HttpClient {
    /// Client for the server at `addr` with default configuration
    pub fn new(addr: SocketAddr) -> Self {
        Self::with_config(addr, ClientConfig::default())
    }

    pub fn with_config(addr: SocketAddr, config: ClientConfig) -> Self {
        Self { addr, config }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Sends a `GET` for `path`
    pub async fn get(&self, path: &str) -> Result<Response<Bytes>> {
        let request = Request::get(path).body(Bytes::new())?;
        self.send(request).await
    }

    /// Sends a `POST` for `path` carrying `body`
    pub async fn post(&self, path: &str, body: impl Into<Bytes>) -> Result<Response<Bytes>> {
        let request = Request::post(path).body(body.into())?;
        self.send(request).await
    }

    /// Sends `request` and waits for the complete response
    pub async fn send(&self, request: Request<Bytes>) -> Result<Response<Bytes>> {
        let mut stream = timeout(self.config.connect_timeout, TcpStream::connect(self.addr))
            .await
            .map_err(|_| EchoError::Timeout("Connection timeout".to_string()))??;

        let host = self.addr.to_string();
        timeout(
            self.config.write_timeout,
            protocol::write_request(&mut stream, &request, &host),
        )
        .await
        .map_err(|_| EchoError::Timeout("Write timeout".to_string()))??;

        let raw = self.read_to_close(&mut stream).await?;
        Ok(protocol::parse_response(&raw)?)
    }

    /// Reads until the server closes the connection, enforcing size limits
    async fn read_to_close(&self, stream: &mut TcpStream) -> Result<BytesMut> {
        let mut response = BytesMut::with_capacity(self.config.buffer_size);
        let mut buffer = vec![0u8; self.config.buffer_size];

        loop {
            let n = timeout(self.config.read_timeout, stream.read(&mut buffer))
                .await
                .map_err(|_| {
                    EchoError::Timeout(format!(
                        "Read timeout after {} response bytes",
                        response.len()
                    ))
                })??;

            if n == 0 {
                break;
            }
            if response.len() + n > self.config.max_response_size {
                return Err(EchoError::Config(format!(
                    "Response too large: {} bytes, max allowed: {}",
                    response.len() + n,
                    self.config.max_response_size
                )));
            }
            response.extend_from_slice(&buffer[..n]);
        }

        Ok(response)
    }
}

/// Builder for client configuration
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
        }
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout = timeout;
        self
    }

    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.config.write_timeout = timeout;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    pub fn buffer_size(mut self, size: usize) -> Self {
        self.config.buffer_size = size;
        self
    }

    pub fn max_response_size(mut self, size: usize) -> Self {
        self.config.max_response_size = size;
        self
    }

    pub fn build(self) -> ClientConfig {
        self.config
    }
}

impl Default for ClientConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_builder() {
        let config = ClientConfigBuilder::new()
            .read_timeout(Duration::from_secs(60))
            .write_timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_millis(100))
            .buffer_size(2048)
            .max_response_size(1024 * 1024)
            .build();

        assert_eq!(config.read_timeout, Duration::from_secs(60));
        assert_eq!(config.write_timeout, Duration::from_secs(30));
        assert_eq!(config.connect_timeout, Duration::from_millis(100));
        assert_eq!(config.buffer_size, 2048);
        assert_eq!(config.max_response_size, 1024 * 1024);
    }

    #[tokio::test]
    async fn test_connect_refused() {
        // Bind and drop to get a port nothing listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = HttpClient::new(addr);
        let result = client.get("/").await;
        assert!(matches!(result, Err(EchoError::Io(_))));
    }
}
