use crate::handler::Handler;
use crate::http::{HttpConfig, HttpServer};
use crate::{EchoError, Result};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Starts `handler` on an ephemeral loopback port for a test
///
/// Returns the server task and the address it listens on. The listener is
/// bound before this returns, so clients can connect immediately.
pub async fn create_test_server<H>(handler: H) -> Result<(JoinHandle<Result<()>>, SocketAddr)>
where
    H: Handler + 'static,
{
    create_test_server_with_config(HttpConfig::default(), handler).await
}

/// Like [`create_test_server`], with custom limits and timeouts
///
/// `config.bind_addr` is ignored; the server always binds `127.0.0.1:0`.
pub async fn create_test_server_with_config<H>(
    config: HttpConfig,
    handler: H,
) -> Result<(JoinHandle<Result<()>>, SocketAddr)>
where
    H: Handler + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .map_err(|e| EchoError::Config(format!("Failed to bind listener: {e}")))?;
    let addr = listener
        .local_addr()
        .map_err(|e| EchoError::Config(format!("Failed to get local address: {e}")))?;

    let config = HttpConfig {
        bind_addr: addr,
        ..config
    };
    let server = HttpServer::new(config, handler);

    let server_handle = tokio::spawn(async move { server.serve(listener).await });

    Ok((server_handle, addr))
}
