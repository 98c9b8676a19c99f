use super::config::HttpConfig;
use super::protocol::{self, BodyFraming, HttpProtocolError};
use crate::common::EchoServerTrait;
use crate::handler::{Handler, move_host_to_authority};
use crate::security::SizeValidator;
use crate::Result;
use bytes::Bytes;
use http::{Method, Response, StatusCode};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::{signal, time::timeout};
use tracing::{Instrument, error, info, warn};

/// How long a rejected request's unread body is drained before closing
const DRAIN_TIMEOUT: Duration = Duration::from_millis(250);

/// HTTP/1.1 server hosting a single [`Handler`]
///
/// Every connection carries exactly one request and is closed after the
/// response. There is no routing: every path reaches the same handler.
/// Chunked request bodies are decoded before the handler runs, and the
/// `Host` header is moved into the request URI's authority.
///
/// # Examples
///
/// ```no_run
/// use echosrv::{EchoHandler, EchoServerTrait, HttpConfig, HttpServer};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = HttpConfig {
///         bind_addr: "127.0.0.1:8080".parse()?,
///         ..Default::default()
///     };
///
///     let server = HttpServer::new(config, EchoHandler::new());
///     server.run().await?;
///     Ok(())
/// }
/// ```
pub struct HttpServer<H> {
    config: HttpConfig,
    handler: Arc<H>,
    shutdown_signal: Arc<tokio::sync::broadcast::Sender<()>>,
}

impl<H: Handler + 'static> HttpServer<H> {
    /// Creates a server that will answer every request with `handler`
    pub fn new(config: HttpConfig, handler: H) -> Self {
        let (shutdown_signal, _) = tokio::sync::broadcast::channel(1);
        Self {
            config,
            handler: Arc::new(handler),
            shutdown_signal: Arc::new(shutdown_signal),
        }
    }

    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    /// Accepts connections on an already bound listener until shut down
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let local_addr = listener.local_addr()?;
        info!(address = %local_addr, "HTTP echo server listening");

        let connection_count = Arc::new(AtomicUsize::new(0));
        let mut shutdown_rx = self.shutdown_signal.subscribe();

        loop {
            tokio::select! {
                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((stream, addr)) => {
                            let current_count = connection_count.load(Ordering::SeqCst);
                            if current_count >= self.config.max_connections {
                                warn!(%addr, current = current_count, limit = self.config.max_connections, "Connection rejected: limit reached");
                                continue;
                            }

                            let new_count = connection_count.fetch_add(1, Ordering::SeqCst) + 1;
                            info!(%addr, current = new_count, "Accepted connection");

                            let config = self.config.clone();
                            let handler = self.handler.clone();
                            let connection_count = connection_count.clone();
                            let span = tracing::info_span!("connection", %addr);
                            tokio::spawn(async move {
                                if let Err(e) = Self::handle_connection(stream, addr, config, handler).instrument(span).await {
                                    error!(%addr, error = %e, "Error handling connection");
                                }
                                let final_count = connection_count.fetch_sub(1, Ordering::SeqCst) - 1;
                                info!(%addr, current = final_count, "Connection closed");
                            });
                        }
                        Err(e) => {
                            error!(error = %e, "Failed to accept connection");
                        }
                    }
                }
                _ = signal::ctrl_c() => {
                    info!("Received shutdown signal, stopping server");
                    break;
                }
                _ = shutdown_rx.recv() => {
                    info!("Received internal shutdown signal, stopping server");
                    break;
                }
            }
        }

        info!("HTTP echo server stopped");
        Ok(())
    }

    /// Reads one request, runs the handler and writes its response
    async fn handle_connection(
        stream: TcpStream,
        addr: SocketAddr,
        config: HttpConfig,
        handler: Arc<H>,
    ) -> Result<()> {
        let (mut reader, mut writer) = stream.into_split();
        let head_limit = SizeValidator::new(config.max_header_size);
        let body_limit = SizeValidator::new(config.max_body_size);

        let read_result = timeout(config.read_timeout, protocol::read_head(&mut reader, &head_limit)).await;
        let (head, already_read) = match read_result {
            Ok(Ok(Some(head))) => head,
            Ok(Ok(None)) => {
                info!(%addr, "Client closed connection");
                return Ok(());
            }
            Ok(Err(HttpProtocolError::Io(e))) => return Err(e.into()),
            Ok(Err(e)) => {
                return Self::reject(&mut writer, reader, addr, &config, e).await;
            }
            Err(_) => {
                warn!(%addr, "Read timeout");
                return Ok(());
            }
        };

        let framing = match protocol::body_framing(head.headers(), &body_limit) {
            Ok(framing) => framing,
            Err(e) => return Self::reject(&mut writer, reader, addr, &config, e).await,
        };

        let include_body = *head.method() != Method::HEAD;
        info!(%addr, method = %head.method(), path = head.uri().path(), framing = ?framing, "Received request");

        let mut request = match framing {
            BodyFraming::Length(length) => protocol::attach_body(head, already_read, reader, length),
            BodyFraming::Chunked => {
                let read_result = timeout(
                    config.read_timeout,
                    protocol::read_chunked_body(&mut reader, already_read, &body_limit),
                )
                .await;
                match read_result {
                    Ok(Ok(body)) => protocol::attach_decoded_body(head, body),
                    Ok(Err(HttpProtocolError::Io(e))) => return Err(e.into()),
                    Ok(Err(e)) => return Self::reject(&mut writer, reader, addr, &config, e).await,
                    Err(_) => {
                        warn!(%addr, "Read timeout");
                        return Ok(());
                    }
                }
            }
        };
        move_host_to_authority(&mut request);

        let response = match handler.handle(request).await {
            Ok(response) => response,
            Err(e) => {
                error!(%addr, error = %e, "Handler failed");
                protocol::error_response(StatusCode::INTERNAL_SERVER_ERROR, "handler failed")
            }
        };

        Self::send(&mut writer, addr, &config, &response, include_body).await
    }

    /// Answers a request that could not be accepted and drains what the
    /// client is still sending, so closing does not reset the connection
    async fn reject<R, W>(
        writer: &mut W,
        mut reader: R,
        addr: SocketAddr,
        config: &HttpConfig,
        err: HttpProtocolError,
    ) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        warn!(%addr, error = %err, status = err.status().as_u16(), "Rejected request");
        let response = protocol::error_response(err.status(), &err.to_string());
        Self::send(writer, addr, config, &response, true).await?;

        let _ = writer.shutdown().await;
        let _ = timeout(DRAIN_TIMEOUT, tokio::io::copy(&mut reader, &mut tokio::io::sink())).await;
        Ok(())
    }

    async fn send<W>(
        writer: &mut W,
        addr: SocketAddr,
        config: &HttpConfig,
        response: &Response<Bytes>,
        include_body: bool,
    ) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        match timeout(config.write_timeout, protocol::write_response(writer, response, include_body)).await {
            Ok(Ok(())) => {
                info!(%addr, status = response.status().as_u16(), size = response.body().len(), "Sent response");
                Ok(())
            }
            Ok(Err(e)) => {
                error!(%addr, error = %e, "Copying response to connection failed");
                Ok(())
            }
            Err(_) => {
                warn!(%addr, "Write timeout");
                Ok(())
            }
        }
    }
}

impl<H: Handler + 'static> EchoServerTrait for HttpServer<H> {
    /// Binds `config.bind_addr` and serves until shut down
    async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve(listener).await
    }

    /// Returns a shutdown signal sender that can be used to gracefully shutdown the server
    fn shutdown_signal(&self) -> tokio::sync::broadcast::Sender<()> {
        self.shutdown_signal.as_ref().clone()
    }
}
