use super::body::{Body, buffer_body};
use super::headers::write_sorted_headers;
use super::logger::{EchoLogger, TracingLogger};
use super::uri::decoded_path;
use super::Handler;
use crate::Result;
use async_trait::async_trait;
use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderValue, SERVER};
use http::{Request, Response, StatusCode};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Handler that echoes the request back as plain text
///
/// The response body is laid out as:
///
/// ```text
/// <METHOD> <PATH>                           (path percent-decoded)
/// * <Header-Name>: "<json-quoted value>"    (one line per value, sorted by name)
/// <request body bytes>
/// ```
///
/// Before the headers are written the request's own `Content-Length` is set
/// to the number of body bytes actually received, so the listing always
/// reflects what arrived.
///
/// # Examples
///
/// ```
/// use echosrv::{Body, EchoHandler, Handler};
///
/// # tokio_test::block_on(async {
/// let request = http::Request::post("/submit")
///     .header("X-Test", "1")
///     .body(Body::from("payload"))
///     .unwrap();
///
/// let response = EchoHandler::new().handle(request).await.unwrap();
/// assert_eq!(
///     response.body().as_ref(),
///     b"POST /submit\n* Content-Length: \"7\"\n* X-Test: \"1\"\npayload"
/// );
/// # });
/// ```
#[derive(Clone)]
pub struct EchoHandler {
    logger: Arc<dyn EchoLogger>,
}

impl EchoHandler {
    /// Value of the `Server` response header
    pub const SERVER_NAME: &'static str = "EchoHandler";

    /// Creates a handler that reports failures through `tracing`
    pub fn new() -> Self {
        Self::with_logger(Arc::new(TracingLogger))
    }

    /// Creates a handler that reports failures to `logger`
    pub fn with_logger(logger: Arc<dyn EchoLogger>) -> Self {
        Self { logger }
    }
}

impl Default for EchoHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EchoHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EchoHandler").finish_non_exhaustive()
    }
}

#[async_trait]
impl Handler for EchoHandler {
    async fn handle(&self, request: Request<Body>) -> Result<Response<Bytes>> {
        let (mut parts, body) = request.into_parts();

        let mut out = format!(
            "{} {}\n",
            parts.method.as_str().to_uppercase(),
            decoded_path(&parts.uri)
        )
        .into_bytes();

        let body = buffer_body(body, self.logger.as_ref()).await;
        parts
            .headers
            .insert(CONTENT_LENGTH, HeaderValue::from(body.len()));

        write_sorted_headers(&mut out, &parts.headers, self.logger.as_ref());
        out.extend_from_slice(&body);

        debug!(method = %parts.method, path = parts.uri.path(), size = body.len(), "Echoed request as text");

        let response = Response::builder()
            .status(StatusCode::OK)
            .header(SERVER, Self::SERVER_NAME)
            .header(CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(Bytes::from(out))?;
        Ok(response)
    }
}
