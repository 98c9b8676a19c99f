use super::body::{Body, buffer_body};
use super::headers::{canonical_header_name, header_value_text};
use super::json::to_vec_html_safe;
use super::logger::{EchoLogger, TracingLogger};
use super::uri::decoded_path;
use super::Handler;
use crate::Result;
use async_trait::async_trait;
use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderValue, SERVER};
use http::{Request, Response, StatusCode};
use serde_json::{Deserializer, Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Handler that echoes the request back as a JSON document
///
/// The document holds `method`, the percent-decoded `path`, one key per
/// request header (the last value wins for repeated headers), `bodystr`
/// with the raw body as text, and `body` with the body parsed as JSON. When the body does not
/// parse, `body` is `null` and `bodyerr` carries the parser's message.
///
/// # Examples
///
/// ```
/// use echosrv::{Body, EchoDataHandler, Handler};
///
/// # tokio_test::block_on(async {
/// let request = http::Request::post("/data")
///     .body(Body::from(r#"{"x":5}"#))
///     .unwrap();
///
/// let response = EchoDataHandler::new().handle(request).await.unwrap();
/// let doc: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
/// assert_eq!(doc["method"], "POST");
/// assert_eq!(doc["body"]["x"], 5);
/// # });
/// ```
#[derive(Clone)]
pub struct EchoDataHandler {
    logger: Arc<dyn EchoLogger>,
}

impl EchoDataHandler {
    /// Value of the `Server` response header
    pub const SERVER_NAME: &'static str = "EchoDataHandler";

    /// Creates a handler that reports failures through `tracing`
    pub fn new() -> Self {
        Self::with_logger(Arc::new(TracingLogger))
    }

    /// Creates a handler that reports failures to `logger`
    pub fn with_logger(logger: Arc<dyn EchoLogger>) -> Self {
        Self { logger }
    }
}

impl Default for EchoDataHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EchoDataHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EchoDataHandler").finish_non_exhaustive()
    }
}

/// Parses the first JSON value in `body`, ignoring anything after it
fn parse_body(body: &[u8]) -> serde_json::Result<Value> {
    match Deserializer::from_slice(body).into_iter::<Value>().next() {
        Some(parsed) => parsed,
        // Nothing but whitespace; a full parse reports the end-of-input error.
        None => serde_json::from_slice(body),
    }
}

#[async_trait]
impl Handler for EchoDataHandler {
    async fn handle(&self, request: Request<Body>) -> Result<Response<Bytes>> {
        let (mut parts, body) = request.into_parts();

        let mut out = Map::new();
        out.insert("method".into(), Value::from(parts.method.as_str()));
        out.insert("path".into(), Value::from(decoded_path(&parts.uri)));

        let body = buffer_body(body, self.logger.as_ref()).await;
        parts
            .headers
            .insert(CONTENT_LENGTH, HeaderValue::from(body.len()));

        for (name, value) in &parts.headers {
            out.insert(
                canonical_header_name(name),
                Value::from(header_value_text(value)),
            );
        }

        out.insert(
            "bodystr".into(),
            Value::from(String::from_utf8_lossy(&body).into_owned()),
        );
        let parsed = match parse_body(&body) {
            Ok(value) => value,
            Err(err) => {
                out.insert("bodyerr".into(), Value::from(err.to_string()));
                Value::Null
            }
        };
        out.insert("body".into(), parsed);

        let mut encoded = to_vec_html_safe(&Value::Object(out))?;
        encoded.push(b'\n');

        debug!(method = %parts.method, path = parts.uri.path(), size = body.len(), "Echoed request as JSON");

        let response = Response::builder()
            .status(StatusCode::OK)
            .header(SERVER, Self::SERVER_NAME)
            .header(CONTENT_TYPE, "application/json")
            .body(Bytes::from(encoded))?;
        Ok(response)
    }
}
