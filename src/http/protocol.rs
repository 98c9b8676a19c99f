//! HTTP/1.1 wire handling shared by the fixture server and client
//!
//! Only what an echo fixture needs is supported: one request per
//! connection, request bodies framed by `Content-Length` or chunked
//! transfer coding, and `Connection: close` on every response.

use crate::handler::{Body, canonical_header_name};
use crate::security::{SizeError, SizeValidator};
use bytes::{Buf, Bytes, BytesMut};
use http::header::{CONNECTION, CONTENT_LENGTH, CONTENT_TYPE, HOST, HeaderMap, HeaderValue, TRANSFER_ENCODING};
use http::{Method, Request, Response, StatusCode, Version};
use std::io::{self, Cursor};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Most headers accepted in a single request or response head
pub const MAX_HEADERS: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum HttpProtocolError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("HTTP parsing error: {0}")]
    HttpParse(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Incomplete request")]
    IncompleteRequest,
    #[error("Request head too large: {0}")]
    HeaderTooLarge(SizeError),
    #[error("Too many headers, maximum allowed: {}", MAX_HEADERS)]
    TooManyHeaders,
    #[error("Request body too large: {0}")]
    BodyTooLarge(SizeError),
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

impl HttpProtocolError {
    /// Status code the server answers with when a request fails this way
    pub fn status(&self) -> StatusCode {
        match self {
            HttpProtocolError::Io(_)
            | HttpProtocolError::IncompleteRequest
            | HttpProtocolError::HttpParse(_)
            | HttpProtocolError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            HttpProtocolError::HeaderTooLarge(_) | HttpProtocolError::TooManyHeaders => {
                StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE
            }
            HttpProtocolError::BodyTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            HttpProtocolError::Unsupported(_) => StatusCode::NOT_IMPLEMENTED,
        }
    }
}

type ProtocolResult<T> = std::result::Result<T, HttpProtocolError>;

/// Reads one request head from `reader`
///
/// Returns the head together with any bytes that were read past it, which
/// already belong to the body. Returns `Ok(None)` when the peer closes the
/// connection without sending anything.
pub async fn read_head<R>(
    reader: &mut R,
    head_limit: &SizeValidator,
) -> ProtocolResult<Option<(Request<()>, Bytes)>>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = BytesMut::with_capacity(4096);

    loop {
        let n = reader.read_buf(&mut buffer).await?;
        if n == 0 {
            if buffer.is_empty() {
                return Ok(None);
            }
            return Err(HttpProtocolError::IncompleteRequest);
        }

        if let Some((head_len, head)) = parse_request_head(&buffer)? {
            head_limit
                .validate_size(head_len)
                .map_err(HttpProtocolError::HeaderTooLarge)?;
            let already_read = buffer.split_off(head_len).freeze();
            return Ok(Some((head, already_read)));
        }
        head_limit
            .validate_size(buffer.len())
            .map_err(HttpProtocolError::HeaderTooLarge)?;
    }
}

/// Joins a parsed head with a body streaming exactly `length` bytes, first
/// from `already_read` and then from `reader`
pub fn attach_body<R>(head: Request<()>, already_read: Bytes, reader: R, length: u64) -> Request<Body>
where
    R: AsyncRead + Send + 'static,
{
    let body = Body::from_reader(AsyncReadExt::chain(Cursor::new(already_read), reader).take(length));
    head.map(|()| body)
}

/// How a request body is delimited on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFraming {
    /// Exactly this many bytes follow the head
    Length(u64),
    /// `Transfer-Encoding: chunked`
    Chunked,
}

/// Framing announced by `headers`, with a declared length checked against
/// `body_limit`
///
/// Chunked bodies are checked while they are decoded, see
/// [`read_chunked_body`].
pub fn body_framing(headers: &HeaderMap, body_limit: &SizeValidator) -> ProtocolResult<BodyFraming> {
    let mut codings = headers.get_all(TRANSFER_ENCODING).iter();
    if let Some(first) = codings.next() {
        let chunked = codings.next().is_none() && first.as_bytes().eq_ignore_ascii_case(b"chunked");
        if !chunked {
            return Err(HttpProtocolError::Unsupported(format!(
                "Transfer-Encoding {first:?}"
            )));
        }
        return Ok(BodyFraming::Chunked);
    }

    let length = body_length(headers)?;
    body_limit
        .validate_size(usize::try_from(length).unwrap_or(usize::MAX))
        .map_err(HttpProtocolError::BodyTooLarge)?;
    Ok(BodyFraming::Length(length))
}

/// Reads and decodes a chunked body, starting with `already_read`
///
/// Chunk extensions and trailer fields are discarded. The decoded size and
/// the trailer section are both held to `body_limit`.
pub async fn read_chunked_body<R>(
    reader: &mut R,
    already_read: Bytes,
    body_limit: &SizeValidator,
) -> ProtocolResult<Bytes>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = BytesMut::from(already_read.as_ref());
    let mut body = BytesMut::new();

    loop {
        let (consumed, size) = loop {
            match httparse::parse_chunk_size(&buffer) {
                Ok(httparse::Status::Complete(parsed)) => break parsed,
                Ok(httparse::Status::Partial) => fill_buffer(reader, &mut buffer).await?,
                Err(_) => {
                    return Err(HttpProtocolError::InvalidRequest(
                        "invalid chunk size line".to_string(),
                    ));
                }
            }
        };
        buffer.advance(consumed);
        if size == 0 {
            break;
        }

        let size = usize::try_from(size).unwrap_or(usize::MAX);
        body_limit
            .validate_size(body.len().saturating_add(size))
            .map_err(HttpProtocolError::BodyTooLarge)?;
        while buffer.len() < size + 2 {
            fill_buffer(reader, &mut buffer).await?;
        }
        if &buffer[size..size + 2] != b"\r\n" {
            return Err(HttpProtocolError::InvalidRequest(
                "chunk data not followed by CRLF".to_string(),
            ));
        }
        body.extend_from_slice(&buffer[..size]);
        buffer.advance(size + 2);
    }

    // Trailer section, ended by an empty line.
    loop {
        match buffer.windows(2).position(|w| w == b"\r\n") {
            Some(0) => break,
            Some(end) => buffer.advance(end + 2),
            None => {
                body_limit
                    .validate_size(buffer.len())
                    .map_err(HttpProtocolError::BodyTooLarge)?;
                fill_buffer(reader, &mut buffer).await?;
            }
        }
    }

    Ok(body.freeze())
}

/// Joins a parsed head with a fully decoded chunked body
///
/// The framing headers are dropped; handlers see the body as if it had
/// been sent whole.
pub fn attach_decoded_body(head: Request<()>, body: Bytes) -> Request<Body> {
    let (mut parts, ()) = head.into_parts();
    parts.headers.remove(TRANSFER_ENCODING);
    parts.headers.remove(CONTENT_LENGTH);
    Request::from_parts(parts, Body::from(body))
}

async fn fill_buffer<R>(reader: &mut R, buffer: &mut BytesMut) -> ProtocolResult<()>
where
    R: AsyncRead + Unpin,
{
    if reader.read_buf(buffer).await? == 0 {
        return Err(HttpProtocolError::IncompleteRequest);
    }
    Ok(())
}

fn parse_request_head(buf: &[u8]) -> ProtocolResult<Option<(usize, Request<()>)>> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut req = httparse::Request::new(&mut headers);

    let head_len = match req.parse(buf) {
        Ok(httparse::Status::Complete(len)) => len,
        Ok(httparse::Status::Partial) => return Ok(None),
        Err(httparse::Error::TooManyHeaders) => return Err(HttpProtocolError::TooManyHeaders),
        Err(e) => {
            return Err(HttpProtocolError::HttpParse(format!(
                "Failed to parse request head: {e}"
            )));
        }
    };

    let method = req
        .method
        .ok_or_else(|| HttpProtocolError::InvalidRequest("missing method".to_string()))?;
    let method = Method::from_bytes(method.as_bytes())
        .map_err(|e| HttpProtocolError::InvalidRequest(format!("method {method:?}: {e}")))?;
    let path = req
        .path
        .ok_or_else(|| HttpProtocolError::InvalidRequest("missing path".to_string()))?;
    let version = match req.version {
        Some(0) => Version::HTTP_10,
        _ => Version::HTTP_11,
    };

    let mut builder = Request::builder().method(method).uri(path).version(version);
    for header in req.headers.iter() {
        builder = builder.header(header.name, header.value);
    }
    let request = builder
        .body(())
        .map_err(|e| HttpProtocolError::InvalidRequest(e.to_string()))?;

    Ok(Some((head_len, request)))
}

/// Number of body bytes announced by the request headers
fn body_length(headers: &HeaderMap) -> ProtocolResult<u64> {
    let mut length = None;
    for value in headers.get_all(CONTENT_LENGTH) {
        let parsed = value
            .to_str()
            .ok()
            .and_then(|text| text.trim().parse::<u64>().ok())
            .ok_or_else(|| {
                HttpProtocolError::InvalidRequest(format!("bad Content-Length {value:?}"))
            })?;
        match length {
            Some(previous) if previous != parsed => {
                return Err(HttpProtocolError::InvalidRequest(
                    "conflicting Content-Length headers".to_string(),
                ));
            }
            _ => length = Some(parsed),
        }
    }
    Ok(length.unwrap_or(0))
}

/// Serializes `response`, forcing `Content-Length` and `Connection: close`
///
/// With `include_body` unset (answers to `HEAD`) the length is still
/// announced but no body bytes are written.
pub async fn write_response<W>(
    writer: &mut W,
    response: &Response<Bytes>,
    include_body: bool,
) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let status = response.status();
    let mut head = format!(
        "HTTP/1.1 {} {}\r\n",
        status.as_str(),
        status.canonical_reason().unwrap_or("")
    )
    .into_bytes();
    write_headers(&mut head, response.headers());
    head.extend_from_slice(
        format!(
            "Content-Length: {}\r\nConnection: close\r\n\r\n",
            response.body().len()
        )
        .as_bytes(),
    );

    writer.write_all(&head).await?;
    if include_body {
        writer.write_all(response.body()).await?;
    }
    writer.flush().await
}

/// Plain-text response describing a rejected request
pub fn error_response(status: StatusCode, message: &str) -> Response<Bytes> {
    let mut response = Response::new(Bytes::from(format!("{message}\n")));
    *response.status_mut() = status;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

/// Serializes a client request, filling in `Host`, `Content-Length` and
/// `Connection: close` when the caller did not set them
pub async fn write_request<W>(writer: &mut W, request: &Request<Bytes>, host: &str) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let target = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let mut head = format!("{} {} HTTP/1.1\r\n", request.method(), target).into_bytes();

    let headers = request.headers();
    if !headers.contains_key(HOST) {
        head.extend_from_slice(format!("Host: {host}\r\n").as_bytes());
    }
    if !headers.contains_key(CONTENT_LENGTH) {
        head.extend_from_slice(format!("Content-Length: {}\r\n", request.body().len()).as_bytes());
    }
    if !headers.contains_key(CONNECTION) {
        head.extend_from_slice(b"Connection: close\r\n");
    }
    for (name, value) in headers {
        push_header(&mut head, &canonical_header_name(name), value.as_bytes());
    }
    head.extend_from_slice(b"\r\n");

    writer.write_all(&head).await?;
    writer.write_all(request.body()).await?;
    writer.flush().await
}

/// Parses a complete response read up to EOF
pub fn parse_response(buf: &[u8]) -> ProtocolResult<Response<Bytes>> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut resp = httparse::Response::new(&mut headers);

    let head_len = match resp.parse(buf) {
        Ok(httparse::Status::Complete(len)) => len,
        Ok(httparse::Status::Partial) => return Err(HttpProtocolError::IncompleteRequest),
        Err(e) => {
            return Err(HttpProtocolError::HttpParse(format!(
                "Failed to parse response head: {e}"
            )));
        }
    };

    let code = resp
        .code
        .ok_or_else(|| HttpProtocolError::HttpParse("missing status code".to_string()))?;
    let mut builder = Response::builder().status(code);
    for header in resp.headers.iter() {
        builder = builder.header(header.name, header.value);
    }

    let mut body = Bytes::copy_from_slice(&buf[head_len..]);
    if let Some(declared) = builder
        .headers_ref()
        .and_then(|headers| headers.get(CONTENT_LENGTH))
        .and_then(|value| value.to_str().ok())
        .and_then(|text| text.parse::<usize>().ok())
    {
        body.truncate(declared);
    }

    builder
        .body(body)
        .map_err(|e| HttpProtocolError::HttpParse(e.to_string()))
}

fn write_headers(out: &mut Vec<u8>, headers: &HeaderMap) {
    for (name, value) in headers {
        if name == CONTENT_LENGTH || name == CONNECTION {
            continue;
        }
        push_header(out, &canonical_header_name(name), value.as_bytes());
    }
}

fn push_header(out: &mut Vec<u8>, name: &str, value: &[u8]) {
    out.extend_from_slice(name.as_bytes());
    out.extend_from_slice(b": ");
    out.extend_from_slice(value);
    out.extend_from_slice(b"\r\n");
}
