//! Request-echoing handlers
//!
//! This module provides the [`Handler`] abstraction and the two echo fixtures
//! built on it: [`EchoHandler`], which reflects a request as plain text, and
//! [`EchoDataHandler`], which reflects it as a JSON document.
//!
//! Both handlers also implement `tower::Service`, so they can be mounted on
//! a tower or axum router as well as on [`crate::HttpServer`].

pub mod body;
pub mod data;
pub mod headers;
pub mod json;
pub mod logger;
pub mod service;
pub mod text;
pub mod uri;


pub use body::Body;
pub use data::EchoDataHandler;
pub use headers::{canonical_header_name, write_sorted_headers};
pub use logger::{EchoLogger, MemoryLogger, TracingLogger};
pub use service::{ServiceFuture, body_from_http};
pub use text::EchoHandler;
pub use uri::{decoded_path, move_host_to_authority};

use crate::Result;
use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response};
use std::sync::Arc;

/// A request handler that can be hosted by [`crate::HttpServer`] or called directly
///
/// Implementations receive the full request with a streaming [`Body`] and
/// produce a fully buffered response. Returning an error fails only that
/// request; the hosting server answers it with `500 Internal Server Error`.
///
/// # Examples
///
/// ```
/// use echosrv::{Body, EchoHandler, Handler};
///
/// # tokio_test::block_on(async {
/// let request = http::Request::get("/status").body(Body::empty()).unwrap();
/// let response = EchoHandler::new().handle(request).await.unwrap();
/// assert!(response.body().starts_with(b"GET /status\n"));
/// # });
/// ```
#[async_trait]
pub trait Handler: Send + Sync {
    /// Turns one request into one response
    async fn handle(&self, request: Request<Body>) -> Result<Response<Bytes>>;
}

#[async_trait]
impl<H: Handler + ?Sized> Handler for Arc<H> {
    async fn handle(&self, request: Request<Body>) -> Result<Response<Bytes>> {
        (**self).handle(request).await
    }
}
