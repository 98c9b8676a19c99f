//! `tower::Service` adapters so the echo handlers can be mounted on any
//! tower-based router, such as an axum `Router` route.

use super::uri::move_host_to_authority;
use super::{Body, EchoDataHandler, EchoHandler, Handler};
use crate::http::protocol::error_response;
use bytes::Bytes;
use futures_util::TryStreamExt;
use http::{Request, Response, StatusCode};
use http_body_util::{BodyExt, Full};
use std::convert::Infallible;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio_util::io::StreamReader;
use tower::Service;
use tracing::error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Future returned by the handlers' `Service` implementations
pub type ServiceFuture =
    Pin<Box<dyn Future<Output = std::result::Result<Response<Full<Bytes>>, Infallible>> + Send>>;

/// Wraps any `http_body::Body` as a streaming [`Body`]
///
/// Body errors surface as read errors, so a failing stream is handled the
/// same way as a failing socket.
pub fn body_from_http<B>(body: B) -> Body
where
    B: http_body::Body + Send + 'static,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    let stream = body.into_data_stream().map_err(io::Error::other);
    Body::from_reader(StreamReader::new(stream))
}

fn call_handler<H, B>(handler: H, request: Request<B>) -> ServiceFuture
where
    H: Handler + 'static,
    B: http_body::Body + Send + 'static,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    let mut request = request.map(body_from_http);
    move_host_to_authority(&mut request);

    Box::pin(async move {
        let response = match handler.handle(request).await {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, "Handler failed");
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "handler failed")
            }
        };
        Ok(response.map(Full::new))
    })
}

impl<B> Service<Request<B>> for EchoHandler
where
    B: http_body::Body + Send + 'static,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    type Response = Response<Full<Bytes>>;
    type Error = Infallible;
    type Future = ServiceFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<B>) -> Self::Future {
        call_handler(self.clone(), request)
    }
}

impl<B> Service<Request<B>> for EchoDataHandler
where
    B: http_body::Body + Send + 'static,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    type Response = Response<Full<Bytes>>;
    type Error = Infallible;
    type Future = ServiceFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<B>) -> Self::Future {
        call_handler(self.clone(), request)
    }
}
