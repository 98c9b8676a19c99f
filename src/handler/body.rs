use bytes::Bytes;
use std::fmt;
use std::io::{self, Cursor};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, ReadBuf};

/// Streaming request body
///
/// Wraps any `AsyncRead` so handlers consume bodies the same way whether the
/// bytes come from a socket or from memory. Reads may fail part way through,
/// exactly like a network body.
pub struct Body {
    reader: Pin<Box<dyn AsyncRead + Send>>,
}

impl Body {
    /// A body with no bytes
    pub fn empty() -> Self {
        Self::from(Bytes::new())
    }

    /// Wraps an arbitrary reader
    pub fn from_reader<R>(reader: R) -> Self
    where
        R: AsyncRead + Send + 'static,
    {
        Self {
            reader: Box::pin(reader),
        }
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Body").finish_non_exhaustive()
    }
}

impl AsyncRead for Body {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        self.reader.as_mut().poll_read(cx, buf)
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Self::from_reader(Cursor::new(bytes))
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Self::from(Bytes::from(bytes))
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Self::from(Bytes::from(text))
    }
}

impl From<&'static str> for Body {
    fn from(text: &'static str) -> Self {
        Self::from(Bytes::from_static(text.as_bytes()))
    }
}

impl From<&'static [u8]> for Body {
    fn from(bytes: &'static [u8]) -> Self {
        Self::from(Bytes::from_static(bytes))
    }
}

/// Reads the whole body into memory
///
/// A read error stops the copy; it is reported to `logger` and whatever was
/// read before the failure is returned.
pub(crate) async fn buffer_body(mut body: Body, logger: &dyn super::EchoLogger) -> Bytes {
    let mut buffer = Vec::new();
    if let Err(err) = tokio::io::copy(&mut body, &mut buffer).await {
        logger.failure("copying request into buffer failed", &err);
    }
    Bytes::from(buffer)
}
