//! Normalized transport response.

use std::fmt;

use bytes::{Bytes, BytesMut};
use futures::TryStreamExt;

use super::{ByteStream, Headers};
use crate::Result;
use crate::input::{ResponseBody, ResponseLike};

enum Body {
    Buffered(Bytes),
    Raw(ByteStream),
}

/// Response returned by a [`HttpTransport`](super::HttpTransport).
///
/// Buffered responses carry the whole body and expose it decoded through
/// [`content`](Self::content). Raw responses keep the body as a stream that
/// can be collected with [`buffer`](Self::buffer) / [`text`](Self::text) or
/// handed off with [`into_body`](Self::into_body), for example to
/// [`FileStasher::stash_file`](crate::FileStasher::stash_file).
pub struct TransportResponse {
    status: u16,
    headers: Headers,
    body: Body,
}

impl TransportResponse {
    /// Creates a buffered response.
    pub fn buffered(status: u16, headers: Headers, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: Body::Buffered(body.into()),
        }
    }

    /// Creates a raw (streaming) response.
    pub fn raw(status: u16, headers: Headers, stream: ByteStream) -> Self {
        Self {
            status,
            headers,
            body: Body::Raw(stream),
        }
    }

    /// HTTP status code.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Returns whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Response headers.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Looks up a header by name, ignoring case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Returns true if the body is still an unread stream.
    pub fn is_raw(&self) -> bool {
        matches!(self.body, Body::Raw(_))
    }

    /// Decoded body of a buffered response.
    ///
    /// Invalid UTF-8 is replaced; raw responses return an empty string.
    pub fn content(&self) -> String {
        match &self.body {
            Body::Buffered(bytes) => String::from_utf8_lossy(bytes).into_owned(),
            Body::Raw(_) => String::new(),
        }
    }

    /// Collects the whole body.
    pub async fn buffer(self) -> Result<Bytes> {
        match self.body {
            Body::Buffered(bytes) => Ok(bytes),
            Body::Raw(stream) => {
                let buffer = stream
                    .try_fold(BytesMut::new(), |mut acc, chunk| async move {
                        acc.extend_from_slice(&chunk);
                        Ok(acc)
                    })
                    .await?;
                Ok(buffer.freeze())
            }
        }
    }

    /// Collects the whole body and decodes it as UTF-8, replacing invalid sequences.
    pub async fn text(self) -> Result<String> {
        let bytes = self.buffer().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Consumes the response, returning the body as a stream.
    pub fn into_body(self) -> ByteStream {
        match self.body {
            Body::Buffered(bytes) => Box::pin(futures::stream::once(async move {
                Ok::<_, std::io::Error>(bytes)
            })),
            Body::Raw(stream) => stream,
        }
    }
}

impl fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("raw", &self.is_raw())
            .finish()
    }
}

impl ResponseLike for TransportResponse {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    fn into_response_body(self: Box<Self>) -> ResponseBody {
        match self.body {
            Body::Raw(stream) => ResponseBody::stream(stream),
            Body::Buffered(bytes) => ResponseBody::content(bytes),
        }
    }
}
