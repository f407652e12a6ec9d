//! Response-shaped inputs.

use std::fmt;

use bytes::Bytes;

use crate::transport::ByteStream;

/// Anything that looks like an HTTP response: header lookup plus a body.
///
/// [`TransportResponse`](crate::transport::TransportResponse) implements this,
/// so a raw download can be stashed without buffering it first.
pub trait ResponseLike: Send {
    /// Looks up a header by name, ignoring case.
    fn header(&self, name: &str) -> Option<&str>;

    /// Consumes the response and returns whatever body it carries.
    fn into_response_body(self: Box<Self>) -> ResponseBody;
}

/// Body parts a [`ResponseLike`] can offer.
///
/// The stream is preferred over decoded content when both are present.
#[derive(Default)]
pub struct ResponseBody {
    /// Pipeable body stream.
    pub stream: Option<ByteStream>,
    /// Already-decoded body content.
    pub content: Option<Bytes>,
}

impl ResponseBody {
    /// Body backed by a stream.
    pub fn stream(stream: ByteStream) -> Self {
        Self {
            stream: Some(stream),
            content: None,
        }
    }

    /// Body backed by decoded content.
    pub fn content(content: impl Into<Bytes>) -> Self {
        Self {
            stream: None,
            content: Some(content.into()),
        }
    }

    /// Returns true if the response carries neither a stream nor content.
    pub fn is_empty(&self) -> bool {
        self.stream.is_none() && self.content.is_none()
    }
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseBody")
            .field("stream", &self.stream.is_some())
            .field("content", &self.content.as_ref().map(Bytes::len))
            .finish()
    }
}
