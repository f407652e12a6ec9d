//! Stashable input shapes and their normalization.
//!
//! A caller can hand over text, a buffer, a byte stream, a response-shaped
//! object, or a pending value that settles to one of those. [`normalize`]
//! reduces all of them to a [`NormalizedInput`]: content the form can
//! encode, plus best-effort length and filename hints.

mod disposition;
mod normalize;
mod response_like;

use std::fmt;

use bytes::Bytes;
use futures::future::BoxFuture;
use strum::{AsRefStr, Display, IntoStaticStr};

pub use disposition::{content_disposition, parse_filename, sanitize_filename};
pub use normalize::{FileContent, NormalizedInput, normalize};
pub use response_like::{ResponseBody, ResponseLike};

use crate::Result;
use crate::transport::ByteStream;

/// Tracing target for input normalization.
pub const TRACING_TARGET: &str = "nvisy_stash::input";

/// Future that settles to a stashable value.
pub type PendingInput = BoxFuture<'static, Result<StashInput>>;

/// File content in any of the accepted shapes.
pub enum StashInput {
    /// In-memory text.
    Text(String),
    /// In-memory bytes.
    Binary(Bytes),
    /// A readable byte stream.
    Stream(ByteStream),
    /// A response-shaped object: header lookup plus a streamed or decoded body.
    Response(Box<dyn ResponseLike>),
    /// A value that has not settled yet.
    ///
    /// Only unwrapped once: it must settle to text or a response.
    Pending(PendingInput),
}

impl StashInput {
    /// Wraps a future that settles to something convertible into an input.
    pub fn pending<F, T>(future: F) -> Self
    where
        F: Future<Output = Result<T>> + Send + 'static,
        T: Into<StashInput>,
    {
        Self::Pending(Box::pin(async move { future.await.map(Into::into) }))
    }

    /// Wraps a response-shaped object.
    pub fn response(response: impl ResponseLike + 'static) -> Self {
        Self::Response(Box::new(response))
    }

    /// Returns the tag of the active shape.
    pub fn shape(&self) -> InputShape {
        match self {
            Self::Text(_) => InputShape::Text,
            Self::Binary(_) => InputShape::Binary,
            Self::Stream(_) => InputShape::Stream,
            Self::Response(_) => InputShape::Response,
            Self::Pending(_) => InputShape::Pending,
        }
    }
}

impl fmt::Debug for StashInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(&text.len()).finish(),
            Self::Binary(bytes) => f.debug_tuple("Binary").field(&bytes.len()).finish(),
            other => f.write_str(other.shape().as_ref()),
        }
    }
}

/// Tag of a [`StashInput`] shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(AsRefStr, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum InputShape {
    /// In-memory text.
    Text,
    /// In-memory bytes.
    Binary,
    /// Byte stream.
    Stream,
    /// Response-shaped object.
    Response,
    /// Unsettled value.
    Pending,
}

impl From<String> for StashInput {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for StashInput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<Bytes> for StashInput {
    fn from(bytes: Bytes) -> Self {
        Self::Binary(bytes)
    }
}

impl From<Vec<u8>> for StashInput {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Binary(Bytes::from(bytes))
    }
}

impl From<&'static [u8]> for StashInput {
    fn from(bytes: &'static [u8]) -> Self {
        Self::Binary(Bytes::from_static(bytes))
    }
}

impl From<ByteStream> for StashInput {
    fn from(stream: ByteStream) -> Self {
        Self::Stream(stream)
    }
}

impl From<Box<dyn ResponseLike>> for StashInput {
    fn from(response: Box<dyn ResponseLike>) -> Self {
        Self::Response(response)
    }
}

impl From<crate::transport::TransportResponse> for StashInput {
    fn from(response: crate::transport::TransportResponse) -> Self {
        Self::response(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shapes() {
        assert_eq!(StashInput::from("hello").shape(), InputShape::Text);
        assert_eq!(StashInput::from(vec![1u8, 2]).shape(), InputShape::Binary);

        let stream: ByteStream = Box::pin(futures::stream::empty());
        assert_eq!(StashInput::from(stream).shape(), InputShape::Stream);

        let pending = StashInput::pending(async { Ok("later") });
        assert_eq!(pending.shape(), InputShape::Pending);
        assert_eq!(format!("{pending:?}"), "pending");
    }

    #[test]
    fn test_shape_display() {
        assert_eq!(InputShape::Response.to_string(), "response");
    }
}
